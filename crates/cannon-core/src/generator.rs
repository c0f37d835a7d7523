use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::auth::Auth;
use crate::error::{CannonError, CannonResult};

/// Default name of the external load generator binary.
pub const DEFAULT_GENERATOR: &str = "hey";

/// The HTTP request every invocation repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub url: String,
    pub method: String,
    pub body: String,
}

impl Target {
    pub fn new(url: impl Into<String>, method: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            body: body.into(),
        }
    }
}

/// One step of the ramp as handed to a generator.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub target: &'a Target,
    pub total_requests: u32,
    pub concurrency: u32,
    /// Requests per second per worker; `0` means unlimited.
    pub rate_limit: u32,
    pub auth: &'a Auth,
}

/// Boundary to the process that actually fires and times requests.
///
/// Implementations block until the generator has finished and return its
/// raw CSV report.
#[async_trait]
pub trait LoadGenerator: Send + Sync {
    /// Run one concurrency level to completion.
    ///
    /// # Errors
    ///
    /// Returns [`CannonError::Invocation`] if the generator cannot be
    /// launched or reports failure.
    async fn run(&self, invocation: Invocation<'_>) -> CannonResult<Vec<u8>>;
}

/// Shells out to `hey` in CSV output mode.
#[derive(Debug, Clone)]
pub struct HeyGenerator {
    program: PathBuf,
}

impl HeyGenerator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Argument vector for one invocation.
    pub fn args(invocation: &Invocation<'_>) -> Vec<String> {
        let mut args = vec![
            "-n".to_string(),
            invocation.total_requests.to_string(),
            "-c".to_string(),
            invocation.concurrency.to_string(),
            "-q".to_string(),
            invocation.rate_limit.to_string(),
            "-T".to_string(),
            "application/json".to_string(),
        ];

        if !invocation.target.body.is_empty() {
            args.push("-d".to_string());
            args.push(invocation.target.body.clone());
        }

        args.extend([
            "-m".to_string(),
            invocation.target.method.clone(),
            "-disable-compression".to_string(),
            "-disable-keepalive".to_string(),
            "-o".to_string(),
            "csv".to_string(),
        ]);

        if let Some(header) = invocation.auth.authorization_header() {
            args.push("-H".to_string());
            args.push(header);
        }

        args.push(invocation.target.url.clone());
        args
    }
}

impl Default for HeyGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_GENERATOR)
    }
}

#[async_trait]
impl LoadGenerator for HeyGenerator {
    async fn run(&self, invocation: Invocation<'_>) -> CannonResult<Vec<u8>> {
        info!(
            "Running benchmark with {} requests, {} concurrency, and {} rate limit",
            invocation.total_requests, invocation.concurrency, invocation.rate_limit
        );

        let args = Self::args(&invocation);
        debug!("{} {:?}", self.program.display(), args);

        let output = Command::new(&self.program)
            .args(&args)
            .envs(invocation.auth.env_vars())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                CannonError::invocation(
                    invocation.concurrency,
                    format!("failed to launch {}: {}", self.program.display(), e),
                )
            })?;

        if !output.status.success() {
            return Err(CannonError::invocation(
                invocation.concurrency,
                format!(
                    "{}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(output.stdout)
    }
}
