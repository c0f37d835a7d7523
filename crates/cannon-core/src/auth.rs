//! Auth material passed through to the load generator.
//!
//! The tool never validates or refreshes credentials. A bad token or
//! certificate only shows up as rejected requests in the report.

use std::ffi::OsString;
use std::path::PathBuf;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{CannonError, CannonResult};

/// Default command used to obtain a bearer token.
pub const DEFAULT_TOKEN_COMMAND: &str = "credhub --token";

/// Environment variable carrying the client certificate path.
pub const X509_CERT_ENV: &str = "X509_USER_CERT";
/// Environment variable carrying the client key path.
pub const X509_KEY_ENV: &str = "X509_USER_KEY";

/// Auth material for generator invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Auth {
    /// Requests are sent unauthenticated.
    #[default]
    None,
    /// `Authorization` header value, including the `bearer ` scheme.
    BearerToken(String),
    /// mTLS certificate and key, exported to the generator's environment.
    ClientCertificate { cert: PathBuf, key: PathBuf },
}

impl Auth {
    /// Build mTLS auth, requiring both paths.
    ///
    /// # Errors
    ///
    /// Returns [`CannonError::Credentials`] when either path is missing or empty.
    pub fn client_certificate(
        cert: Option<PathBuf>,
        key: Option<PathBuf>,
    ) -> CannonResult<Self> {
        let cert = cert
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| CannonError::credentials("please enter an x509 certificate path"))?;
        let key = key
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| CannonError::credentials("please enter an x509 key path"))?;

        Ok(Self::ClientCertificate { cert, key })
    }

    /// Header value for the generator's `-H` flag, if any.
    pub fn authorization_header(&self) -> Option<String> {
        match self {
            Self::BearerToken(token) => Some(format!("Authorization: {token}")),
            _ => None,
        }
    }

    /// Environment variables the generator needs, if any.
    ///
    /// Paths are passed through as raw OS strings, never re-encoded.
    pub fn env_vars(&self) -> Vec<(&'static str, OsString)> {
        match self {
            Self::ClientCertificate { cert, key } => vec![
                (X509_CERT_ENV, cert.clone().into_os_string()),
                (X509_KEY_ENV, key.clone().into_os_string()),
            ],
            _ => Vec::new(),
        }
    }
}

/// Run the token command once and turn its stdout into a bearer token.
///
/// The command line is split on whitespace; no shell is involved.
///
/// # Errors
///
/// Returns [`CannonError::Credentials`] if the command is empty, cannot be
/// spawned, exits non-zero, or prints nothing.
pub async fn fetch_bearer_token(command_line: &str) -> CannonResult<Auth> {
    let mut parts = command_line.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| CannonError::credentials("token command is empty"))?;
    let args: Vec<&str> = parts.collect();

    info!("Fetching bearer token with `{}`", command_line);

    let output = Command::new(program)
        .args(&args)
        .output()
        .await
        .map_err(|e| CannonError::credentials(format!("failed to run `{program}`: {e}")))?;

    if !output.status.success() {
        return Err(CannonError::credentials(format!(
            "`{}` exited with {}: {}",
            command_line,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let token = normalize_token(&raw)
        .ok_or_else(|| CannonError::credentials(format!("`{command_line}` printed no token")))?;

    debug!("Bearer token obtained ({} chars)", token.len());
    Ok(Auth::BearerToken(token))
}

/// Trim the token and make sure it carries the `bearer` scheme.
fn normalize_token(raw: &str) -> Option<String> {
    let token = raw.trim();
    if token.is_empty() {
        return None;
    }

    if token.to_ascii_lowercase().starts_with("bearer ") {
        Some(token.to_string())
    } else {
        Some(format!("bearer {token}"))
    }
}
