use std::path::PathBuf;

use cannon_core::{
    fetch_bearer_token, Auth, AuthMode, AuthSettings, CannonConfig, CannonResult, HeyGenerator,
    RampConfig, RampOutcome, RampedRunner, RequestType,
};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::output::report_path;

/// Flags for a ramped run. Unset flags fall back to the config file.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Number of requests per concurrency step
    #[arg(long, env = "CANNON_NUM_REQUESTS")]
    pub num_requests: Option<u32>,

    /// Type of request: set, get, or interpolate
    #[arg(long, env = "CANNON_REQUEST_TYPE")]
    pub request_type: Option<RequestType>,

    /// Credential API base URL
    #[arg(long, env = "CANNON_URL")]
    pub url: Option<String>,

    /// Minimum number of concurrent requests
    #[arg(long, env = "CANNON_MIN_CONCURRENT")]
    pub min_concurrent: Option<u32>,

    /// Maximum number of concurrent requests
    #[arg(long, env = "CANNON_MAX_CONCURRENT")]
    pub max_concurrent: Option<u32>,

    /// Interval between concurrency levels
    #[arg(long, env = "CANNON_STEP")]
    pub step: Option<u32>,

    /// Credential name the requests operate on
    #[arg(long, env = "CANNON_CREDENTIAL_NAME")]
    pub credential_name: Option<String>,

    /// Auth mode: x509, token, or none
    #[arg(long, env = "CANNON_AUTH_MODE")]
    pub auth_mode: Option<AuthMode>,

    /// Path to mTLS x509 certificate
    #[arg(long, env = "CANNON_X509_CERT")]
    pub x509_cert: Option<PathBuf>,

    /// Path to mTLS x509 key
    #[arg(long, env = "CANNON_X509_KEY")]
    pub x509_key: Option<PathBuf>,

    /// Command that prints a bearer token
    #[arg(long, env = "CANNON_TOKEN_COMMAND")]
    pub token_command: Option<String>,

    /// Fixed report path
    #[arg(long, env = "CANNON_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Directory for timestamped report files
    #[arg(long, env = "CANNON_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Do not write a report file
    #[arg(long, conflicts_with_all = ["output", "output_dir"])]
    pub no_output: bool,

    /// Load generator executable
    #[arg(long, env = "CANNON_HEY_PATH")]
    pub hey_path: Option<PathBuf>,
}

impl RunArgs {
    /// Overlay flags onto file/default settings.
    pub fn apply(self, config: &mut CannonConfig) {
        let ramp = &mut config.ramp;
        if let Some(v) = self.num_requests {
            ramp.num_requests = v;
        }
        if let Some(v) = self.min_concurrent {
            ramp.min_concurrent = v;
        }
        if let Some(v) = self.max_concurrent {
            ramp.max_concurrent = v;
        }
        if let Some(v) = self.step {
            ramp.step = v;
        }

        let target = &mut config.target;
        if let Some(v) = self.url {
            target.url = v;
        }
        if let Some(v) = self.request_type {
            target.request_type = v;
        }
        if let Some(v) = self.credential_name {
            target.credential_name = v;
        }

        let auth = &mut config.auth;
        if let Some(v) = self.auth_mode {
            auth.mode = v;
        }
        if self.x509_cert.is_some() {
            auth.x509_cert = self.x509_cert;
        }
        if self.x509_key.is_some() {
            auth.x509_key = self.x509_key;
        }
        if let Some(v) = self.token_command {
            auth.token_command = v;
        }

        let output = &mut config.output;
        if self.no_output {
            output.enabled = false;
        }
        if self.output.is_some() {
            output.path = self.output;
        }
        if let Some(v) = self.output_dir {
            output.dir = v;
        }

        if let Some(v) = self.hey_path {
            config.generator.program = v;
        }
    }
}

/// Obtain auth material once, before the ramp starts.
pub async fn resolve_auth(settings: &AuthSettings) -> CannonResult<Auth> {
    match settings.mode {
        AuthMode::X509 => {
            Auth::client_certificate(settings.x509_cert.clone(), settings.x509_key.clone())
        }
        AuthMode::Token => fetch_bearer_token(&settings.token_command).await,
        AuthMode::None => Ok(Auth::None),
    }
}

/// Run the ramp described by `config`.
///
/// The ramp and its output location are checked before the token command
/// or any generator runs.
pub async fn execute(config: &CannonConfig) -> CannonResult<RampOutcome> {
    let request_type = config.target.request_type;

    let mut ramp = RampConfig::new(
        config.ramp.min_concurrent,
        config.ramp.max_concurrent,
        config.ramp.step,
        config.ramp.num_requests,
    );
    if let Some(path) = report_path(&config.output, request_type, chrono::Utc::now()) {
        ramp = ramp.with_output_path(path);
    }
    ramp.validate()?;
    ramp.check_output_dir()?;

    let auth = resolve_auth(&config.auth).await?;
    let ramp = ramp.with_auth(auth);
    let target = request_type.target(&config.target.url, &config.target.credential_name);

    println!(
        "🚀 Beginning [{}] tests on instance: {}",
        request_type, config.target.url
    );
    println!(
        "  Concurrency from {} to {}, step by {}",
        config.ramp.min_concurrent, config.ramp.max_concurrent, config.ramp.step
    );
    println!("  {} requests per step", config.ramp.num_requests);
    if let Some(path) = &ramp.output_path {
        info!("Report will be written to {}", path.display());
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let runner = RampedRunner::new(ramp, HeyGenerator::new(&config.generator.program));
    runner.fire_requests(&target, &pb).await
}
