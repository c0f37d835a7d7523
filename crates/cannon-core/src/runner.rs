use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::error::{CannonError, CannonResult};
use crate::generator::{Invocation, LoadGenerator, Target};
use crate::ramp::RampConfig;

/// Rate limit handed to the generator: unlimited.
const RATE_LIMIT: u32 = 0;

/// Result of a completed ramp.
#[derive(Debug, Clone)]
pub struct RampOutcome {
    /// Concurrency levels that were run, in order.
    pub levels: Vec<u32>,
    /// Ordered concatenation of every invocation's raw output.
    pub output: Vec<u8>,
    /// Where `output` was persisted, if a path was configured.
    pub written_to: Option<PathBuf>,
}

/// Sweeps concurrency levels, one blocking generator invocation at a time.
pub struct RampedRunner<G> {
    config: RampConfig,
    generator: G,
}

impl<G: LoadGenerator> RampedRunner<G> {
    pub fn new(config: RampConfig, generator: G) -> Self {
        Self { config, generator }
    }

    pub fn config(&self) -> &RampConfig {
        &self.config
    }

    /// Run the whole ramp against `target`.
    ///
    /// The config and the report directory are checked before any generator
    /// invocation. The first failing level aborts the sweep; nothing is
    /// written in that case.
    ///
    /// # Errors
    ///
    /// - [`CannonError::Configuration`] for an invalid ramp
    /// - [`CannonError::Invocation`] if the generator fails at any level
    /// - [`CannonError::Io`] if the report directory is missing or the
    ///   report cannot be written
    pub async fn fire_requests(&self, target: &Target, pb: &ProgressBar) -> CannonResult<RampOutcome> {
        self.config.validate()?;
        self.config.check_output_dir()?;

        info!(
            "Ramping {} {} from {} to {} concurrent, step {}, {} requests per step",
            target.method,
            target.url,
            self.config.min_concurrency,
            self.config.max_concurrency,
            self.config.step,
            self.config.total_requests
        );

        pb.set_length(self.config.level_count() as u64);

        let mut output = Vec::new();
        let mut levels = Vec::with_capacity(self.config.level_count());

        for concurrency in self.config.levels() {
            pb.set_message(format!("concurrency {concurrency}"));

            let chunk = self
                .generator
                .run(Invocation {
                    target,
                    total_requests: self.config.total_requests,
                    concurrency,
                    rate_limit: RATE_LIMIT,
                    auth: &self.config.auth,
                })
                .await?;

            if chunk.is_empty() {
                warn!("Generator produced no output at concurrency {}", concurrency);
            }

            output.extend_from_slice(&chunk);
            levels.push(concurrency);
            pb.inc(1);
        }

        pb.finish_with_message(format!("{} levels, {} bytes", levels.len(), output.len()));

        let written_to = match &self.config.output_path {
            Some(path) => {
                write_report(path, &output).await?;
                Some(path.clone())
            }
            None => None,
        };

        Ok(RampOutcome {
            levels,
            output,
            written_to,
        })
    }
}

/// Write the concatenated report as a single file.
///
/// # Errors
///
/// Returns [`CannonError::Io`] carrying `path` on failure.
pub async fn write_report(path: &Path, data: &[u8]) -> CannonResult<()> {
    tokio::fs::write(path, data)
        .await
        .map_err(|source| CannonError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    info!("csv stored locally in file {}", path.display());
    Ok(())
}
