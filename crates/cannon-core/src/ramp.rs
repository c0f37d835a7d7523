use std::path::PathBuf;

use crate::auth::Auth;
use crate::error::{CannonError, CannonResult};

/// Parameters of a single ramped run.
///
/// Constructed once from caller-supplied values, consumed by one
/// [`RampedRunner`](crate::RampedRunner) run, then dropped.
#[derive(Debug, Clone)]
pub struct RampConfig {
    /// First concurrency level of the sweep.
    pub min_concurrency: u32,
    /// Last concurrency level of the sweep (inclusive).
    pub max_concurrency: u32,
    /// Increment between concurrency levels.
    pub step: u32,
    /// Requests issued at every concurrency level.
    pub total_requests: u32,
    /// Where the concatenated report is written, if anywhere.
    pub output_path: Option<PathBuf>,
    /// Auth material handed to every generator invocation.
    pub auth: Auth,
}

impl RampConfig {
    pub fn new(min_concurrency: u32, max_concurrency: u32, step: u32, total_requests: u32) -> Self {
        Self {
            min_concurrency,
            max_concurrency,
            step,
            total_requests,
            output_path: None,
            auth: Auth::None,
        }
    }

    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Check the ramp invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CannonError::Configuration`] if:
    /// - `min_concurrency >= max_concurrency`
    /// - `total_requests < max_concurrency`
    /// - `step` or `min_concurrency` is zero
    pub fn validate(&self) -> CannonResult<()> {
        if self.min_concurrency >= self.max_concurrency {
            return Err(CannonError::configuration(format!(
                "min concurrency ({}) must be less than max concurrency ({})",
                self.min_concurrency, self.max_concurrency
            )));
        }

        if self.total_requests < self.max_concurrency {
            return Err(CannonError::configuration(format!(
                "can't have fewer requests ({}) than concurrent requests ({})",
                self.total_requests, self.max_concurrency
            )));
        }

        if self.step == 0 {
            return Err(CannonError::configuration("step must be at least 1"));
        }

        if self.min_concurrency == 0 {
            return Err(CannonError::configuration("min concurrency must be at least 1"));
        }

        Ok(())
    }

    /// Check that the report's directory exists, so a long sweep cannot
    /// finish only to lose its results on the final write.
    ///
    /// # Errors
    ///
    /// Returns [`CannonError::Io`] carrying the report path if its parent is
    /// missing or not a directory.
    pub fn check_output_dir(&self) -> CannonResult<()> {
        let Some(path) = &self.output_path else {
            return Ok(());
        };

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => return Ok(()),
        };

        if parent.is_dir() {
            return Ok(());
        }

        Err(CannonError::Io {
            path: path.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("output directory {} does not exist", parent.display()),
            ),
        })
    }

    /// Concurrency levels of the sweep in increasing order.
    ///
    /// Yields nothing useful on an unvalidated config with `step == 0`,
    /// so callers validate first.
    pub fn levels(&self) -> impl Iterator<Item = u32> {
        let step = self.step.max(1) as usize;
        (self.min_concurrency..=self.max_concurrency).step_by(step)
    }

    /// Number of generator invocations a valid config produces.
    pub fn level_count(&self) -> usize {
        if self.min_concurrency > self.max_concurrency || self.step == 0 {
            return 0;
        }
        ((self.max_concurrency - self.min_concurrency) / self.step) as usize + 1
    }
}
