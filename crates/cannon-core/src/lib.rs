//! Ramped load testing against a credential-management HTTP API.
//!
//! A [`RampedRunner`] sweeps concurrency levels and hands each one to an
//! external [`LoadGenerator`], concatenating the raw CSV reports in order.

pub mod auth;
pub mod config;
pub mod error;
pub mod generator;
pub mod payload;
pub mod ramp;
pub mod report;
pub mod runner;

pub use auth::{fetch_bearer_token, Auth};
pub use config::{AuthMode, AuthSettings, CannonConfig, ConfigError, LoggingConfig, OutputSettings};
pub use error::{CannonError, CannonResult};
pub use generator::{HeyGenerator, Invocation, LoadGenerator, Target};
pub use payload::{RequestType, DEFAULT_CREDENTIAL_NAME};
pub use ramp::RampConfig;
pub use report::{summarize, LatencyStats, SectionSummary};
pub use runner::{write_report, RampOutcome, RampedRunner};
