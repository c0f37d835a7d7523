//! Ramp runner behaviour against recording and scripted load generators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cannon_core::{
    Auth, CannonError, CannonResult, Invocation, LoadGenerator, RampConfig, RampedRunner, Target,
};
use indicatif::ProgressBar;

/// Records every invocation and answers with a per-level CSV chunk.
#[derive(Clone, Default)]
struct RecordingGenerator {
    calls: Arc<Mutex<Vec<(u32, u32, u32)>>>,
    fail_at: Option<u32>,
}

impl RecordingGenerator {
    fn failing_at(concurrency: u32) -> Self {
        Self {
            fail_at: Some(concurrency),
            ..Self::default()
        }
    }

    fn concurrencies(&self) -> Vec<u32> {
        self.calls.lock().unwrap().iter().map(|(c, _, _)| *c).collect()
    }
}

#[async_trait]
impl LoadGenerator for RecordingGenerator {
    async fn run(&self, invocation: Invocation<'_>) -> CannonResult<Vec<u8>> {
        self.calls.lock().unwrap().push((
            invocation.concurrency,
            invocation.total_requests,
            invocation.rate_limit,
        ));

        if self.fail_at == Some(invocation.concurrency) {
            return Err(CannonError::invocation(invocation.concurrency, "exit status: 1"));
        }

        Ok(format!(
            "response-time,offset\n0.0{},{}\n",
            invocation.concurrency, invocation.concurrency
        )
        .into_bytes())
    }
}

fn target() -> Target {
    Target::new("http://127.0.0.1:8844/api/v1/data", "POST", r#"{"name":"test_credential"}"#)
}

#[tokio::test]
async fn test_ramps_up_over_multiple_levels() {
    let generator = RecordingGenerator::default();
    let runner = RampedRunner::new(RampConfig::new(5, 10, 5, 10), generator.clone());

    let outcome = runner
        .fire_requests(&target(), &ProgressBar::hidden())
        .await
        .unwrap();

    assert_eq!(outcome.levels, vec![5, 10]);
    assert_eq!(
        *generator.calls.lock().unwrap(),
        vec![(5, 10, 0), (10, 10, 0)]
    );
    assert_eq!(outcome.written_to, None);
}

#[tokio::test]
async fn test_min_above_max_makes_no_invocation() {
    let generator = RecordingGenerator::default();
    let runner = RampedRunner::new(RampConfig::new(10, 5, 5, 10), generator.clone());

    let err = runner
        .fire_requests(&target(), &ProgressBar::hidden())
        .await
        .unwrap_err();

    assert!(matches!(err, CannonError::Configuration(_)));
    assert!(generator.concurrencies().is_empty());
}

#[tokio::test]
async fn test_too_few_requests_makes_no_invocation() {
    let generator = RecordingGenerator::default();
    let runner = RampedRunner::new(RampConfig::new(5, 10, 5, 1), generator.clone());

    let err = runner
        .fire_requests(&target(), &ProgressBar::hidden())
        .await
        .unwrap_err();

    assert!(matches!(err, CannonError::Configuration(_)));
    assert!(generator.concurrencies().is_empty());
}

#[tokio::test]
async fn test_invocation_count_and_order() {
    for (min, max, step) in [(1, 50, 1), (2, 30, 7), (1, 2, 10), (3, 40, 3)] {
        let generator = RecordingGenerator::default();
        let config = RampConfig::new(min, max, step, 1_000);
        let expected = ((max - min) / step + 1) as usize;
        let runner = RampedRunner::new(config, generator.clone());

        let outcome = runner
            .fire_requests(&target(), &ProgressBar::hidden())
            .await
            .unwrap();

        let seen = generator.concurrencies();
        assert_eq!(seen.len(), expected, "range {min}..={max} step {step}");
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen, outcome.levels);
    }
}

#[tokio::test]
async fn test_output_is_ordered_concatenation() {
    let generator = RecordingGenerator::default();
    let runner = RampedRunner::new(RampConfig::new(1, 3, 1, 3), generator);

    let outcome = runner
        .fire_requests(&target(), &ProgressBar::hidden())
        .await
        .unwrap();

    let expected = "response-time,offset\n0.01,1\n\
                    response-time,offset\n0.02,2\n\
                    response-time,offset\n0.03,3\n";
    assert_eq!(String::from_utf8(outcome.output).unwrap(), expected);
}

#[tokio::test]
async fn test_written_file_matches_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("getPerfResults.csv");
    let config = RampConfig::new(5, 10, 5, 10).with_output_path(&path);
    let runner = RampedRunner::new(config, RecordingGenerator::default());

    let outcome = runner
        .fire_requests(&target(), &ProgressBar::hidden())
        .await
        .unwrap();

    assert_eq!(outcome.written_to.as_deref(), Some(path.as_path()));
    assert_eq!(std::fs::read(&path).unwrap(), outcome.output);
    assert!(!outcome.output.is_empty());
}

#[tokio::test]
async fn test_failure_stops_sweep_and_skips_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");
    let generator = RecordingGenerator::failing_at(3);
    let config = RampConfig::new(1, 5, 1, 10).with_output_path(&path);
    let runner = RampedRunner::new(config, generator.clone());

    let err = runner
        .fire_requests(&target(), &ProgressBar::hidden())
        .await
        .unwrap_err();

    match err {
        CannonError::Invocation { concurrency, .. } => assert_eq!(concurrency, 3),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(generator.concurrencies(), vec![1, 2, 3]);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_missing_output_dir_fails_before_any_level() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("out.csv");
    let generator = RecordingGenerator::default();
    let config = RampConfig::new(1, 5, 1, 5).with_output_path(&path);
    let runner = RampedRunner::new(config, generator.clone());

    let err = runner
        .fire_requests(&target(), &ProgressBar::hidden())
        .await
        .unwrap_err();

    assert!(matches!(err, CannonError::Io { .. }));
    assert!(generator.concurrencies().is_empty());
}

#[cfg(unix)]
mod scripted_hey {
    use super::*;
    use cannon_core::HeyGenerator;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Install an executable shell script standing in for `hey`.
    fn install_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-hey");
        std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_passes_arguments_and_cert_env() {
        let dir = tempfile::tempdir().unwrap();
        let script = install_script(
            dir.path(),
            "printf 'cert=%s key=%s\\n' \"$X509_USER_CERT\" \"$X509_USER_KEY\"\n\
             printf '%s|' \"$@\"\n\
             printf '\\n'\n",
        );
        let output = dir.path().join("report.csv");
        let auth = Auth::client_certificate(Some("/certs/client.pem".into()), Some("/certs/client.key".into()))
            .unwrap();
        let config = RampConfig::new(1, 2, 1, 4)
            .with_auth(auth)
            .with_output_path(&output);
        let runner = RampedRunner::new(config, HeyGenerator::new(&script));

        let outcome = runner
            .fire_requests(&target(), &ProgressBar::hidden())
            .await
            .unwrap();

        let text = String::from_utf8(outcome.output.clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "cert=/certs/client.pem key=/certs/client.key");
        assert_eq!(
            lines[1],
            "-n|4|-c|1|-q|0|-T|application/json|-d|{\"name\":\"test_credential\"}|-m|POST|\
             -disable-compression|-disable-keepalive|-o|csv|http://127.0.0.1:8844/api/v1/data|"
        );
        assert!(lines[3].starts_with("-n|4|-c|2|"));
        assert_eq!(std::fs::read(&output).unwrap(), outcome.output);
    }

    #[tokio::test]
    async fn test_nonzero_exit_aborts_with_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = install_script(
            dir.path(),
            "if [ \"$4\" = \"2\" ]; then echo 'dial tcp: connection refused' >&2; exit 3; fi\n\
             echo \"level $4\"\n",
        );
        let output = dir.path().join("report.csv");
        let config = RampConfig::new(1, 3, 1, 3).with_output_path(&output);
        let runner = RampedRunner::new(config, HeyGenerator::new(&script));

        let err = runner
            .fire_requests(&target(), &ProgressBar::hidden())
            .await
            .unwrap_err();

        match err {
            CannonError::Invocation { concurrency, message } => {
                assert_eq!(concurrency, 2);
                assert!(message.contains("connection refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!output.exists());
    }
}
