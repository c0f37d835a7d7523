use std::path::Path;

use cannon_core::{summarize, CannonError, CannonResult, SectionSummary};
use tracing::info;

/// Read a concatenated report and summarize each concurrency level.
pub async fn summarize_file(file: &Path) -> CannonResult<Vec<SectionSummary>> {
    let data = tokio::fs::read(file).await.map_err(|source| CannonError::Io {
        path: file.to_path_buf(),
        source,
    })?;

    info!("Summarizing {} ({} bytes)", file.display(), data.len());
    summarize(&data)
}

/// Render summaries as a fixed-width table.
pub fn render_table(summaries: &[SectionSummary]) -> String {
    let mut out = format!(
        "{:>5} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>10} {:>8}\n",
        "level", "requests", "mean(s)", "p50(s)", "p95(s)", "p99(s)", "max(s)", "req/s", "non-2xx"
    );

    for s in summaries {
        let throughput = s
            .throughput
            .map(|t| format!("{t:.1}"))
            .unwrap_or_else(|| "-".to_string());
        let non_2xx = s
            .non_2xx
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!(
            "{:>5} {:>9} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>9.4} {:>10} {:>8}\n",
            s.index + 1,
            s.requests,
            s.latency.mean,
            s.latency.p50,
            s.latency.p95,
            s.latency.p99,
            s.latency.max,
            throughput,
            non_2xx
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_summarize_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("getPerfResults.csv");
        std::fs::write(
            &path,
            "response-time,status-code,offset\n0.1,200,0.2\n0.3,200,1.1\n0.2,200,1.6\n0.1,200,2.4\n\
             response-time,status-code,offset\n0.2,503,0.0\n",
        )
        .unwrap();

        let summaries = summarize_file(&path).await.unwrap();
        assert_eq!(summaries.len(), 2);

        let table = render_table(&summaries);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("non-2xx"));
        assert!(lines[1].contains("2.0"));
        assert!(lines[2].trim_end().ends_with('1'));
        assert!(lines[2].contains(" - "));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let err = summarize_file(Path::new("/nonexistent/report.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, CannonError::Io { .. }));
    }
}
