use cannon_core::{OutputSettings, RequestType};
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Where the concatenated report goes for this run, if anywhere.
///
/// A fixed `path` wins; otherwise the file is named after the request type
/// and the UTC start time, e.g. `getPerfResults-20240102150405.csv`.
pub fn report_path(
    output: &OutputSettings,
    request_type: RequestType,
    now: DateTime<Utc>,
) -> Option<PathBuf> {
    if !output.enabled {
        return None;
    }

    if let Some(path) = &output.path {
        return Some(path.clone());
    }

    Some(output.dir.join(format!(
        "{}PerfResults-{}.csv",
        request_type,
        now.format("%Y%m%d%H%M%S")
    )))
}
