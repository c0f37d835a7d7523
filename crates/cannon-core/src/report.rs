//! Per-level summary of a concatenated generator report.
//!
//! A ramp writes one CSV section per concurrency level, each starting with
//! the generator's header line. Sections are split on repeated headers and
//! summarized independently.

use chrono::{DateTime, NaiveDateTime};
use csv::ReaderBuilder;

use crate::error::{CannonError, CannonResult};

const LATENCY_COLUMN: &str = "response-time";
const OFFSET_COLUMN: &str = "offset";
const START_TIME_COLUMN: &str = "start-time";
const STATUS_COLUMN: &str = "status-code";

/// Latency distribution of one section, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyStats {
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}

/// Summary of one concurrency level.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSummary {
    /// Zero-based position of the section in the report.
    pub index: usize,
    pub requests: usize,
    pub latency: LatencyStats,
    /// Requests per second over the section's whole seconds, when it spans
    /// at least three of them.
    pub throughput: Option<f64>,
    /// Responses outside 2xx, when the report carries status codes.
    pub non_2xx: Option<usize>,
}

/// Split a concatenated report into per-level CSV sections.
pub fn split_sections(text: &str) -> Vec<String> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = match lines.next() {
        Some(h) => h.trim().to_string(),
        None => return Vec::new(),
    };

    let mut sections = Vec::new();
    let mut current = format!("{header}\n");

    for line in lines {
        if line.trim() == header {
            sections.push(std::mem::replace(&mut current, format!("{header}\n")));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    sections.push(current);
    sections
}

/// Summarize every section of a concatenated report.
///
/// # Errors
///
/// Returns [`CannonError::Report`] if the report is empty, a section has
/// no rows, or a section lacks the `response-time` column.
pub fn summarize(data: &[u8]) -> CannonResult<Vec<SectionSummary>> {
    let text = String::from_utf8_lossy(data);
    let sections = split_sections(&text);
    if sections.is_empty() {
        return Err(CannonError::report("report is empty"));
    }

    sections
        .iter()
        .enumerate()
        .map(|(index, section)| summarize_section(index, section))
        .collect()
}

fn summarize_section(index: usize, section: &str) -> CannonResult<SectionSummary> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(section.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| CannonError::report(format!("section {index}: {e}")))?
        .clone();

    let position = |name: &str| headers.iter().position(|h| h == name);
    let latency_idx = position(LATENCY_COLUMN).ok_or_else(|| {
        CannonError::report(format!("section {index}: column '{LATENCY_COLUMN}' not found"))
    })?;
    let offset_idx = position(OFFSET_COLUMN);
    let start_idx = position(START_TIME_COLUMN);
    let status_idx = position(STATUS_COLUMN);

    let mut latencies = Vec::new();
    let mut instants = Vec::new();
    let mut non_2xx = 0usize;

    for result in reader.records() {
        let record = result.map_err(|e| CannonError::report(format!("section {index}: {e}")))?;

        let latency = record
            .get(latency_idx)
            .and_then(|v| v.parse::<f64>().ok())
            .ok_or_else(|| {
                CannonError::report(format!("section {index}: bad latency in {record:?}"))
            })?;
        latencies.push(latency);

        let instant = match (offset_idx, start_idx) {
            (Some(i), _) => record.get(i).and_then(|v| v.parse::<f64>().ok()),
            (None, Some(i)) => record.get(i).and_then(parse_start_time),
            (None, None) => None,
        };
        if let Some(t) = instant {
            instants.push(t);
        }

        if let Some(code) = status_idx.and_then(|i| record.get(i)) {
            if !code.starts_with('2') {
                non_2xx += 1;
            }
        }
    }

    if latencies.is_empty() {
        return Err(CannonError::report(format!(
            "section {index} has no rows; increase the number of requests"
        )));
    }

    Ok(SectionSummary {
        index,
        requests: latencies.len(),
        latency: latency_stats(&mut latencies),
        throughput: throughput(&instants),
        non_2xx: status_idx.map(|_| non_2xx),
    })
}

/// Seconds since the Unix epoch for a `start-time` cell.
fn parse_start_time(value: &str) -> Option<f64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_micros() as f64 / 1_000_000.0);
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc().timestamp_micros() as f64 / 1_000_000.0)
}

fn latency_stats(latencies: &mut [f64]) -> LatencyStats {
    latencies.sort_by(|a, b| a.total_cmp(b));
    let mean = latencies.iter().sum::<f64>() / latencies.len() as f64;

    LatencyStats {
        mean,
        p50: percentile(latencies, 0.50),
        p95: percentile(latencies, 0.95),
        p99: percentile(latencies, 0.99),
        max: latencies[latencies.len() - 1],
    }
}

/// Nearest-rank percentile over sorted, non-empty samples.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Requests per second, bucketed by whole second.
///
/// The first and last buckets are only partly covered by the run, so their
/// rows are dropped and only the interior seconds are counted.
fn throughput(instants: &[f64]) -> Option<f64> {
    let first = instants.iter().copied().reduce(f64::min)?.floor();
    let last = instants.iter().copied().reduce(f64::max)?.floor();

    let interior = last - first - 1.0;
    if interior < 1.0 {
        return None;
    }

    let kept = instants
        .iter()
        .map(|t| t.floor())
        .filter(|bucket| *bucket > first && *bucket < last)
        .count();
    Some(kept as f64 / interior)
}
