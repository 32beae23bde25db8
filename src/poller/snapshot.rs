//! Parsing of progress endpoint responses.
//!
//! The endpoint has answered in three shapes over time:
//! - a bare number (or `null`) for one indicator,
//! - `{"progress": 0.4, "running": true}` for one indicator,
//! - `{"runningCount": 1, "indexes": {"<key>": {...}}}` for every indicator.
//!
//! An empty body means "nothing to report this cycle".

use std::collections::BTreeMap;

use serde::Deserialize;

use super::PollError;

/// Progress and running flag for one indicator, as reported by the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct IndicatorStatus {
    /// Fraction in `[0, 1]`; `None` while the indexer cannot estimate it.
    #[serde(default)]
    pub progress: Option<f64>,
    /// Explicit running flag; legacy responses omit it.
    #[serde(default)]
    pub running: Option<bool>,
}

impl IndicatorStatus {
    pub fn new(progress: Option<f64>, running: Option<bool>) -> Self {
        Self { progress, running }
    }

    /// Whether the indexer is still working, inferring from progress when
    /// the response carried no flag.
    pub fn is_running(&self) -> bool {
        match self.running {
            Some(running) => running,
            None => self.progress.map_or(true, |p| p < 1.0),
        }
    }
}

/// One parsed poll response.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusReport {
    /// Success status with an empty body.
    Empty,
    /// Status for the indicator(s) bound to the polled URL.
    Single(IndicatorStatus),
    /// System-wide snapshot covering every index.
    Global {
        running_count: u32,
        indexes: BTreeMap<String, IndicatorStatus>,
    },
}

impl StatusReport {
    /// Running count across all indexes, only known for global snapshots.
    pub fn running_count(&self) -> Option<u32> {
        match self {
            StatusReport::Global { running_count, .. } => Some(*running_count),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GlobalWire {
    #[serde(default)]
    running_count: Option<u32>,
    indexes: BTreeMap<String, IndicatorStatus>,
}

/// Parse a response body into a report.
pub fn parse_report(body: &str) -> Result<StatusReport, PollError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(StatusReport::Empty);
    }

    if body.eq_ignore_ascii_case("null") {
        return Ok(StatusReport::Single(IndicatorStatus::default()));
    }

    if let Ok(progress) = body.parse::<f64>() {
        return Ok(StatusReport::Single(IndicatorStatus::new(
            Some(check_progress(progress)?),
            None,
        )));
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| PollError::Malformed(e.to_string()))?;

    let obj = value
        .as_object()
        .ok_or_else(|| PollError::Malformed(format!("unexpected response: {}", truncate(body))))?;
    let is_global = obj.contains_key("indexes");
    let is_single = obj.contains_key("progress") || obj.contains_key("running");

    if is_global {
        let wire: GlobalWire =
            serde_json::from_value(value).map_err(|e| PollError::Malformed(e.to_string()))?;
        for status in wire.indexes.values() {
            if let Some(progress) = status.progress {
                check_progress(progress)?;
            }
        }
        // Older backends did not send the count; derive it from the entries.
        let running_count = wire
            .running_count
            .unwrap_or_else(|| wire.indexes.values().filter(|s| s.is_running()).count() as u32);
        return Ok(StatusReport::Global {
            running_count,
            indexes: wire.indexes,
        });
    }

    if !is_single {
        return Err(PollError::Malformed(format!(
            "no progress fields in response: {}",
            truncate(body)
        )));
    }
    let status: IndicatorStatus =
        serde_json::from_value(value).map_err(|e| PollError::Malformed(e.to_string()))?;
    if let Some(progress) = status.progress {
        check_progress(progress)?;
    }

    Ok(StatusReport::Single(status))
}

fn check_progress(progress: f64) -> Result<f64, PollError> {
    if progress.is_finite() {
        Ok(progress)
    } else {
        Err(PollError::Malformed(format!(
            "progress is not a finite number: {}",
            progress
        )))
    }
}

fn truncate(body: &str) -> &str {
    let mut end = body.len().min(80);
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
