//! The fetch-update-sleep loop for one target.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::render::render;
use super::snapshot::{parse_report, StatusReport};
use super::transition::RunningCountTracker;
use super::PollTarget;
use crate::client::StatusSource;
use crate::display::IndicatorDisplay;

/// What a cycle decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Sleep the interval and poll again.
    Continue,
    /// Indexing just finished; the page should be loaded again.
    Reload,
}

/// Polls one target until indexing finishes.
///
/// Requests are strictly sequential: the next one is only sent after the
/// previous response was handled and the interval elapsed.
pub struct PollTask {
    target: PollTarget,
    source: Arc<dyn StatusSource>,
    display: Arc<dyn IndicatorDisplay>,
    interval: Duration,
    tracker: RunningCountTracker,
    failures: u32,
}

impl PollTask {
    pub fn new(
        target: PollTarget,
        source: Arc<dyn StatusSource>,
        display: Arc<dyn IndicatorDisplay>,
        interval: Duration,
    ) -> Self {
        Self {
            target,
            source,
            display,
            interval,
            tracker: RunningCountTracker::new(),
            failures: 0,
        }
    }

    pub fn target(&self) -> &PollTarget {
        &self.target
    }

    /// Run cycles until one asks for a reload.
    pub async fn run(mut self) -> CycleOutcome {
        debug!("Polling {} every {:?}", self.target.url, self.interval);
        loop {
            if self.poll_once().await == CycleOutcome::Reload {
                return CycleOutcome::Reload;
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Fetch, parse and apply one response.
    ///
    /// Failures leave the display and the running count untouched.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        let result = match self.source.fetch_status(&self.target.url).await {
            Ok(body) => parse_report(&body),
            Err(e) => Err(e),
        };

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                self.failures += 1;
                if self.failures == 1 {
                    warn!("Progress poll of {} failed: {}", self.target.url, e);
                } else {
                    debug!(
                        "Progress poll of {} failed ({} in a row): {}",
                        self.target.url, self.failures, e
                    );
                }
                return CycleOutcome::Continue;
            }
        };

        if self.failures > 0 {
            info!(
                "Progress poll of {} recovered after {} failures",
                self.target.url, self.failures
            );
            self.failures = 0;
        }

        self.apply(&report);

        if let Some(running_count) = report.running_count() {
            if self.tracker.observe(running_count) {
                info!("Indexing finished, reloading page");
                return CycleOutcome::Reload;
            }
        }
        CycleOutcome::Continue
    }

    /// Push a report to the display.
    pub fn apply(&self, report: &StatusReport) {
        match report {
            StatusReport::Empty => {}
            StatusReport::Single(status) => {
                let state = render(status);
                for key in self.target.single_keys() {
                    self.display.update(key, &state);
                }
            }
            StatusReport::Global { indexes, .. } => {
                for (key, status) in indexes {
                    if self.target.accepts(key) {
                        self.display.update(key, &render(status));
                    }
                }
            }
        }
    }
}
