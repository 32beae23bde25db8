//! Progress polling.
//!
//! Every [`PollTarget`] gets its own task that fetches the endpoint, updates
//! the indicators it feeds, sleeps a fixed interval and starts over. A task
//! only stops by asking for the page to be reloaded, which happens when a
//! global snapshot shows the running count dropping to zero. The
//! [`Watcher`] owns the tasks and performs the reload.

mod render;
mod snapshot;
mod task;
mod transition;
mod watcher;

pub use render::{percent_of, render, IndicatorState, PROCESSING_LABEL};
pub use snapshot::{parse_report, IndicatorStatus, StatusReport};
pub use task::{CycleOutcome, PollTask};
pub use transition::RunningCountTracker;
pub use watcher::{shutdown_channel, Watcher};

pub use crate::error::PollError;

use std::time::Duration;

/// Delay between the end of one poll and the start of the next.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// One progress indicator found on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorSpec {
    /// Index key, e.g. `books` for the element `progress_books`.
    pub key: String,
    /// Absolute URL of the endpoint reporting this indicator.
    pub endpoint_url: String,
}

/// One endpoint polled by one task, and the indicators it feeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTarget {
    pub url: String,
    /// Keys updated from this endpoint. Empty means every key it reports.
    pub keys: Vec<String>,
}

impl PollTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            keys: Vec::new(),
        }
    }

    pub fn with_keys(url: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            url: url.into(),
            keys,
        }
    }

    /// Whether a key from a global snapshot belongs to this target.
    pub fn accepts(&self, key: &str) -> bool {
        self.keys.is_empty() || self.keys.iter().any(|k| k == key)
    }

    /// Keys a single-indicator response applies to.
    pub fn single_keys(&self) -> Vec<&str> {
        if self.keys.is_empty() {
            vec![self.url.as_str()]
        } else {
            self.keys.iter().map(String::as_str).collect()
        }
    }
}

/// Group indicators sharing an endpoint into one target each, keeping the
/// order in which endpoints first appear.
pub fn group_targets(indicators: impl IntoIterator<Item = IndicatorSpec>) -> Vec<PollTarget> {
    let mut targets: Vec<PollTarget> = Vec::new();
    for indicator in indicators {
        match targets.iter_mut().find(|t| t.url == indicator.endpoint_url) {
            Some(target) => {
                if !target.keys.contains(&indicator.key) {
                    target.keys.push(indicator.key);
                }
            }
            None => targets.push(PollTarget::with_keys(
                indicator.endpoint_url,
                vec![indicator.key],
            )),
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(key: &str, url: &str) -> IndicatorSpec {
        IndicatorSpec {
            key: key.to_string(),
            endpoint_url: url.to_string(),
        }
    }

    #[test]
    fn test_group_targets_merges_shared_endpoint() {
        let targets = group_targets(vec![
            spec("books", "http://h/reindex/progress"),
            spec("solo", "http://h/solo/progress"),
            spec("maps", "http://h/reindex/progress"),
            spec("books", "http://h/reindex/progress"),
        ]);
        assert_eq!(
            targets,
            vec![
                PollTarget::with_keys(
                    "http://h/reindex/progress",
                    vec!["books".to_string(), "maps".to_string()]
                ),
                PollTarget::with_keys("http://h/solo/progress", vec!["solo".to_string()]),
            ]
        );
    }

    #[test]
    fn test_target_key_scope() {
        let open = PollTarget::new("http://h/p");
        assert!(open.accepts("anything"));
        assert_eq!(open.single_keys(), vec!["http://h/p"]);

        let scoped = PollTarget::with_keys("http://h/p", vec!["books".to_string()]);
        assert!(scoped.accepts("books"));
        assert!(!scoped.accepts("maps"));
        assert_eq!(scoped.single_keys(), vec!["books"]);
    }
}
