//! Supervises the polling tasks of one page and reloads it when indexing ends.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::task::{CycleOutcome, PollTask};
use crate::client::StatusSource;
use crate::display::IndicatorDisplay;
use crate::page::Page;

/// Create the channel used to stop a [`Watcher`].
///
/// Sending `true` (or dropping the sender) stops it.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Loads a page, polls every indicator on it, and loads it again each time
/// indexing finishes.
pub struct Watcher<P> {
    page: P,
    source: Arc<dyn StatusSource>,
    display: Arc<dyn IndicatorDisplay>,
    interval: Duration,
}

impl<P: Page> Watcher<P> {
    pub fn new(
        page: P,
        source: Arc<dyn StatusSource>,
        display: Arc<dyn IndicatorDisplay>,
        interval: Duration,
    ) -> Self {
        Self {
            page,
            source,
            display,
            interval,
        }
    }

    /// Poll until shutdown. Returns the number of page reloads performed.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> usize {
        let mut reloads = 0;

        loop {
            let loaded = tokio::select! {
                loaded = self.page.load() => loaded,
                _ = wait_for_shutdown(&mut shutdown) => return reloads,
            };

            let targets = match loaded {
                Ok(targets) if targets.is_empty() => {
                    warn!("No progress indicators found on {}", self.page.describe());
                    if self.pause(&mut shutdown).await {
                        return reloads;
                    }
                    continue;
                }
                Ok(targets) => targets,
                Err(e) => {
                    warn!("Failed to load {}: {}", self.page.describe(), e);
                    if self.pause(&mut shutdown).await {
                        return reloads;
                    }
                    continue;
                }
            };

            info!(
                "Watching {} endpoint(s) from {}",
                targets.len(),
                self.page.describe()
            );
            self.display.reset();

            let mut tasks = JoinSet::new();
            for target in targets {
                let task = PollTask::new(
                    target,
                    self.source.clone(),
                    self.display.clone(),
                    self.interval,
                );
                tasks.spawn(task.run());
            }

            let reload = tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok(CycleOutcome::Reload)) => true,
                    Some(Ok(CycleOutcome::Continue)) => true,
                    Some(Err(e)) => {
                        error!("Polling task stopped unexpectedly: {}", e);
                        true
                    }
                    None => true,
                },
                _ = wait_for_shutdown(&mut shutdown) => false,
            };

            // Drops pending sleeps and in-flight requests of every task.
            tasks.shutdown().await;

            if !reload {
                return reloads;
            }
            reloads += 1;
        }
    }

    /// Wait one interval. Returns true if shutdown was requested meanwhile.
    async fn pause(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(self.interval) => false,
            _ = wait_for_shutdown(shutdown) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::PollError;
    use crate::poller::{IndicatorState, PollTarget};

    struct CountingPage {
        targets: Vec<PollTarget>,
        loads: Mutex<usize>,
    }

    impl CountingPage {
        fn new(targets: Vec<PollTarget>) -> Self {
            Self {
                targets,
                loads: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Page for CountingPage {
        async fn load(&self) -> Result<Vec<PollTarget>, PollError> {
            *self.loads.lock().unwrap() += 1;
            Ok(self.targets.clone())
        }

        fn describe(&self) -> String {
            "test page".to_string()
        }
    }

    struct Script {
        responses: Mutex<VecDeque<&'static str>>,
        in_flight: Mutex<u32>,
        max_in_flight: Mutex<u32>,
    }

    impl Script {
        fn new(responses: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                in_flight: Mutex::new(0),
                max_in_flight: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl StatusSource for Script {
        async fn fetch_status(&self, _url: &str) -> Result<String, PollError> {
            {
                let mut in_flight = self.in_flight.lock().unwrap();
                *in_flight += 1;
                let mut max = self.max_in_flight.lock().unwrap();
                *max = (*max).max(*in_flight);
            }
            // A slow response, longer than the poll interval.
            tokio::time::sleep(Duration::from_millis(1500)).await;
            *self.in_flight.lock().unwrap() -= 1;
            let next = self.responses.lock().unwrap().pop_front();
            Ok(next.unwrap_or_default().to_string())
        }
    }

    struct NullDisplay;

    impl IndicatorDisplay for NullDisplay {
        fn update(&self, _key: &str, _state: &IndicatorState) {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_reloads_once_per_transition() {
        let page = CountingPage::new(vec![PollTarget::new("http://h/progress")]);
        let source = Script::new(vec![
            r#"{"runningCount":2,"indexes":{}}"#,
            r#"{"runningCount":0,"indexes":{}}"#,
            r#"{"runningCount":0,"indexes":{}}"#,
        ]);
        let watcher = Watcher::new(
            page,
            source.clone(),
            Arc::new(NullDisplay),
            Duration::from_millis(1000),
        );
        let (tx, rx) = shutdown_channel();

        let stopper = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            tx.send(true).unwrap();
        };
        let (reloads, _) = tokio::join!(watcher.run(rx), stopper);

        assert_eq!(reloads, 1);
        assert_eq!(*watcher.page.loads.lock().unwrap(), 2);
        assert_eq!(*source.max_in_flight.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_without_reload() {
        let page = CountingPage::new(vec![PollTarget::new("http://h/progress")]);
        let source = Script::new(vec!["0.5"]);
        let watcher = Watcher::new(
            page,
            source,
            Arc::new(NullDisplay),
            Duration::from_millis(1000),
        );
        let (tx, rx) = shutdown_channel();

        let stopper = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            tx.send(true).unwrap();
        };
        let (reloads, _) = tokio::join!(watcher.run(rx), stopper);

        assert_eq!(reloads, 0);
        assert_eq!(*watcher.page.loads.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_page_is_loaded_again() {
        let page = CountingPage::new(Vec::new());
        let watcher = Watcher::new(
            page,
            Script::new(Vec::new()),
            Arc::new(NullDisplay),
            Duration::from_millis(1000),
        );
        let (tx, rx) = shutdown_channel();

        let stopper = async {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            tx.send(true).unwrap();
        };
        let (reloads, _) = tokio::join!(watcher.run(rx), stopper);

        assert_eq!(reloads, 0);
        assert_eq!(*watcher.page.loads.lock().unwrap(), 3);
    }
}
