//! Where indicator states end up: terminal progress bars or log lines.

use std::collections::HashMap;
use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::info;

use crate::error::DisplayError;
use crate::poller::IndicatorState;

/// Receives rendered indicator states.
///
/// Updates replace the previous state for a key, so applying the same state
/// twice leaves the display unchanged.
pub trait IndicatorDisplay: Send + Sync {
    /// Show the state of one indicator.
    fn update(&self, key: &str, state: &IndicatorState);

    /// Forget every indicator, e.g. before the page is loaded again.
    fn reset(&self) {}
}

const ACTIVE_TEMPLATE: &str = "{prefix:>16.bold} [{bar:40.cyan/blue}] {msg}";
const DIMMED_TEMPLATE: &str = "{prefix:>16.dim} [{bar:40.dim}] {msg:.dim}";

/// One indicatif bar per indicator, grouped in a `MultiProgress`.
pub struct TerminalDisplay {
    multi: MultiProgress,
    active_style: ProgressStyle,
    dimmed_style: ProgressStyle,
    bars: Mutex<HashMap<String, (ProgressBar, bool)>>,
}

impl TerminalDisplay {
    pub fn new() -> Result<Self, DisplayError> {
        Ok(Self {
            multi: MultiProgress::new(),
            active_style: ProgressStyle::with_template(ACTIVE_TEMPLATE)?.progress_chars("#>-"),
            dimmed_style: ProgressStyle::with_template(DIMMED_TEMPLATE)?.progress_chars("#>-"),
            bars: Mutex::new(HashMap::new()),
        })
    }

    fn style_for(&self, active: bool) -> ProgressStyle {
        if active {
            self.active_style.clone()
        } else {
            self.dimmed_style.clone()
        }
    }
}

impl IndicatorDisplay for TerminalDisplay {
    fn update(&self, key: &str, state: &IndicatorState) {
        let mut bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        let (bar, active) = bars.entry(key.to_string()).or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new(100));
            bar.set_style(self.style_for(state.active));
            bar.set_prefix(key.to_string());
            (bar, state.active)
        });

        if *active != state.active {
            bar.set_style(self.style_for(state.active));
            *active = state.active;
        }
        bar.set_position(state.percent.map(u64::from).unwrap_or(0));
        bar.set_message(state.label.clone());
    }

    fn reset(&self) {
        let mut bars = self.bars.lock().unwrap_or_else(|e| e.into_inner());
        for (_, (bar, _)) in bars.drain() {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }
}

/// Logs each indicator change through tracing; for non-interactive use.
#[derive(Default)]
pub struct LogDisplay {
    last: Mutex<HashMap<String, IndicatorState>>,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last state logged for a key.
    pub fn current(&self, key: &str) -> Option<IndicatorState> {
        let last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        last.get(key).cloned()
    }
}

impl IndicatorDisplay for LogDisplay {
    fn update(&self, key: &str, state: &IndicatorState) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if last.get(key) == Some(state) {
            return;
        }
        info!(
            index = key,
            running = state.active,
            "{}: {}{}",
            key,
            state.label,
            if state.active { "" } else { " (idle)" }
        );
        last.insert(key.to_string(), state.clone());
    }

    fn reset(&self) {
        self.last.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
