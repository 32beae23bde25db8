//! Visual state of a progress indicator.

use super::snapshot::IndicatorStatus;

/// Label shown while the indexer cannot estimate its progress.
pub const PROCESSING_LABEL: &str = "Processing...";

/// What an indicator should look like after applying a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorState {
    /// Whole-number percentage, `None` when indeterminate.
    pub percent: Option<u8>,
    /// Text shown on or next to the bar.
    pub label: String,
    /// Active (highlighted) or dimmed.
    pub active: bool,
}

impl IndicatorState {
    pub fn is_indeterminate(&self) -> bool {
        self.percent.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.percent == Some(100)
    }
}

/// Convert a progress fraction to a floored percentage in `[0, 100]`.
pub fn percent_of(progress: f64) -> u8 {
    (progress * 100.0).floor().clamp(0.0, 100.0) as u8
}

/// Compute the indicator state for a status.
///
/// When the status has no running flag, the indicator counts as running
/// until progress reaches 1.
pub fn render(status: &IndicatorStatus) -> IndicatorState {
    let percent = status.progress.map(percent_of);
    let label = match percent {
        Some(percent) => format!("{}%", percent),
        None => PROCESSING_LABEL.to_string(),
    };

    IndicatorState {
        percent,
        label,
        active: status.is_running(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_below_one() {
        for (progress, expected) in [(0.0, 0), (0.005, 0), (0.37, 37), (0.5, 50), (0.999, 99)] {
            let state = render(&IndicatorStatus::new(Some(progress), None));
            assert_eq!(state.percent, Some(expected), "progress {}", progress);
            assert_eq!(state.label, format!("{}%", expected));
            assert!(state.active);
            assert!(!state.is_complete());
        }
    }

    #[test]
    fn test_complete() {
        let state = render(&IndicatorStatus::new(Some(1.0), None));
        assert_eq!(state.percent, Some(100));
        assert_eq!(state.label, "100%");
        assert!(!state.active);
        assert!(state.is_complete());
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(render(&IndicatorStatus::new(Some(1.7), None)).percent, Some(100));
        assert_eq!(render(&IndicatorStatus::new(Some(-0.2), None)).percent, Some(0));
    }

    #[test]
    fn test_indeterminate() {
        let state = render(&IndicatorStatus::new(None, None));
        assert!(state.is_indeterminate());
        assert_eq!(state.label, PROCESSING_LABEL);
        assert!(state.active);
    }

    #[test]
    fn test_explicit_running_flag_wins() {
        let state = render(&IndicatorStatus::new(Some(0.8), Some(true)));
        assert_eq!(state.label, "80%");
        assert!(state.active);

        let state = render(&IndicatorStatus::new(Some(0.4), Some(false)));
        assert!(!state.active);

        let state = render(&IndicatorStatus::new(None, Some(false)));
        assert!(state.is_indeterminate());
        assert!(!state.active);
    }

    #[test]
    fn test_render_is_deterministic() {
        let status = IndicatorStatus::new(Some(0.42), Some(true));
        assert_eq!(render(&status), render(&status));
    }
}
