//! Template baseline correction.
//!
//! `WholeCycle` — matches `template -= template.mean()`.
//!
//! `Interval`   — the `(start, end)` offsets in seconds are mapped to sample
//!   indices with `idx = round(t / TR · L)` (`L` = cycle length in samples) and
//!   `template -= template[i0..i1].mean()`.
//!
//! Intervals reaching outside the cycle are rejected rather than clamped.
use ndarray::{s, ArrayViewMut1};

use crate::config::BaselineSpec;
use crate::error::{GradientError, Result};
use crate::repetition::RepetitionInterval;

/// A [`BaselineSpec`] resolved to sample indices for one cycle length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineWindow {
    Disabled,
    Whole,
    /// Half-open sample range `[start, end)` within the cycle.
    Range(usize, usize),
}

/// Map a second offset inside the cycle to a sample index.
#[inline]
pub fn time_to_index(t: f64, rep: &RepetitionInterval) -> f64 {
    ((t / rep.seconds) * rep.samples as f64).round()
}

/// Resolve `spec` against the repetition interval.
pub fn resolve(spec: BaselineSpec, rep: &RepetitionInterval) -> Result<BaselineWindow> {
    match spec {
        BaselineSpec::Disabled => Ok(BaselineWindow::Disabled),
        BaselineSpec::WholeCycle => Ok(BaselineWindow::Whole),
        BaselineSpec::Interval { start, end } => {
            let out_of_range = GradientError::BaselineOutOfRange {
                start,
                end,
                cycle_seconds: rep.seconds,
            };
            if !(start.is_finite() && end.is_finite()) || start < 0.0 || start > end {
                return Err(out_of_range);
            }
            let i0 = time_to_index(start, rep);
            let i1 = time_to_index(end, rep);
            if i1 > rep.samples as f64 {
                return Err(out_of_range);
            }
            let (i0, i1) = (i0 as usize, i1 as usize);
            if i0 >= i1 {
                return Err(GradientError::EmptyBaseline);
            }
            Ok(BaselineWindow::Range(i0, i1))
        }
    }
}

/// Subtract the baseline mean from `template` in place.
/// Returns the value that was subtracted (0 when disabled).
pub fn baseline_correct_inplace(mut template: ArrayViewMut1<f64>, window: BaselineWindow) -> f64 {
    let m = match window {
        BaselineWindow::Disabled => return 0.0,
        BaselineWindow::Whole => template.mean().unwrap_or(0.0),
        BaselineWindow::Range(a, b) => template.slice(s![a..b]).mean().unwrap_or(0.0),
    };
    template.mapv_inplace(|v| v - m);
    m
}
