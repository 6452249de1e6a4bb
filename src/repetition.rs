//! Repetition-time estimation from trigger markers.
//!
//! The cycle length is the gap between the first two markers and is applied
//! to every cycle. Later gaps are checked against it with a symmetric
//! tolerance. A gap up to `tolerance` samples short of the cycle length makes
//! two neighbouring cycles overlap by that many samples; the later cycle wins
//! the shared samples on reconstruction. A shorter gap is always rejected.
//! A longer gap beyond tolerance is handled according to [`SpacingPolicy`].
use crate::config::SpacingPolicy;
use crate::error::{GradientError, Result};

/// Scanner repetition interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepetitionInterval {
    /// Cycle length in samples (always > 0).
    pub samples: usize,
    /// Cycle length in seconds.
    pub seconds: f64,
}

/// Derive the repetition interval from marker sample indices.
///
/// `markers` must hold at least two strictly increasing sample indices.
pub fn estimate_repetition(markers: &[usize], sfreq: f64) -> Result<RepetitionInterval> {
    if markers.len() < 2 {
        return Err(GradientError::InsufficientMarkers {
            label: String::new(),
            found: markers.len(),
        });
    }
    if !(sfreq.is_finite() && sfreq > 0.0) {
        return Err(GradientError::InvalidSamplingRate(sfreq));
    }
    let (first, second) = (markers[0], markers[1]);
    if second <= first {
        return Err(GradientError::NonPositiveCycle { first, second });
    }

    let samples = second - first;
    let seconds = samples as f64 / sfreq;
    log::info!("Scanner repetition time = {seconds:.3} s ({samples} samples)");
    Ok(RepetitionInterval { samples, seconds })
}

/// Validate every inter-marker gap against `cycle_len`.
///
/// Returns the number of gaps that differ from `cycle_len` by more than
/// `tolerance` samples (only non-zero under [`SpacingPolicy::Warn`]).
pub fn check_spacing(
    markers: &[usize],
    cycle_len: usize,
    tolerance: usize,
    policy: SpacingPolicy,
) -> Result<usize> {
    let mut irregular = 0;
    for (i, pair) in markers.windows(2).enumerate() {
        let index = i + 1;
        if pair[1] <= pair[0] {
            return Err(GradientError::UnorderedMarkers { index });
        }
        let gap = pair[1] - pair[0];
        let deviation = gap.abs_diff(cycle_len);
        if deviation <= tolerance {
            if gap < cycle_len {
                log::debug!(
                    "cycles {} and {index} overlap by {deviation} samples; the later cycle is kept",
                    index - 1
                );
            }
            continue;
        }
        if gap < cycle_len {
            return Err(GradientError::IrregularSpacing { index, gap, expected: cycle_len });
        }
        match policy {
            SpacingPolicy::Strict => {
                return Err(GradientError::IrregularSpacing { index, gap, expected: cycle_len });
            }
            SpacingPolicy::Warn => {
                log::debug!("gap of {gap} samples before marker {index} (cycle length {cycle_len})");
                irregular += 1;
            }
        }
    }
    if irregular > 0 {
        log::warn!(
            "{irregular} of {} marker gaps differ from the cycle length of {cycle_len} samples; \
             samples between cycles are passed through uncorrected",
            markers.len() - 1
        );
    }
    Ok(irregular)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_from_first_gap() {
        let rep = estimate_repetition(&[100, 1300, 2500], 1000.0).unwrap();
        assert_eq!(rep.samples, 1200);
        approx::assert_abs_diff_eq!(rep.seconds, 1.2, epsilon = 1e-12);
    }

    #[test]
    fn single_marker_fails() {
        assert!(matches!(
            estimate_repetition(&[100], 1000.0),
            Err(GradientError::InsufficientMarkers { found: 1, .. })
        ));
    }

    #[test]
    fn repeated_marker_is_non_positive() {
        assert_eq!(
            estimate_repetition(&[100, 100], 1000.0),
            Err(GradientError::NonPositiveCycle { first: 100, second: 100 })
        );
    }

    #[test]
    fn uniform_spacing_passes_strict() {
        let m = [0, 10, 20, 30];
        assert_eq!(check_spacing(&m, 10, 0, SpacingPolicy::Strict), Ok(0));
    }

    #[test]
    fn wider_gap_warns_or_fails() {
        let m = [0, 10, 25, 35];
        assert_eq!(check_spacing(&m, 10, 0, SpacingPolicy::Warn), Ok(1));
        assert_eq!(
            check_spacing(&m, 10, 0, SpacingPolicy::Strict),
            Err(GradientError::IrregularSpacing { index: 2, gap: 15, expected: 10 })
        );
        assert_eq!(check_spacing(&m, 10, 5, SpacingPolicy::Strict), Ok(0));
    }

    #[test]
    fn short_gap_beyond_tolerance_always_fails() {
        let m = [0, 10, 18];
        for policy in [SpacingPolicy::Warn, SpacingPolicy::Strict] {
            assert_eq!(
                check_spacing(&m, 10, 1, policy),
                Err(GradientError::IrregularSpacing { index: 2, gap: 8, expected: 10 })
            );
        }
    }

    #[test]
    fn short_gap_within_tolerance_is_accepted() {
        let m = [0, 100, 199, 300];
        for policy in [SpacingPolicy::Warn, SpacingPolicy::Strict] {
            assert_eq!(check_spacing(&m, 100, 2, policy), Ok(0));
        }
        assert_eq!(check_spacing(&[0, 10, 18], 10, 5, SpacingPolicy::Strict), Ok(0));
    }

    #[test]
    fn unordered_markers_fail() {
        assert_eq!(
            check_spacing(&[0, 10, 5], 10, 0, SpacingPolicy::Warn),
            Err(GradientError::UnorderedMarkers { index: 2 })
        );
    }
}
