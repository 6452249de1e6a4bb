//! Gradient-removal configuration.
//!
//! [`GradientConfig`] gathers every tunable of [`remove_gradients`](crate::remove_gradients).
//! The defaults reproduce the classic setup: global template over all volumes,
//! no baseline correction, lenient marker spacing.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{GradientError, Result};

/// How many neighbouring cycles contribute to each template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowSpec {
    /// Average over every cycle of the channel.
    #[default]
    Global,
    /// Average over cycles `[i - half_width, i + half_width]`, clamped to the
    /// recording (the window shrinks near both ends).
    Sliding { half_width: usize },
}

impl WindowSpec {
    /// Build from an optional window length in cycles.
    ///
    /// `None` selects [`WindowSpec::Global`]. An even length is rounded up to
    /// the next odd number so the window stays centred on the current cycle.
    ///
    /// ```
    /// use gradclean::WindowSpec;
    /// assert_eq!(WindowSpec::from_length(Some(4)).unwrap(), WindowSpec::Sliding { half_width: 2 });
    /// assert_eq!(WindowSpec::from_length(None).unwrap(), WindowSpec::Global);
    /// ```
    pub fn from_length(length: Option<usize>) -> Result<Self> {
        match length {
            None => Ok(WindowSpec::Global),
            Some(0) => Err(GradientError::InvalidWindow),
            Some(n) => {
                let odd = if n % 2 == 0 {
                    log::warn!("Window length must be odd. Window length is now {}", n + 1);
                    n + 1
                } else {
                    n
                };
                Ok(WindowSpec::Sliding { half_width: odd / 2 })
            }
        }
    }

    /// Full window length in cycles, `None` for the global template.
    pub fn length(&self) -> Option<usize> {
        match *self {
            WindowSpec::Global => None,
            WindowSpec::Sliding { half_width } => Some(2 * half_width + 1),
        }
    }
}

/// Baseline correction applied to each template before subtraction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BaselineSpec {
    /// Use the raw windowed mean.
    #[default]
    Disabled,
    /// Subtract the mean of the whole template (DC-centre it).
    WholeCycle,
    /// Subtract the mean of the template between `start` and `end` seconds
    /// after cycle onset.
    Interval { start: f64, end: f64 },
}

impl BaselineSpec {
    /// Mirror of the `baseline_correction` / `baseline` argument pair.
    ///
    /// An interval passed while correction is disabled is ignored.
    pub fn from_args(enabled: bool, interval: Option<(f64, f64)>) -> Self {
        match (enabled, interval) {
            (false, _) => BaselineSpec::Disabled,
            (true, None) => BaselineSpec::WholeCycle,
            (true, Some((start, end))) => BaselineSpec::Interval { start, end },
        }
    }
}

/// What to do when marker gaps differ from the first gap.
///
/// Only gaps deviating by more than the configured tolerance reach the
/// policy. Such gaps that are shorter than the cycle length are always fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpacingPolicy {
    /// Log a warning and keep the fixed cycle length.
    #[default]
    Warn,
    /// Fail with [`GradientError::IrregularSpacing`].
    Strict,
}

/// Configuration for [`remove_gradients`](crate::remove_gradients).
///
/// ```
/// use gradclean::{GradientConfig, WindowSpec, BaselineSpec};
///
/// let cfg = GradientConfig {
///     event_label: "TR".into(),
///     window: WindowSpec::from_length(Some(21)).unwrap(),
///     baseline: BaselineSpec::WholeCycle,
///     ..GradientConfig::default()
/// };
/// assert_eq!(cfg.window.length(), Some(21));
/// ```
#[derive(Debug, Clone)]
pub struct GradientConfig {
    /// Label of the trigger markers that start each scanner cycle.
    ///
    /// Default: `"Gradient/G  1"`.
    pub event_label: String,

    /// Template averaging window.
    ///
    /// Default: [`WindowSpec::Global`].
    pub window: WindowSpec,

    /// Template baseline correction.
    ///
    /// Default: [`BaselineSpec::Disabled`].
    pub baseline: BaselineSpec,

    /// Reaction to marker gaps that differ from the cycle length.
    pub spacing: SpacingPolicy,

    /// Allowed deviation, in samples, between any gap and the cycle length
    /// before the spacing policy kicks in. Applies to shorter and longer gaps
    /// alike; a short gap within tolerance makes two cycles overlap, and the
    /// later one owns the shared samples in the output.
    ///
    /// Default: `0`.
    pub spacing_tolerance: usize,

    /// Optional cancellation flag, polled once per channel.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            event_label: "Gradient/G  1".to_string(),
            window: WindowSpec::Global,
            baseline: BaselineSpec::Disabled,
            spacing: SpacingPolicy::Warn,
            spacing_tolerance: 0,
            cancel: None,
        }
    }
}

impl GradientConfig {
    /// Build from the classic argument list
    /// `(event_label, window_length, baseline_correction, baseline)`.
    pub fn from_args(
        event_label: &str,
        window_length: Option<usize>,
        baseline_correction: bool,
        baseline: Option<(f64, f64)>,
    ) -> Result<Self> {
        Ok(Self {
            event_label: event_label.to_string(),
            window: WindowSpec::from_length(window_length)?,
            baseline: BaselineSpec::from_args(baseline_correction, baseline),
            ..Self::default()
        })
    }

    /// True once the cancellation flag (if any) has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
