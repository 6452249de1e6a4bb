//! # gradclean — MR gradient-artifact removal for EEG in pure Rust
//!
//! EEG recorded inside an MR scanner carries a large artifact induced by the
//! switching gradients. The artifact repeats with every volume, so it can be
//! estimated by averaging marker-locked cycles and subtracted (average
//! artifact subtraction). The full recording and its length are preserved.
//!
//! ## Pipeline overview
//!
//! ```text
//! recording [C, T] + trigger markers
//!   │
//!   ├─ events::select_marker_samples()   markers with the scanner label
//!   ├─ repetition::estimate_repetition() TR from the first marker gap
//!   ├─ repetition::check_spacing()       later gaps vs. TR
//!   ├─ epoch::extract_cycles()           [E, C, L] marker-locked cycles
//!   ├─ template::channel_templates()     global or sliding-window mean,
//!   │                                    optional baseline correction
//!   ├─ reconstruct::clean_cycles()       cycle − template, per channel
//!   └─ reconstruct::reconstruct()        cleaned cycles written into a copy
//!        │
//!        └─→ GradientOutput { signal [C, T], cleaned_cycles [E, C, L], … }
//! ```
//!
//! ## Quick start
//!
//! ```
//! use gradclean::{remove_gradients, ContinuousSignal, GradientConfig, Recording,
//!                 TriggerMarker, BaselineSpec};
//! use ndarray::Array2;
//!
//! let sfreq = 1000.0;
//! let data = Array2::from_shape_fn((2, 4000), |(_, t)| {
//!     (2.0 * std::f64::consts::PI * 50.0 * t as f64 / sfreq).sin()
//! });
//! let signal = ContinuousSignal::new(data, sfreq).unwrap();
//! let markers: Vec<_> = (0..4).map(|i| TriggerMarker::new(i * 1000, "TR")).collect();
//!
//! let cfg = GradientConfig {
//!     event_label: "TR".into(),
//!     baseline: BaselineSpec::WholeCycle,
//!     ..GradientConfig::default()
//! };
//! let out = remove_gradients(&signal, &markers, &cfg).unwrap();
//! assert_eq!(out.signal.n_times(), 4000);
//! assert_eq!(out.cleaned_cycles.shape(), &[4, 2, 1000]);
//! ```

pub mod baseline;
pub mod config;
pub mod epoch;
pub mod error;
pub mod events;
pub mod io;
pub mod reconstruct;
pub mod repetition;
pub mod signal;
pub mod template;

use ndarray::Array3;

// ── Crate-root re-exports ─────────────────────────────────────────────────

pub use config::{BaselineSpec, GradientConfig, SpacingPolicy, WindowSpec};
pub use error::{GradientError, Result};
pub use events::{markers_from_annotations, select_marker_samples, TriggerMarker};
pub use repetition::{check_spacing, estimate_repetition, RepetitionInterval};
pub use signal::{ContinuousSignal, Recording};
pub use epoch::extract_cycles;
pub use template::{channel_templates, clamped_positions, window_bounds};
pub use baseline::{baseline_correct_inplace, BaselineWindow};
pub use reconstruct::{clean_cycles, reconstruct};
pub use io::{Precision, RawRecording, StWriter, write_cleaned};

/// Everything produced by [`remove_gradients`].
#[derive(Debug, Clone)]
pub struct GradientOutput {
    /// Cleaned recording, same shape and sampling rate as the input.
    pub signal: ContinuousSignal,
    /// Cleaned cycles, `[E, C, L]`, in marker order.
    pub cleaned_cycles: Array3<f64>,
    /// Cycle onsets in samples, one per entry of `cleaned_cycles`.
    pub cycle_starts: Vec<usize>,
    /// Repetition interval used for every cycle.
    pub repetition: RepetitionInterval,
}

/// Remove the scanner gradient artifact from `recording`.
///
/// Markers labelled `cfg.event_label` define the cycles. The cycle length is
/// the gap between the first two of them; each cycle is cleaned by subtracting
/// a template averaged over all cycles ([`WindowSpec::Global`]) or over a
/// clamped neighbourhood ([`WindowSpec::Sliding`]).
///
/// # Errors
///
/// * [`GradientError::UnknownLabel`] — no marker has the label.
/// * [`GradientError::InsufficientMarkers`] — only one marker has it.
/// * [`GradientError::NonPositiveCycle`], [`GradientError::UnorderedMarkers`],
///   [`GradientError::IrregularSpacing`] — unusable marker layout.
/// * [`GradientError::BaselineOutOfRange`], [`GradientError::EmptyBaseline`].
/// * [`GradientError::OutOfBounds`] — the last cycle runs past the recording.
/// * [`GradientError::Cancelled`] — `cfg.cancel` was raised.
///
/// Nothing is returned on error; the input is never modified.
pub fn remove_gradients<R: Recording + ?Sized>(
    recording: &R,
    markers: &[TriggerMarker],
    cfg: &GradientConfig,
) -> Result<GradientOutput> {
    // 1. Markers → cycle length.
    let starts = events::select_marker_samples(markers, &cfg.event_label)?;
    let repetition = repetition::estimate_repetition(&starts, recording.sfreq())?;
    repetition::check_spacing(&starts, repetition.samples, cfg.spacing_tolerance, cfg.spacing)?;
    let baseline = baseline::resolve(cfg.baseline, &repetition)?;

    // 2. Cycles [E, C, L].
    let cycles = epoch::extract_cycles(recording, &starts, repetition.samples)?;
    let n_cycles = starts.len();

    match cfg.window {
        WindowSpec::Global => {
            log::info!("No window length selected. Using all {n_cycles} volumes to create template artifact.");
        }
        WindowSpec::Sliding { half_width } => {
            let clamped = template::clamped_positions(n_cycles, cfg.window);
            if 2 * half_width + 1 > n_cycles {
                log::warn!(
                    "window of {} cycles is wider than the {n_cycles} available; every template is clamped",
                    2 * half_width + 1
                );
            } else if clamped > 0 {
                log::debug!(
                    "sliding window clamped at the first and last {half_width} of {n_cycles} positions \
                     ({clamped} templates average fewer than {} cycles)",
                    2 * half_width + 1
                );
            }
        }
    }

    // 3. Templates + subtraction.
    let cleaned_cycles = reconstruct::clean_cycles(&cycles, cfg.window, baseline, cfg)?;

    // 4. Back into a full-length copy.
    let data = reconstruct::reconstruct(recording, &starts, &cleaned_cycles)?;
    let signal = ContinuousSignal::new(data, recording.sfreq())?;

    Ok(GradientOutput { signal, cleaned_cycles, cycle_starts: starts, repetition })
}
