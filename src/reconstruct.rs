//! Template subtraction and signal reconstruction.
//!
//! `clean_cycles`  — `cleaned[e, c, :] = cycles[e, c, :] − template[c, e, :]`,
//!   channels processed in parallel.
//!
//! `reconstruct`   — copies the recording and overwrites each cycle region
//!   `[start, start + L)` with its cleaned cycle, in marker order, so where
//!   two regions overlap the later cycle wins. Samples outside every cycle
//!   keep their original values. The input is never written to.
use ndarray::{s, Array2, Array3, Axis};
use rayon::prelude::*;

use crate::baseline::BaselineWindow;
use crate::config::{GradientConfig, WindowSpec};
use crate::error::{GradientError, Result};
use crate::signal::Recording;
use crate::template::channel_templates;

/// Subtract per-channel templates from `cycles` (`[E, C, L]`).
///
/// `cfg` is only consulted for its cancellation flag.
pub fn clean_cycles(
    cycles: &Array3<f64>,
    window: WindowSpec,
    baseline: BaselineWindow,
    cfg: &GradientConfig,
) -> Result<Array3<f64>> {
    let n_ch = cycles.shape()[1];

    let per_channel: Vec<Array2<f64>> = (0..n_ch)
        .into_par_iter()
        .map(|c| {
            if cfg.is_cancelled() {
                return Err(GradientError::Cancelled);
            }
            let x = cycles.index_axis(Axis(1), c); // [E, L]
            let tpl = channel_templates(x, window, baseline);
            Ok(&x - &tpl)
        })
        .collect::<Result<_>>()?;

    let mut out = Array3::<f64>::zeros(cycles.raw_dim());
    for (c, cleaned) in per_channel.iter().enumerate() {
        out.index_axis_mut(Axis(1), c).assign(cleaned);
    }
    Ok(out)
}

/// Write cleaned cycles back into a copy of the recording.
///
/// `cleaned` is `[E, C, L]` with one entry per start in `starts`.
pub fn reconstruct<R: Recording + ?Sized>(
    recording: &R,
    starts: &[usize],
    cleaned: &Array3<f64>,
) -> Result<Array2<f64>> {
    let (n_e, n_ch, cycle_len) = cleaned.dim();
    let n_times = recording.n_times();
    if n_e != starts.len() || n_ch != recording.n_channels() {
        return Err(GradientError::ShapeMismatch {
            expected: vec![starts.len(), recording.n_channels(), cycle_len],
            got: cleaned.shape().to_vec(),
        });
    }

    let mut out = recording.data().to_owned();
    for (e, &start) in starts.iter().enumerate() {
        let stop = start + cycle_len;
        if stop > n_times {
            return Err(GradientError::OutOfBounds { start, len: cycle_len, n_times });
        }
        out.slice_mut(s![.., start..stop])
            .assign(&cleaned.index_axis(Axis(0), e));
    }
    Ok(out)
}
