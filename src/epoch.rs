//! Marker-locked cycle extraction.
//!
//! Cuts one `cycle_len`-sample window per marker, starting at the marker
//! sample (`tmin = 0`, `tmax = TR − 1/sfreq`). No baseline is applied here;
//! baseline correction belongs to the templates, not to the cycles.
use ndarray::{s, Array3};

use crate::error::{GradientError, Result};
use crate::signal::Recording;

/// Extract cycles into a 3-D array `[E, C, cycle_len]`, one entry per marker.
///
/// Windows are fetched through [`Recording::extract_window`]; a window that
/// runs past the end of the recording aborts the whole extraction.
pub fn extract_cycles<R: Recording + ?Sized>(
    recording: &R,
    starts: &[usize],
    cycle_len: usize,
) -> Result<Array3<f64>> {
    let n_ch = recording.n_channels();
    let mut out = Array3::<f64>::zeros((starts.len(), n_ch, cycle_len));

    for (e, &start) in starts.iter().enumerate() {
        let window = recording.extract_window(start, cycle_len)?;
        if window.dim() != (n_ch, cycle_len) {
            return Err(GradientError::ShapeMismatch {
                expected: vec![n_ch, cycle_len],
                got: window.shape().to_vec(),
            });
        }
        out.slice_mut(s![e, .., ..]).assign(&window);
    }

    log::debug!("extracted {} cycles of {cycle_len} samples", starts.len());
    Ok(out)
}
