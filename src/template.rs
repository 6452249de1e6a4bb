//! Artifact template estimation.
//!
//! For one channel with cycles `X` of shape `[E, L]`, the template for cycle
//! position `i` is
//!
//! ```text
//! global   T[i] = mean(X[0..E])                        (same for every i)
//! sliding  T[i] = mean(X[max(0, i−h) .. min(E, i+h+1)])
//! ```
//!
//! Sliding windows shrink at both ends of the recording instead of being
//! padded or wrapped, so the first and last `h` positions average fewer than
//! `2h + 1` cycles. Baseline correction is applied to each template after
//! averaging.
use ndarray::{s, Array1, Array2, ArrayView2, Axis};

use crate::baseline::{baseline_correct_inplace, BaselineWindow};
use crate::config::WindowSpec;

/// Half-open range of cycles averaged for position `i` out of `n_cycles`.
///
/// ```
/// use gradclean::{template::window_bounds, WindowSpec};
/// let w = WindowSpec::Sliding { half_width: 2 };
/// assert_eq!(window_bounds(0, 10, w), (0, 3));
/// assert_eq!(window_bounds(5, 10, w), (3, 8));
/// assert_eq!(window_bounds(9, 10, w), (7, 10));
/// ```
pub fn window_bounds(i: usize, n_cycles: usize, window: WindowSpec) -> (usize, usize) {
    match window {
        WindowSpec::Global => (0, n_cycles),
        WindowSpec::Sliding { half_width } => (
            i.saturating_sub(half_width),
            n_cycles.min(i.saturating_add(half_width).saturating_add(1)),
        ),
    }
}

/// Number of positions whose window is clamped to fewer than `2h + 1`
/// cycles. Always 0 for the global template.
pub fn clamped_positions(n_cycles: usize, window: WindowSpec) -> usize {
    match window {
        WindowSpec::Global => 0,
        WindowSpec::Sliding { half_width } => {
            let full = 2 * half_width + 1;
            (0..n_cycles)
                .filter(|&i| {
                    let (start, stop) = window_bounds(i, n_cycles, window);
                    stop - start < full
                })
                .count()
        }
    }
}

fn mean_of_cycles(cycles: ArrayView2<f64>, start: usize, stop: usize) -> Array1<f64> {
    cycles
        .slice(s![start..stop, ..])
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(cycles.ncols()))
}

/// Templates for every cycle position of one channel.
///
/// `cycles`: `[E, L]`  →  templates `[E, L]`, row `i` being the artifact
/// estimate to subtract from cycle `i`.
pub fn channel_templates(
    cycles: ArrayView2<f64>,
    window: WindowSpec,
    baseline: BaselineWindow,
) -> Array2<f64> {
    let (n_cycles, cycle_len) = cycles.dim();
    let mut templates = Array2::<f64>::zeros((n_cycles, cycle_len));

    match window {
        WindowSpec::Global => {
            // One template per channel; every position gets the same row.
            let mut avg = mean_of_cycles(cycles, 0, n_cycles);
            baseline_correct_inplace(avg.view_mut(), baseline);
            for mut row in templates.rows_mut() {
                row.assign(&avg);
            }
        }
        WindowSpec::Sliding { .. } => {
            for (i, mut row) in templates.rows_mut().into_iter().enumerate() {
                let (start, stop) = window_bounds(i, n_cycles, window);
                row.assign(&mean_of_cycles(cycles, start, stop));
                baseline_correct_inplace(row, baseline);
            }
        }
    }
    templates
}
