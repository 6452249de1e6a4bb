/// Synthetic recordings shared by the integration tests.
use gradclean::{ContinuousSignal, TriggerMarker};
use ndarray::{Array1, Array2};
use std::f64::consts::PI;

/// Sampling rate of the reference scenario (Hz).
pub const FS: f64 = 5000.0;
/// Recording length of the reference scenario (s).
pub const DURATION: f64 = 12.0;
/// Repetition time of the reference scenario (s).
pub const TR: f64 = 1.2;

#[allow(unused)]
/// Desired 9 Hz signal plus a 5× 50 Hz artifact locked to the TR, one channel.
///
/// Returns `(recording, clean, markers)` with markers every `TR` from sample 0.
pub fn sine_with_artifact(label: &str) -> (ContinuousSignal, Array1<f64>, Vec<TriggerMarker>) {
    let n = (DURATION * FS).round() as usize;
    let clean = Array1::from_shape_fn(n, |i| (2.0 * PI * 9.0 * i as f64 / FS).sin());
    let artifact = Array1::from_shape_fn(n, |i| 5.0 * (2.0 * PI * 50.0 * i as f64 / FS).sin());
    let data = (&clean + &artifact).insert_axis(ndarray::Axis(0));

    let step = (TR * FS).round() as usize;
    let markers = (0..n).step_by(step).map(|s| TriggerMarker::new(s, label)).collect();
    (ContinuousSignal::new(data, FS).unwrap(), clean, markers)
}

#[allow(unused)]
/// Deterministic multi-channel noise-like signal (no RNG dependency).
pub fn pseudo_random(n_ch: usize, n_t: usize, sfreq: f64) -> ContinuousSignal {
    let data = Array2::from_shape_fn((n_ch, n_t), |(c, t)| {
        let x = (c as f64 + 1.0) * 12.9898 + t as f64 * 78.233;
        (x.sin() * 43758.5453).fract()
    });
    ContinuousSignal::new(data, sfreq).unwrap()
}

#[allow(unused)]
/// `count` markers labelled `label`, `step` samples apart, starting at `first`.
pub fn evenly_spaced(first: usize, step: usize, count: usize, label: &str) -> Vec<TriggerMarker> {
    (0..count).map(|i| TriggerMarker::new(first + i * step, label)).collect()
}

#[allow(unused)]
/// Pearson correlation of two equally long sequences.
pub fn correlation(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }
    sxy / (sxx * syy).sqrt()
}
