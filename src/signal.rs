//! Continuous multi-channel recordings.
//!
//! [`Recording`] is the seam between the artifact-removal core and whatever
//! holds the samples. The core only ever asks for the sampling rate, the
//! shape, a read-only view for pass-through copying and bounded windows via
//! [`Recording::extract_window`]. [`ContinuousSignal`] is the in-memory
//! implementation and also the output type.
use ndarray::{s, Array2, ArrayView2};

use crate::error::{GradientError, Result};

/// Source of continuous `[C, T]` data.
pub trait Recording {
    /// Sampling rate in Hz.
    fn sfreq(&self) -> f64;

    /// Full `[C, T]` data, read-only.
    fn data(&self) -> ArrayView2<'_, f64>;

    fn n_channels(&self) -> usize {
        self.data().nrows()
    }

    fn n_times(&self) -> usize {
        self.data().ncols()
    }

    /// Copy samples `[start, start + len)` of every channel into a new
    /// `[C, len]` array.
    ///
    /// Fails with [`GradientError::OutOfBounds`] instead of truncating when the
    /// window runs past the last sample.
    fn extract_window(&self, start: usize, len: usize) -> Result<Array2<f64>> {
        let n_times = self.n_times();
        match start.checked_add(len) {
            Some(stop) if stop <= n_times => {
                Ok(self.data().slice(s![.., start..stop]).to_owned())
            }
            _ => Err(GradientError::OutOfBounds { start, len, n_times }),
        }
    }
}

/// An owned `[C, T]` recording with its sampling rate.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousSignal {
    data: Array2<f64>,
    sfreq: f64,
}

impl ContinuousSignal {
    /// Wrap `data` (`[C, T]`) sampled at `sfreq` Hz.
    pub fn new(data: Array2<f64>, sfreq: f64) -> Result<Self> {
        if !(sfreq.is_finite() && sfreq > 0.0) {
            return Err(GradientError::InvalidSamplingRate(sfreq));
        }
        Ok(Self { data, sfreq })
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.data.ncols() as f64 / self.sfreq
    }

    pub fn into_data(self) -> Array2<f64> {
        self.data
    }
}

impl Recording for ContinuousSignal {
    fn sfreq(&self) -> f64 {
        self.sfreq
    }

    fn data(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }
}
