use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rustfft::{Fft, FftPlanner};

use super::spectrogram::{hann_window, MelFilterbank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FilterbankKey {
    sample_rate_hz: u32,
    n_fft: usize,
    n_mels: usize,
    f_min_bits: u64,
    f_max_bits: u64,
}

/// Memo tables for analysis windows, mel filterbanks and FFT plans.
///
/// Every value is a pure function of its key. Entries are built while the
/// table lock is held, so each key is populated at most once and every
/// caller receives the same `Arc`.
pub struct SpectralCache {
    windows: Mutex<HashMap<usize, Arc<[f32]>>>,
    filterbanks: Mutex<HashMap<FilterbankKey, Arc<MelFilterbank>>>,
    planner: Mutex<FftPlanner<f32>>,
}

impl SpectralCache {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            filterbanks: Mutex::new(HashMap::new()),
            planner: Mutex::new(FftPlanner::new()),
        }
    }

    pub fn window(&self, n_fft: usize) -> Arc<[f32]> {
        let mut windows = self.windows.lock();
        Arc::clone(
            windows
                .entry(n_fft)
                .or_insert_with(|| Arc::from(hann_window(n_fft))),
        )
    }

    pub fn filterbank(
        &self,
        sample_rate_hz: u32,
        n_fft: usize,
        n_mels: usize,
        f_min_hz: f64,
        f_max_hz: f64,
    ) -> Arc<MelFilterbank> {
        let key = FilterbankKey {
            sample_rate_hz,
            n_fft,
            n_mels,
            f_min_bits: f_min_hz.to_bits(),
            f_max_bits: f_max_hz.to_bits(),
        };
        let mut filterbanks = self.filterbanks.lock();
        Arc::clone(filterbanks.entry(key).or_insert_with(|| {
            tracing::debug!(sample_rate_hz, n_fft, n_mels, "building mel filterbank");
            Arc::new(MelFilterbank::new(
                sample_rate_hz,
                n_fft,
                n_mels,
                f_min_hz,
                f_max_hz,
            ))
        }))
    }

    /// `FftPlanner` keeps its own plan cache; this only serializes access.
    pub fn fft(&self, n_fft: usize) -> Arc<dyn Fft<f32>> {
        self.planner.lock().plan_fft_forward(n_fft)
    }

    pub fn cached_window_count(&self) -> usize {
        self.windows.lock().len()
    }

    pub fn cached_filterbank_count(&self) -> usize {
        self.filterbanks.lock().len()
    }
}

impl Default for SpectralCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SpectralCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralCache")
            .field("windows", &self.cached_window_count())
            .field("filterbanks", &self.cached_filterbank_count())
            .finish()
    }
}
