use rustfft::num_complex::Complex;

use super::cache::SpectralCache;
use crate::config::SpectralConfig;
use crate::error::DurationError;

/// Added before the log so silent bands stay finite.
const LOG_GUARD: f64 = 1e-6;

/// One time slice: a log-energy per mel band.
pub type MelFrame = Vec<f32>;

/// Symmetric Hann window, `0.5 - 0.5 cos(2πi / (N - 1))`.
pub fn hann_window(n: usize) -> Vec<f32> {
    if n < 2 {
        return vec![1.0; n];
    }
    let factor = 2.0 * std::f64::consts::PI / (n - 1) as f64;
    (0..n)
        .map(|i| (0.5 - 0.5 * (factor * i as f64).cos()) as f32)
        .collect()
}

pub fn hz_to_mel(hz: f64) -> f64 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular filters over the `n_fft / 2 + 1` non-negative FFT bins.
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    filters: Vec<Vec<f32>>,
}

impl MelFilterbank {
    pub fn new(
        sample_rate_hz: u32,
        n_fft: usize,
        n_mels: usize,
        f_min_hz: f64,
        f_max_hz: f64,
    ) -> Self {
        let n_bins = n_fft / 2 + 1;
        let mel_min = hz_to_mel(f_min_hz);
        let mel_max = hz_to_mel(f_max_hz);
        let bins: Vec<usize> = (0..n_mels + 2)
            .map(|i| {
                let hz = mel_to_hz(mel_min + i as f64 * (mel_max - mel_min) / (n_mels + 1) as f64);
                ((n_fft + 1) as f64 * hz / sample_rate_hz as f64)
                    .floor()
                    .max(0.0) as usize
            })
            .collect();

        let filters = (1..=n_mels)
            .map(|m| {
                let (left, center, right) = (bins[m - 1], bins[m], bins[m + 1]);
                let mut filter = vec![0f32; n_bins];
                for k in left..center.min(n_bins) {
                    filter[k] = (k - left) as f32 / (center - left) as f32;
                }
                for k in center..right.min(n_bins) {
                    filter[k] = (right - k) as f32 / (right - center) as f32;
                }
                filter
            })
            .collect();

        Self { filters }
    }

    pub fn n_mels(&self) -> usize {
        self.filters.len()
    }

    pub fn filters(&self) -> &[Vec<f32>] {
        &self.filters
    }

    /// `ln(ε + Σ filter[k]·magnitude[k])` for every band.
    fn apply_log(&self, magnitude: &[f32]) -> MelFrame {
        self.filters
            .iter()
            .map(|filter| {
                let sum: f64 = filter
                    .iter()
                    .zip(magnitude)
                    .map(|(&w, &m)| w as f64 * m as f64)
                    .sum();
                (LOG_GUARD + sum).ln() as f32
            })
            .collect()
    }
}

/// Number of full analysis frames; zero when the signal is shorter than
/// one FFT plus a hop, or when `hop_length` is zero.
pub fn frame_count(signal_len: usize, config: &SpectralConfig) -> usize {
    signal_len
        .checked_sub(config.n_fft)
        .and_then(|rest| rest.checked_div(config.hop_length))
        .unwrap_or(0)
}

pub fn compute_mel_spectrogram(
    signal: &[f32],
    sample_rate_hz: u32,
    config: &SpectralConfig,
    cache: &SpectralCache,
) -> Result<Vec<MelFrame>, DurationError> {
    config.validate()?;
    if sample_rate_hz == 0 {
        return Err(DurationError::degenerate(
            "mel spectrogram needs a non-zero sample rate",
        ));
    }
    let n_fft = config.n_fft;
    let num_frames = frame_count(signal.len(), config);
    if num_frames == 0 {
        return Ok(Vec::new());
    }

    let window = cache.window(n_fft);
    let filterbank = cache.filterbank(
        sample_rate_hz,
        n_fft,
        config.n_mels,
        config.f_min_hz,
        sample_rate_hz as f64 / 2.0,
    );
    let fft = cache.fft(n_fft);

    let n_bins = n_fft / 2 + 1;
    let mut buffer = vec![Complex::new(0f32, 0f32); n_fft];
    let mut scratch = vec![Complex::new(0f32, 0f32); fft.get_inplace_scratch_len()];
    let mut magnitude = vec![0f32; n_bins];
    let mut frames = Vec::with_capacity(num_frames);

    for frame_idx in 0..num_frames {
        let start = frame_idx * config.hop_length;
        let slice = &signal[start..start + n_fft];
        for ((slot, &sample), &w) in buffer.iter_mut().zip(slice).zip(window.iter()) {
            *slot = Complex::new(sample * w, 0.0);
        }

        fft.process_with_scratch(&mut buffer, &mut scratch);

        for (mag, bin) in magnitude.iter_mut().zip(&buffer[..n_bins]) {
            *mag = bin.norm();
        }
        frames.push(filterbank.apply_log(&magnitude));
    }

    Ok(frames)
}
