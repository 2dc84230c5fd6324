pub mod cache;
pub mod flux;
pub mod spectrogram;

pub use cache::SpectralCache;
pub use flux::compute_spectral_flux;
pub use spectrogram::{compute_mel_spectrogram, frame_count, MelFilterbank, MelFrame};
