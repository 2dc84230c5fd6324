use super::spectrogram::MelFrame;

/// Half-wave rectified spectral flux: only band energy increases count.
///
/// `flux[0]` is always 0; the output has one value per input frame.
pub fn compute_spectral_flux(mel_frames: &[MelFrame]) -> Vec<f32> {
    let mut flux = vec![0f32; mel_frames.len()];
    for t in 1..mel_frames.len() {
        flux[t] = mel_frames[t]
            .iter()
            .zip(&mel_frames[t - 1])
            .map(|(&curr, &prev)| (curr - prev).max(0.0))
            .sum();
    }
    flux
}
