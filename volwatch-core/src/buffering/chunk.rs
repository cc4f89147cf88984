//! Volume of one chunk of interleaved PCM read by a sampler.

use crate::audio::format::AudioFormat;

/// Integer root-mean-square of interleaved `samples` at the integer scale of
/// `format`.
///
/// Samples are quantised first and all channels are measured together. The
/// result is truncated, and an empty chunk measures 0.
pub fn rms(samples: &[f32], format: AudioFormat) -> u64 {
    if samples.is_empty() {
        return 0;
    }
    let sum_sq: f64 = samples
        .iter()
        .map(|s| {
            let q = format.quantize(*s) as f64;
            q * q
        })
        .sum();
    (sum_sq / samples.len() as f64).sqrt() as u64
}
