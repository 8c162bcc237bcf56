//! Sample representation and channel layout helpers.
//!
//! Pure functions over `&[f32]` buffers with no platform dependencies.
//! Interleaved layout is `[f0c0, f0c1, ..., f1c0, f1c1, ...]`.

/// Convert a normalised f32 sample to 16-bit PCM.
///
/// Clamps out-of-range values; non-finite samples become silence.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    if !sample.is_finite() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Convert a 16-bit PCM sample to normalised f32.
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    (sample as f32 / i16::MAX as f32).max(-1.0)
}

/// Change the channel count of interleaved audio.
///
/// - mono → N: the mono signal is copied to every output channel;
/// - N → mono: channels are averaged per frame;
/// - N → M (M < N): each output channel averages its share of input channels;
/// - N → M (M > N): input channels repeat round-robin.
pub fn remix_interleaved(input: &[f32], in_channels: usize, out_channels: usize) -> Vec<f32> {
    if in_channels == out_channels || in_channels == 0 || out_channels == 0 {
        return input.to_vec();
    }
    let frames = input.len() / in_channels;
    let mut out = vec![0.0f32; frames * out_channels];

    if out_channels == 1 {
        let scale = 1.0 / in_channels as f32;
        for (f, sample) in out.iter_mut().enumerate() {
            let row = &input[f * in_channels..(f + 1) * in_channels];
            *sample = row.iter().sum::<f32>() * scale;
        }
    } else if out_channels < in_channels {
        let factor = in_channels as f32 / out_channels as f32;
        for f in 0..frames {
            for oc in 0..out_channels {
                let start = (oc as f32 * factor).floor() as usize;
                let end = (((oc + 1) as f32 * factor).ceil() as usize).min(in_channels);
                let span = &input[f * in_channels + start..f * in_channels + end];
                out[f * out_channels + oc] = if span.is_empty() {
                    0.0
                } else {
                    span.iter().sum::<f32>() / span.len() as f32
                };
            }
        }
    } else {
        for f in 0..frames {
            for oc in 0..out_channels {
                out[f * out_channels + oc] = input[f * in_channels + oc % in_channels];
            }
        }
    }
    out
}

/// Split interleaved audio into one vector per channel.
pub fn deinterleave(input: &[f32], channels: usize) -> Vec<Vec<f32>> {
    if channels == 0 {
        return Vec::new();
    }
    let frames = input.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for row in input.chunks_exact(channels) {
        for (ch, &sample) in row.iter().enumerate() {
            planar[ch].push(sample);
        }
    }
    planar
}

/// Interleave per-channel vectors. Shorter channels are zero-padded.
pub fn interleave(planar: &[Vec<f32>]) -> Vec<f32> {
    let channels = planar.len();
    let frames = planar.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = vec![0.0f32; frames * channels];
    for (ch, samples) in planar.iter().enumerate() {
        for (f, &sample) in samples.iter().enumerate() {
            out[f * channels + ch] = sample;
        }
    }
    out
}

/// Peak absolute level of samples.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i16_conversion_clamps() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), i16::MAX);
        assert_eq!(f32_to_i16(-1.0), -i16::MAX);
        assert_eq!(f32_to_i16(2.0), i16::MAX);
        assert_eq!(f32_to_i16(-3.0), -i16::MAX);
        assert_eq!(f32_to_i16(f32::NAN), 0);
    }

    #[test]
    fn i16_to_f32_range() {
        assert_eq!(i16_to_f32(i16::MAX), 1.0);
        assert_eq!(i16_to_f32(i16::MIN), -1.0);
        assert_eq!(i16_to_f32(0), 0.0);
    }

    #[test]
    fn mono_to_stereo_duplicates() {
        assert_eq!(remix_interleaved(&[0.1, 0.2], 1, 2), vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn stereo_to_mono_averages() {
        let mono = remix_interleaved(&[0.2, 0.8, 0.4, 0.6], 2, 1);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.5).abs() < 1e-6);
        assert!((mono[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn quad_to_stereo_averages_pairs() {
        let stereo = remix_interleaved(&[0.1, 0.3, 0.5, 0.7], 4, 2);
        assert!((stereo[0] - 0.2).abs() < 1e-6);
        assert!((stereo[1] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn same_layout_is_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(remix_interleaved(&samples, 1, 1), samples);
    }

    #[test]
    fn deinterleave_then_interleave() {
        let samples = [1.0, 4.0, 2.0, 5.0, 3.0, 6.0];
        let planar = deinterleave(&samples, 2);
        assert_eq!(planar, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(interleave(&planar), samples.to_vec());
    }

    #[test]
    fn interleave_unequal_lengths() {
        let result = interleave(&[vec![1.0, 2.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(result.len(), 6);
        assert_eq!(result[4], 0.0);
        assert_eq!(result[5], 6.0);
    }

    #[test]
    fn peak_level_basic() {
        assert!((peak_level(&[0.1, -0.5, 0.3]) - 0.5).abs() < 1e-6);
        assert_eq!(peak_level(&[]), 0.0);
    }
}
