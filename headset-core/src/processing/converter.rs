//! PCM format conversion: sample rate, channel layout, sample representation.
//!
//! Sample-rate changes go through a rubato sinc resampler. The converted
//! buffer always holds exactly `converted_frame_capacity(..)` frames: the
//! resampler's output delay is skipped and any shortfall is zero-padded.

use rubato::{
    calculate_cutoff, Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};

use crate::models::buffer::AudioBuffer;
use crate::models::error::AudioError;
use crate::models::format::AudioFormat;
use crate::processing::channel_mixer;

/// Default allocation ceiling: ten minutes at 48 kHz.
pub const DEFAULT_MAX_FRAME_CAPACITY: u32 = 48_000 * 600;

/// Frame capacity of a buffer converted from `input_rate` to `output_rate`.
///
/// Integer arithmetic, truncating: `output_rate * frames / input_rate`.
/// The truncation drifts by at most one frame per buffer; no compensation
/// is applied across buffers.
pub fn converted_frame_capacity(input_rate: u32, output_rate: u32, frames: u32) -> u64 {
    if input_rate == 0 {
        return 0;
    }
    output_rate as u64 * frames as u64 / input_rate as u64
}

/// Converts buffers to a target format.
#[derive(Debug, Clone, Copy)]
pub struct FormatConverter {
    max_frame_capacity: u32,
}

impl FormatConverter {
    pub fn new(max_frame_capacity: u32) -> Self {
        Self { max_frame_capacity }
    }

    /// Convert the filled frames of `buffer` into a new buffer in `output_format`.
    ///
    /// Errors:
    /// - `UnableToCreateConverter` when either format has a zero rate or channel count;
    /// - `UnableToCreateConvertedBuffer` when the computed capacity is zero or above the ceiling;
    /// - `ConversionFailed` when the resampler rejects the input.
    pub fn convert(&self, buffer: &AudioBuffer, output_format: &AudioFormat) -> Result<AudioBuffer, AudioError> {
        let input_format = *buffer.format();
        if !input_format.is_valid() || !output_format.is_valid() {
            return Err(AudioError::UnableToCreateConverter(format!(
                "no conversion from [{}] to [{}]",
                input_format, output_format
            )));
        }

        let capacity = converted_frame_capacity(
            input_format.sample_rate,
            output_format.sample_rate,
            buffer.frame_length(),
        );
        if capacity == 0 || capacity > self.max_frame_capacity as u64 {
            return Err(AudioError::UnableToCreateConvertedBuffer(format!(
                "capacity {} frames (limit {})",
                capacity, self.max_frame_capacity
            )));
        }
        let capacity = capacity as u32;
        let mut converted = AudioBuffer::new(*output_format, capacity).ok_or_else(|| {
            AudioError::UnableToCreateConvertedBuffer(format!("{} frames of [{}]", capacity, output_format))
        })?;

        let in_channels = input_format.channels as usize;
        let out_channels = output_format.channels as usize;
        let remixed = channel_mixer::remix_interleaved(&buffer.to_interleaved_f32(), in_channels, out_channels);

        let mut interleaved = if input_format.sample_rate == output_format.sample_rate {
            remixed
        } else {
            let planar = channel_mixer::deinterleave(&remixed, out_channels);
            let resampled = resample_planar(
                &planar,
                input_format.sample_rate,
                output_format.sample_rate,
                capacity as usize,
            )?;
            channel_mixer::interleave(&resampled)
        };

        interleaved.resize(capacity as usize * out_channels, 0.0);
        converted.write_interleaved_f32(&interleaved);
        Ok(converted)
    }
}

impl Default for FormatConverter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_CAPACITY)
    }
}

/// Convert with the default allocation ceiling.
pub fn convert_buffer_to_format(buffer: &AudioBuffer, output_format: &AudioFormat) -> Result<AudioBuffer, AudioError> {
    FormatConverter::default().convert(buffer, output_format)
}

fn build_resampler(input_rate: u32, output_rate: u32, chunk_size: usize, channels: usize) -> Result<SincFixedIn<f32>, AudioError> {
    let ratio = output_rate as f64 / input_rate as f64;
    let sinc_len = 256usize;
    let window = WindowFunction::BlackmanHarris2;
    let params = SincInterpolationParameters {
        sinc_len,
        f_cutoff: calculate_cutoff(sinc_len, window),
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window,
    };
    SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, channels)
        .map_err(|e| AudioError::UnableToCreateConverter(e.to_string()))
}

/// Resample one whole block and return exactly `output_frames` frames per channel.
fn resample_planar(
    planar: &[Vec<f32>],
    input_rate: u32,
    output_rate: u32,
    output_frames: usize,
) -> Result<Vec<Vec<f32>>, AudioError> {
    let channels = planar.len();
    let input_frames = planar.first().map(Vec::len).unwrap_or(0);
    if channels == 0 || input_frames == 0 {
        return Ok(vec![vec![0.0; output_frames]; channels]);
    }

    let mut resampler = build_resampler(input_rate, output_rate, input_frames, channels)?;
    let delay = resampler.output_delay();
    let wanted = delay + output_frames;

    let mut collected: Vec<Vec<f32>> = vec![Vec::with_capacity(wanted); channels];
    let first = resampler
        .process(planar, None)
        .map_err(|e| AudioError::ConversionFailed(e.to_string()))?;
    append_planar(&mut collected, first);

    // Flush with silence until the delayed output is complete. Early calls
    // may return nothing while the delay line fills.
    let per_flush = resampler.output_frames_next().max(1);
    let max_flushes = wanted / per_flush + 4;
    let mut flushes = 0;
    while collected[0].len() < wanted && flushes < max_flushes {
        let tail = resampler
            .process_partial::<Vec<f32>>(None, None)
            .map_err(|e| AudioError::ConversionFailed(e.to_string()))?;
        append_planar(&mut collected, tail);
        flushes += 1;
    }
    if collected[0].len() < wanted {
        log::warn!(
            "Resampler produced {} of {} frames, padding with silence",
            collected[0].len(),
            wanted
        );
    }

    for channel in &mut collected {
        let skip = delay.min(channel.len());
        channel.drain(..skip);
        channel.resize(output_frames, 0.0);
    }
    Ok(collected)
}

fn append_planar(dst: &mut [Vec<f32>], src: Vec<Vec<f32>>) {
    for (d, s) in dst.iter_mut().zip(src) {
        d.extend(s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::SampleFormat;

    fn sine(rate: u32, frames: usize, freq: f32) -> Vec<f32> {
        (0..frames)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect()
    }

    fn mean(samples: &[f32]) -> f32 {
        samples.iter().sum::<f32>() / samples.len() as f32
    }

    fn convert_constant(level: f32, frames: usize, input_rate: u32, output_rate: u32) -> Vec<f32> {
        let input = AudioBuffer::from_interleaved_f32(AudioFormat::float32(input_rate, 1), &vec![level; frames]).unwrap();
        convert_buffer_to_format(&input, &AudioFormat::float32(output_rate, 1))
            .unwrap()
            .to_interleaved_f32()
    }

    #[test]
    fn capacity_is_truncating_integer_math() {
        assert_eq!(converted_frame_capacity(16000, 48000, 8000), 24000);
        assert_eq!(converted_frame_capacity(48000, 44100, 1000), 918);
        assert_eq!(converted_frame_capacity(44100, 48000, 1), 1);
        assert_eq!(converted_frame_capacity(48000, 16000, 2), 0);
        for (input, output, frames) in [(8000u32, 44100u32, 333u32), (96000, 22050, 4097), (11025, 48000, 7)] {
            let expected = (output as u64 * frames as u64) / input as u64;
            assert_eq!(converted_frame_capacity(input, output, frames), expected);
        }
    }

    #[test]
    fn upsample_yields_exact_capacity() {
        let input = AudioBuffer::from_interleaved_f32(AudioFormat::float32(16000, 1), &sine(16000, 1600, 440.0)).unwrap();
        let output = convert_buffer_to_format(&input, &AudioFormat::float32(48000, 1)).unwrap();

        assert_eq!(output.frame_length(), 4800);
        assert_eq!(output.frame_capacity(), 4800);
        assert_eq!(output.format().sample_rate, 48000);

        // Signal spans the whole buffer, including the last 10%
        let samples = output.to_interleaved_f32();
        for region in [&samples[12..480], &samples[2160..2640], &samples[4320..4788]] {
            let peak = channel_mixer::peak_level(region);
            assert!((peak - 0.5).abs() < 0.05, "peak {}", peak);
        }
    }

    #[test]
    fn constant_level_reaches_the_end_of_the_buffer() {
        let samples = convert_constant(0.2, 8000, 16000, 48000);
        assert_eq!(samples.len(), 24000);

        assert!((samples[12000] - 0.2).abs() < 0.01, "middle {}", samples[12000]);
        let tail = &samples[21600..23988];
        assert!((mean(tail) - 0.2).abs() < 0.01, "tail mean {}", mean(tail));
        assert!(tail.iter().all(|s| (s - 0.2).abs() < 0.05));
        assert!(samples[23990..].iter().all(|s| s.abs() > 0.05));
    }

    #[test]
    fn short_block_is_not_silent() {
        let samples = convert_constant(0.5, 64, 8000, 48000);
        assert_eq!(samples.len(), 384);

        assert!((samples[192] - 0.5).abs() < 0.05, "middle {}", samples[192]);
        let tail = &samples[346..372];
        assert!((mean(tail) - 0.5).abs() < 0.05, "tail mean {}", mean(tail));
        assert!(samples.iter().all(|s| s.abs() > 0.1));
    }

    #[test]
    fn upsampled_signal_keeps_its_level() {
        let input = AudioBuffer::from_interleaved_f32(AudioFormat::float32(16000, 1), &sine(16000, 3200, 440.0)).unwrap();
        let output = convert_buffer_to_format(&input, &AudioFormat::float32(48000, 1)).unwrap();

        // Ignore the edges where the filter ramps in and out
        let samples = output.to_interleaved_f32();
        let middle = &samples[1000..samples.len() - 1000];
        let peak = channel_mixer::peak_level(middle);
        assert!((peak - 0.5).abs() < 0.05, "peak {}", peak);
    }

    #[test]
    fn same_rate_only_changes_layout_and_representation() {
        let input = AudioBuffer::from_interleaved_f32(AudioFormat::float32(44100, 1), &[0.25, -0.5, 1.0]).unwrap();
        let output = convert_buffer_to_format(&input, &AudioFormat::int16_interleaved(44100, 2)).unwrap();

        assert_eq!(output.frame_length(), 3);
        assert_eq!(output.format().sample_format, SampleFormat::Int16);
        let samples = output.to_interleaved_f32();
        assert_eq!(samples.len(), 6);
        assert!((samples[0] - 0.25).abs() < 1e-3);
        assert!((samples[1] - 0.25).abs() < 1e-3);
        assert!((samples[4] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn uses_filled_length_not_capacity() {
        let mut input = AudioBuffer::new(AudioFormat::float32(16000, 1), 1000).unwrap();
        input.write_interleaved_f32(&[0.1; 100]);

        let output = convert_buffer_to_format(&input, &AudioFormat::float32(48000, 1)).unwrap();
        assert_eq!(output.frame_length(), 300);
    }

    #[test]
    fn zero_capacity_cannot_be_allocated() {
        let input = AudioBuffer::from_interleaved_f32(AudioFormat::float32(48000, 1), &[0.1, 0.2]).unwrap();
        let err = convert_buffer_to_format(&input, &AudioFormat::float32(16000, 1)).unwrap_err();
        assert!(matches!(err, AudioError::UnableToCreateConvertedBuffer(_)));
    }

    #[test]
    fn capacity_above_ceiling_is_rejected() {
        let input = AudioBuffer::from_interleaved_f32(AudioFormat::float32(8000, 1), &[0.0; 100]).unwrap();
        let err = FormatConverter::new(200)
            .convert(&input, &AudioFormat::float32(48000, 1))
            .unwrap_err();
        assert!(matches!(err, AudioError::UnableToCreateConvertedBuffer(_)));
    }

    #[test]
    fn invalid_target_has_no_converter() {
        let input = AudioBuffer::from_interleaved_f32(AudioFormat::float32(8000, 1), &[0.0; 10]).unwrap();
        let err = convert_buffer_to_format(&input, &AudioFormat::float32(48000, 0)).unwrap_err();
        assert!(matches!(err, AudioError::UnableToCreateConverter(_)));
        assert!(err.is_conversion_error());
    }

    #[test]
    fn stereo_downsample_to_mono() {
        let stereo: Vec<f32> = sine(48000, 4800, 220.0).into_iter().flat_map(|s| [s, s]).collect();
        let input = AudioBuffer::from_interleaved_f32(AudioFormat::float32(48000, 2), &stereo).unwrap();
        let output = convert_buffer_to_format(&input, &AudioFormat::float32(16000, 1)).unwrap();

        assert_eq!(output.format().channels, 1);
        assert_eq!(output.frame_length(), 1600);
    }
}
