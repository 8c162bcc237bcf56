use std::path::{Path, PathBuf};

use hound::{SampleFormat as WavSampleFormat, WavReader};

use crate::models::buffer::AudioBuffer;
use crate::models::error::AudioError;
use crate::models::format::{AudioFormat, SampleFormat};
use crate::processing::channel_mixer::f32_to_i16;

/// Extension of bundled sound resources.
pub const SOUND_EXTENSION: &str = "wav";

/// Read-only directory of bundled sound resources.
#[derive(Debug, Clone)]
pub struct SoundBundle {
    root: PathBuf,
}

impl SoundBundle {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `<name>.<extension>` inside the bundle, if such a file exists.
    pub fn url_for_resource(&self, name: &str, extension: &str) -> Option<PathBuf> {
        let path = self.root.join(format!("{}.{}", name, extension));
        path.is_file().then_some(path)
    }

    /// Open the bundled `<name>.wav` for reading as interleaved 16-bit PCM.
    ///
    /// Fails with `FileNotFound` when the bundle has no such resource.
    pub fn load_sound_file(&self, name: &str) -> Result<AudioFile, AudioError> {
        let path = self
            .url_for_resource(name, SOUND_EXTENSION)
            .ok_or_else(|| AudioError::FileNotFound(format!("{}.{}", name, SOUND_EXTENSION)))?;
        AudioFile::open_for_reading(&path)
    }
}

/// A WAV file opened for reading with a 16-bit interleaved processing format.
#[derive(Debug, Clone)]
pub struct AudioFile {
    path: PathBuf,
    file_format: AudioFormat,
    processing_format: AudioFormat,
    frame_length: u32,
}

impl AudioFile {
    pub fn open_for_reading(path: &Path) -> Result<Self, AudioError> {
        let reader = WavReader::open(path).map_err(|e| map_wav_error(path, e))?;
        let spec = reader.spec();
        let file_format = AudioFormat {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            sample_format: match spec.sample_format {
                WavSampleFormat::Float => SampleFormat::Float32,
                WavSampleFormat::Int => SampleFormat::Int16,
            },
            interleaved: true,
        };
        if !file_format.is_valid() {
            return Err(AudioError::UnreadableFile(format!(
                "{}: invalid format [{}]",
                path.display(),
                file_format
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file_format,
            processing_format: AudioFormat::int16_interleaved(spec.sample_rate, spec.channels),
            frame_length: reader.duration(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format of the samples on disk.
    pub fn file_format(&self) -> &AudioFormat {
        &self.file_format
    }

    /// Format of the buffers handed out by [`read_buffer`](Self::read_buffer).
    pub fn processing_format(&self) -> &AudioFormat {
        &self.processing_format
    }

    pub fn frame_length(&self) -> u32 {
        self.frame_length
    }

    /// Decode the whole file into one buffer in the processing format.
    pub fn read_buffer(&self) -> Result<AudioBuffer, AudioError> {
        let mut reader = WavReader::open(&self.path).map_err(|e| map_wav_error(&self.path, e))?;
        let spec = reader.spec();

        let samples: Vec<i16> = match spec.sample_format {
            WavSampleFormat::Float => reader
                .samples::<f32>()
                .map(|s| s.map(f32_to_i16))
                .collect::<Result<_, _>>(),
            WavSampleFormat::Int => {
                let bits = spec.bits_per_sample;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| int_to_i16(v, bits)))
                    .collect::<Result<_, _>>()
            }
        }
        .map_err(|e| map_wav_error(&self.path, e))?;

        AudioBuffer::from_interleaved_i16(self.processing_format, samples)
            .ok_or_else(|| AudioError::UnreadableFile(format!("{}: no audio frames", self.path.display())))
    }
}

/// Rescale an integer sample of `bits` width to 16 bits.
fn int_to_i16(value: i32, bits: u16) -> i16 {
    if bits > 16 {
        (value >> (bits - 16)) as i16
    } else {
        (value << (16 - bits)) as i16
    }
}

fn map_wav_error(path: &Path, err: hound::Error) -> AudioError {
    match err {
        hound::Error::IoError(ref io) if io.kind() == std::io::ErrorKind::NotFound => {
            AudioError::FileNotFound(path.display().to_string())
        }
        other => AudioError::UnreadableFile(format!("{}: {}", path.display(), other)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::buffer::SampleData;
    use hound::{WavSpec, WavWriter};
    use std::fs;

    /// Fresh temporary bundle directory.
    pub(crate) fn temp_bundle() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("headset-bundle-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Write a 16-bit WAV fixture.
    pub(crate) fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: WavSampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn missing_resource_is_file_not_found() {
        let dir = temp_bundle();
        let bundle = SoundBundle::new(&dir);

        assert!(bundle.url_for_resource("missing", "wav").is_none());
        let err = bundle.load_sound_file("missing").unwrap_err();
        assert_eq!(err, AudioError::FileNotFound("missing.wav".into()));
        // no partial side effects
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn loads_sixteen_bit_interleaved() {
        let dir = temp_bundle();
        write_wav(&dir.join("sound.wav"), 22050, 2, &[100, -100, 200, -200, 300, -300]);

        let file = SoundBundle::new(&dir).load_sound_file("sound").unwrap();
        assert_eq!(file.frame_length(), 3);
        assert_eq!(*file.processing_format(), AudioFormat::int16_interleaved(22050, 2));

        let buffer = file.read_buffer().unwrap();
        assert_eq!(buffer.frame_length(), 3);
        assert_eq!(buffer.data(), &SampleData::I16(vec![100, -100, 200, -200, 300, -300]));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn float_wav_is_quantized() {
        let dir = temp_bundle();
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 32,
            sample_format: WavSampleFormat::Float,
        };
        let mut writer = WavWriter::create(dir.join("float.wav"), spec).unwrap();
        for s in [1.0f32, -1.0, 0.0] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let buffer = SoundBundle::new(&dir).load_sound_file("float").unwrap().read_buffer().unwrap();
        assert_eq!(buffer.data(), &SampleData::I16(vec![i16::MAX, -i16::MAX, 0]));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn garbage_file_is_unreadable() {
        let dir = temp_bundle();
        fs::write(dir.join("broken.wav"), b"not a wav file").unwrap();

        let err = SoundBundle::new(&dir).load_sound_file("broken").unwrap_err();
        assert!(matches!(err, AudioError::UnreadableFile(_)));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rescales_integer_widths() {
        assert_eq!(int_to_i16(0x7f_ffff, 24), 0x7fff);
        assert_eq!(int_to_i16(-128, 8), i16::MIN);
        assert_eq!(int_to_i16(1234, 16), 1234);
    }
}
