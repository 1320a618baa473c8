//! Audio file reading and writing

use std::path::{Path, PathBuf};

use crate::error::{FileError, FileResult};

/// Suffix appended to the input stem for corrected audio
pub const CORRECTED_SUFFIX: &str = "_pitch_corrected";

// ═══════════════════════════════════════════════════════════════════════════════
// FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Bit depth of written samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Int16,
    Int24,
    Float32,
}

impl BitDepth {
    pub fn bits(&self) -> u16 {
        match self {
            Self::Int16 => 16,
            Self::Int24 => 24,
            Self::Float32 => 32,
        }
    }

    fn from_spec(spec: &hound::WavSpec) -> Option<Self> {
        match (spec.bits_per_sample, spec.sample_format) {
            (16, hound::SampleFormat::Int) => Some(Self::Int16),
            (24, hound::SampleFormat::Int) => Some(Self::Int24),
            (32, hound::SampleFormat::Float) => Some(Self::Float32),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUDIO DATA CONTAINER
// ═══════════════════════════════════════════════════════════════════════════════

/// Loaded audio
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Samples (deinterleaved, one Vec per channel)
    pub channels: Vec<Vec<f64>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Bit depth of the source file, if one we can write back
    pub bit_depth: Option<BitDepth>,
}

impl AudioData {
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// First channel; multi-channel recordings are corrected on channel 0 only
    pub fn first_channel(&self) -> &[f64] {
        self.channels.first().map_or(&[], Vec::as_slice)
    }

    /// Build from interleaved samples
    pub fn from_interleaved(samples: &[f64], num_channels: usize, sample_rate: u32) -> Self {
        let num_channels = num_channels.max(1);
        let num_frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(num_frames); num_channels];

        for frame in samples.chunks_exact(num_channels) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        Self {
            channels,
            sample_rate,
            bit_depth: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WAV READING (hound)
// ═══════════════════════════════════════════════════════════════════════════════

/// Load an audio file. Only WAV is decoded.
pub fn load_audio<P: AsRef<Path>>(path: P) -> FileResult<AudioData> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(FileError::NotFound(path.display().to_string()));
    }

    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav") || e.eq_ignore_ascii_case("wave"));
    if !is_wav {
        return Err(FileError::UnsupportedFormat(path.display().to_string()));
    }

    read_wav(path)
}

/// Read WAV file using hound
pub fn read_wav<P: AsRef<Path>>(path: P) -> FileResult<AudioData> {
    let reader = hound::WavReader::open(path.as_ref())?;
    let spec = reader.spec();

    if spec.channels == 0 {
        return Err(FileError::InvalidFile("WAV header declares zero channels".into()));
    }

    let samples: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f64 / max_value))
                .collect::<Result<_, _>>()?
        }
    };

    let mut data = AudioData::from_interleaved(&samples, spec.channels as usize, spec.sample_rate);
    data.bit_depth = BitDepth::from_spec(&spec);

    log::debug!(
        "Read {}: {} ch, {} Hz, {} bits, {:.2} s",
        path.as_ref().display(),
        data.num_channels(),
        data.sample_rate,
        spec.bits_per_sample,
        data.duration()
    );

    Ok(data)
}

// ═══════════════════════════════════════════════════════════════════════════════
// WAV WRITING (hound)
// ═══════════════════════════════════════════════════════════════════════════════

/// Write mono WAV, clamping to [-1, 1]
pub fn save_wav<P: AsRef<Path>>(
    path: P,
    samples: &[f64],
    sample_rate: u32,
    bit_depth: BitDepth,
) -> FileResult<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: bit_depth.bits(),
        sample_format: match bit_depth {
            BitDepth::Float32 => hound::SampleFormat::Float,
            _ => hound::SampleFormat::Int,
        },
    };

    let mut writer = hound::WavWriter::create(path.as_ref(), spec)?;

    match bit_depth {
        BitDepth::Float32 => {
            for &sample in samples {
                writer.write_sample(sample.clamp(-1.0, 1.0) as f32)?;
            }
        }
        BitDepth::Int16 => {
            for &sample in samples {
                writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0).round() as i16)?;
            }
        }
        BitDepth::Int24 => {
            for &sample in samples {
                writer.write_sample((sample.clamp(-1.0, 1.0) * 8_388_607.0).round() as i32)?;
            }
        }
    }

    writer.finalize()?;

    log::debug!(
        "Wrote {}: {} samples, {} Hz, {} bits",
        path.as_ref().display(),
        samples.len(),
        sample_rate,
        bit_depth.bits()
    );
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT PATHS
// ═══════════════════════════════════════════════════════════════════════════════

/// `<dir>/<stem><suffix>.<extension>` next to `input`
pub fn sibling_path(input: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}{suffix}.{extension}"))
}

/// `<stem>_pitch_corrected.<ext>` next to the input
pub fn corrected_output_path<P: AsRef<Path>>(input: P) -> PathBuf {
    let input = input.as_ref();
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "wav".to_string());
    sibling_path(input, CORRECTED_SUFFIX, &extension)
}
