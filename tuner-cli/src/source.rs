//! Sample sources that stand in for a microphone.

use std::path::Path;

use anyhow::{Context, Result, bail};
use banjo_tuner_core::synth::synthesize_tone;
use tracing::info;

/// Something that yields fixed-size blocks of mono samples in `[-1, 1]`.
pub trait SampleSource: Send {
    /// Returns the next `block_size` samples, or `None` once exhausted.
    fn next_block(&mut self, block_size: usize) -> Option<Vec<f32>>;

    fn sample_rate(&self) -> u32;
}

/// A WAV recording, mixed down to mono and read block by block.
///
/// A trailing partial block is dropped.
pub struct WavSource {
    samples: Vec<f32>,
    position: usize,
    sample_rate: u32,
}

impl WavSource {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)
            .with_context(|| format!("failed to open WAV file {}", path.display()))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .context("failed to decode float samples")?,
            hound::SampleFormat::Int => {
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    bail!("unsupported bit depth: {}", spec.bits_per_sample);
                }
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()
                    .context("failed to decode integer samples")?
            }
        };

        let samples: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        info!(
            "Opened {}: {} Hz, {} channel(s), {} frames",
            path.display(),
            spec.sample_rate,
            channels,
            samples.len()
        );

        Ok(Self {
            samples,
            position: 0,
            sample_rate: spec.sample_rate,
        })
    }
}

impl SampleSource for WavSource {
    fn next_block(&mut self, block_size: usize) -> Option<Vec<f32>> {
        let end = self.position + block_size;
        let block = self.samples.get(self.position..end)?.to_vec();
        self.position = end;
        Some(block)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// A reference tone looped the way a playback sink would loop it, for
/// trying the tuner without a recording.
pub struct ToneSource {
    loop_samples: Vec<f32>,
    position: usize,
    remaining: usize,
    sample_rate: u32,
}

impl ToneSource {
    /// Loops a synthesized tone at `frequency` for `seconds`.
    pub fn new(frequency: f32, sample_rate: u32, seconds: f32) -> Self {
        let tone = synthesize_tone(frequency, sample_rate);
        let loop_samples = tone
            .samples
            .iter()
            .map(|&s| s as f32 / i16::MAX as f32)
            .collect();
        Self {
            loop_samples,
            position: 0,
            remaining: (seconds.max(0.0) * sample_rate as f32) as usize,
            sample_rate,
        }
    }
}

impl SampleSource for ToneSource {
    fn next_block(&mut self, block_size: usize) -> Option<Vec<f32>> {
        if self.remaining < block_size {
            return None;
        }
        self.remaining -= block_size;

        let block = (0..block_size)
            .map(|i| self.loop_samples[(self.position + i) % self.loop_samples.len()])
            .collect();
        self.position = (self.position + block_size) % self.loop_samples.len();
        Some(block)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
