use std::path::PathBuf;

use ndarray::{Array2, Array3, Array4};

/// Interleaved waveform as read from or written to disk.
#[derive(Clone, Debug)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioData {
    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f32 / self.sample_rate as f32
        }
    }
}

/// Magnitude and phase of an STFT, both `(channel, frequency, time)`.
#[derive(Clone, Debug)]
pub struct Spectrogram {
    pub magnitude: Array3<f32>,
    pub phase: Array3<f32>,
}

impl Spectrogram {
    pub fn channels(&self) -> usize {
        self.magnitude.shape()[0]
    }

    pub fn freq_bins(&self) -> usize {
        self.magnitude.shape()[1]
    }

    pub fn frames(&self) -> usize {
        self.magnitude.shape()[2]
    }
}

/// Input shape a model accepts for one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkShape {
    pub channels: usize,
    pub freq_bins: usize,
    pub frames: usize,
}

impl ChunkShape {
    pub fn new(channels: usize, freq_bins: usize, frames: usize) -> Self {
        Self {
            channels,
            freq_bins,
            frames,
        }
    }

    pub fn as_tuple(&self) -> (usize, usize, usize) {
        (self.channels, self.freq_bins, self.frames)
    }
}

/// Raw model output for a batch of chunks.
#[derive(Clone, Debug)]
pub struct MaskOutput {
    /// `(n_chunks, n_classes, frequency, time_chunk)`
    pub masks: Array4<f32>,
    /// Auxiliary per-chunk class scores `(n_chunks, n_classes)`. Not used for separation.
    pub logits: Option<Array2<f32>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SampleFormat {
    #[default]
    Int16,
    Float32,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    /// Default destination for written stems. Not used by inference itself.
    pub output_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct SeparateOptions {
    /// Falls back to the checkpoint's `LoadOptions::output_dir`, then `.`.
    pub output_dir: Option<PathBuf>,
    /// Class names to write. Empty means every class in the vocabulary.
    pub classes: Vec<String>,
    pub sample_format: SampleFormat,
}

/// One separated class, resynthesized.
#[derive(Clone, Debug)]
pub struct SeparatedSource {
    pub class: String,
    pub audio: AudioData,
}

/// In-memory result of separating one waveform.
#[derive(Clone, Debug)]
pub struct Separation {
    pub sources: Vec<SeparatedSource>,
    pub chunks: usize,
    /// STFT frames dropped from the tail because they did not fill a chunk.
    pub discarded_frames: usize,
    pub logits: Option<Array2<f32>>,
}

impl Separation {
    pub fn source(&self, class: &str) -> Option<&SeparatedSource> {
        self.sources.iter().find(|s| s.class == class)
    }
}

#[derive(Clone, Debug)]
pub struct SeparationResult {
    /// `(class, path)` for every written stem, in vocabulary order.
    pub outputs: Vec<(String, PathBuf)>,
    pub chunks: usize,
    pub discarded_frames: usize,
}
