//! Training-identical preprocessing: audio → STFT → features → normalized features.

use std::path::Path;

use ndarray::{Array3, Axis};

use crate::{
    config::{FeatureConfig, FeatureKind, Normalization, Stat},
    core::{audio, dsp::{to_planar, Stft}},
    error::{Result, SeparatorError},
    types::{AudioData, Spectrogram},
};

/// Map raw magnitude to the representation the model was trained on.
pub fn to_features(magnitude: &Array3<f32>, kind: FeatureKind, eps: f32) -> Array3<f32> {
    match kind {
        FeatureKind::Linear => magnitude.clone(),
        FeatureKind::Log => magnitude.mapv(|m| m.max(eps).ln()),
        FeatureKind::Log1p => magnitude.mapv(|m| m.ln_1p()),
        FeatureKind::Db => magnitude.mapv(|m| 20.0 * m.max(eps).log10()),
    }
}

/// `(x - shift) / scale` per frequency bin, using the stored statistics as-is.
pub fn affine_normalize(mut features: Array3<f32>, shift: &Stat, scale: &Stat) -> Array3<f32> {
    for (bin, mut lane) in features.axis_iter_mut(Axis(1)).enumerate() {
        let (s, k) = (shift.at(bin), scale.at(bin));
        lane.mapv_inplace(|x| (x - s) / k);
    }
    features
}

pub fn normalize(features: Array3<f32>, normalization: &Normalization) -> Array3<f32> {
    match normalization {
        Normalization::Identity => features,
        Normalization::Affine { shift, scale } => affine_normalize(features, shift, scale),
    }
}

/// Feature pipeline bound to one checkpoint's configuration.
pub struct FeatureExtractor {
    config: FeatureConfig,
    stft: Stft,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Self {
        let stft = Stft::new(config.n_fft, config.hop_length, config.win_length);
        Self { config, stft }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn stft(&self) -> &Stft {
        &self.stft
    }

    /// Read an audio file at the configured sample rate with `channels` channels.
    pub fn load_audio<P: AsRef<Path>>(&self, path: P, channels: usize) -> Result<AudioData> {
        audio::load_audio(path, self.config.sampling_rate, channels)
    }

    pub fn transform(&self, audio: &AudioData) -> Result<Spectrogram> {
        if audio.sample_rate != self.config.sampling_rate {
            return Err(SeparatorError::Config(format!(
                "waveform is sampled at {} Hz, model expects {} Hz",
                audio.sample_rate, self.config.sampling_rate
            )));
        }
        let planar = to_planar(&audio.samples, audio.channels);
        Ok(self.stft.forward(&planar))
    }

    pub fn to_features(&self, magnitude: &Array3<f32>) -> Array3<f32> {
        to_features(magnitude, self.config.feature_type, self.config.eps)
    }

    pub fn normalize(&self, features: Array3<f32>) -> Array3<f32> {
        normalize(features, &self.config.normalization)
    }

    /// STFT plus normalized features. The spectrogram keeps raw magnitude for masking.
    pub fn extract(&self, audio: &AudioData) -> Result<(Spectrogram, Array3<f32>)> {
        let spec = self.transform(audio)?;
        let features = self.normalize(self.to_features(&spec.magnitude));
        Ok((spec, features))
    }
}
