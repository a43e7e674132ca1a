//! Training-time feature configuration, as stored next to a model.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeparatorError};

/// Magnitude → model-input mapping applied before normalization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Linear,
    #[default]
    Log,
    Log1p,
    Db,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingType {
    #[default]
    None,
    Standard,
    MinMax,
}

/// A normalization statistic: one value for all bins, or one per frequency bin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Stat {
    Scalar(f32),
    PerBin(Vec<f32>),
}

impl Stat {
    pub fn at(&self, bin: usize) -> f32 {
        match self {
            Stat::Scalar(v) => *v,
            Stat::PerBin(v) => v[bin],
        }
    }

    fn check(&self, name: &str, freq_bins: usize) -> Result<()> {
        match self {
            Stat::Scalar(v) if !v.is_finite() => Err(SeparatorError::Config(format!(
                "`{name}` must be finite, got {v}"
            ))),
            Stat::PerBin(v) if v.len() != freq_bins => Err(SeparatorError::Config(format!(
                "`{name}` has {} entries, expected {freq_bins} (one per frequency bin)",
                v.len()
            ))),
            Stat::PerBin(v) if v.iter().any(|x| !x.is_finite()) => Err(SeparatorError::Config(
                format!("`{name}` contains non-finite values"),
            )),
            _ => Ok(()),
        }
    }
}

/// Affine feature normalization resolved from `scaling_type`, `shift` and `scaling`.
#[derive(Clone, Debug, PartialEq)]
pub enum Normalization {
    Identity,
    Affine { shift: Stat, scale: Stat },
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeatureConfig {
    pub sampling_rate: u32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub win_length: usize,
    pub feature_type: FeatureKind,
    pub eps: f32,
    pub scaling_type: ScalingType,
    pub normalization: Normalization,
}

impl FeatureConfig {
    pub fn freq_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// STFT frames per second of audio.
    pub fn frames_per_second(&self) -> f32 {
        self.sampling_rate as f32 / self.hop_length as f32
    }
}

/// `config` block of a checkpoint manifest, before validation.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawFeatureConfig {
    pub sampling_rate: Option<u32>,
    pub n_fft: Option<usize>,
    pub hop_length: Option<usize>,
    pub win_length: Option<usize>,
    #[serde(default)]
    pub feature_type: FeatureKind,
    pub eps: Option<f32>,
    #[serde(default)]
    pub scaling_type: ScalingType,
    pub shift: Option<Stat>,
    pub scaling: Option<Stat>,
}

pub(crate) fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| SeparatorError::Config(format!("missing required field `{field}`")))
}

impl RawFeatureConfig {
    pub fn validate(self) -> Result<FeatureConfig> {
        let sampling_rate = required(self.sampling_rate, "config.sampling_rate")?;
        let n_fft = required(self.n_fft, "config.n_fft")?;
        let hop_length = required(self.hop_length, "config.hop_length")?;
        let win_length = self.win_length.unwrap_or(n_fft);
        let eps = self.eps.unwrap_or(1e-8);

        if sampling_rate == 0 {
            return Err(SeparatorError::Config("`sampling_rate` must be positive".into()));
        }
        if n_fft < 2 {
            return Err(SeparatorError::Config(format!(
                "`n_fft` must be >= 2, got {n_fft}"
            )));
        }
        if hop_length == 0 || hop_length > n_fft {
            return Err(SeparatorError::Config(format!(
                "`hop_length` must be in 1..={n_fft}, got {hop_length}"
            )));
        }
        if win_length == 0 || win_length > n_fft {
            return Err(SeparatorError::Config(format!(
                "`win_length` must be in 1..={n_fft}, got {win_length}"
            )));
        }
        if !(eps > 0.0 && eps.is_finite()) {
            return Err(SeparatorError::Config(format!("`eps` must be positive, got {eps}")));
        }

        let freq_bins = n_fft / 2 + 1;
        let normalization = match self.scaling_type {
            ScalingType::None => Normalization::Identity,
            kind => {
                let shift = self.shift.ok_or_else(|| {
                    SeparatorError::Config(format!(
                        "`shift` is required when scaling_type is {kind:?}"
                    ))
                })?;
                let scale = self.scaling.ok_or_else(|| {
                    SeparatorError::Config(format!(
                        "`scaling` is required when scaling_type is {kind:?}"
                    ))
                })?;
                shift.check("shift", freq_bins)?;
                scale.check("scaling", freq_bins)?;
                let has_zero = match &scale {
                    Stat::Scalar(v) => *v == 0.0,
                    Stat::PerBin(v) => v.iter().any(|x| *x == 0.0),
                };
                if has_zero {
                    return Err(SeparatorError::Config("`scaling` must be non-zero".into()));
                }
                Normalization::Affine { shift, scale }
            }
        };

        Ok(FeatureConfig {
            sampling_rate,
            n_fft,
            hop_length,
            win_length,
            feature_type: self.feature_type,
            eps,
            scaling_type: self.scaling_type,
            normalization,
        })
    }
}
