use serde::Deserialize;

use crate::config::RawFeatureConfig;

/// `checkpoint.json` as written by the training side. Fields are optional here so that
/// validation can report exactly which one is missing.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    pub backend: Option<String>,
    pub config: Option<RawFeatureConfig>,
    pub classes: Option<Vec<String>>,
    pub chunk_shape: Option<Vec<usize>>,
    pub artifact: Option<Artifact>,
    #[serde(default)]
    pub io: IoNames,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    pub file: String,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub size_bytes: u64,
}

/// Tensor names bound when running an exported graph.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IoNames {
    pub input: String,
    pub masks: String,
    pub logits: String,
}

impl Default for IoNames {
    fn default() -> Self {
        Self {
            input: "input".into(),
            masks: "masks".into(),
            logits: "logits".into(),
        }
    }
}
