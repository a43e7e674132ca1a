use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info, warn};

use crate::{
    config::{required, FeatureConfig},
    core::engine::InferenceEngine,
    error::{Result, SeparatorError},
    io::crypto::verify_sha256,
    model::{
        backend::{MaskModel, UnityMaskModel},
        manifest::{Artifact, CheckpointManifest, IoNames},
    },
    types::{ChunkShape, LoadOptions},
};

pub const MANIFEST_FILE: &str = "checkpoint.json";

/// A loaded model together with the configuration it was trained with.
pub struct Checkpoint {
    name: String,
    version: String,
    source: PathBuf,
    config: FeatureConfig,
    classes: Vec<String>,
    engine: InferenceEngine,
    output_dir: Option<PathBuf>,
}

impl std::fmt::Debug for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkpoint")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("source", &self.source)
            .field("backend", &self.engine.model().backend())
            .field("classes", &self.classes)
            .field("chunk_shape", &self.engine.chunk_shape())
            .finish()
    }
}

impl Checkpoint {
    /// Load a checkpoint manifest file, or a directory containing `checkpoint.json`.
    pub fn load<P: AsRef<Path>>(path: P, opts: &LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let manifest_path = if path.is_dir() {
            path.join(MANIFEST_FILE)
        } else {
            path.to_path_buf()
        };

        if !manifest_path.is_file() {
            return Err(SeparatorError::load(
                manifest_path.display(),
                "checkpoint not found",
            ));
        }

        let text = fs::read_to_string(&manifest_path)
            .map_err(|e| SeparatorError::load(manifest_path.display(), e.to_string()))?;
        let manifest: CheckpointManifest = serde_json::from_str(&text).map_err(|e| {
            SeparatorError::load(manifest_path.display(), format!("invalid manifest: {e}"))
        })?;

        let base_dir = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut checkpoint = Self::from_manifest(manifest, &base_dir, opts)?;
        checkpoint.source = manifest_path;
        info!(
            "loaded checkpoint {} v{} ({} backend, {} classes)",
            checkpoint.name,
            checkpoint.version,
            checkpoint.engine.model().backend(),
            checkpoint.classes.len()
        );
        Ok(checkpoint)
    }

    /// Validate a parsed manifest and build its model. Relative artifact paths resolve
    /// against `base_dir`.
    pub fn from_manifest(
        manifest: CheckpointManifest,
        base_dir: &Path,
        opts: &LoadOptions,
    ) -> Result<Self> {
        let config = required(manifest.config, "config")?.validate()?;
        let classes = validate_classes(required(manifest.classes, "classes")?)?;
        let chunk_shape = validate_chunk_shape(
            &required(manifest.chunk_shape, "chunk_shape")?,
            &config,
        )?;

        let label = if manifest.name.is_empty() {
            base_dir.display().to_string()
        } else {
            manifest.name.clone()
        };

        let artifact = match &manifest.artifact {
            Some(a) => Some(resolve_artifact(a, base_dir)?),
            None => None,
        };

        let backend = manifest
            .backend
            .as_deref()
            .ok_or_else(|| SeparatorError::load(&label, "manifest does not name a backend"))?;

        let model: Box<dyn MaskModel> = match backend {
            "unity" => Box::new(UnityMaskModel::new(classes.len())),
            "onnx" => {
                let Some(file) = artifact.as_deref() else {
                    return Err(SeparatorError::load(&label, "onnx backend requires an artifact"));
                };
                load_onnx(file, manifest.io.clone(), classes.len())?
            }
            other => {
                return Err(SeparatorError::load(
                    &label,
                    format!("unknown backend `{other}`"),
                ))
            }
        };

        Ok(Self {
            name: manifest.name,
            version: manifest.version,
            source: base_dir.to_path_buf(),
            config,
            classes,
            engine: InferenceEngine::new(model, chunk_shape),
            output_dir: opts.output_dir.clone(),
        })
    }

    /// Assemble a checkpoint around an already constructed model.
    pub fn from_parts(
        name: impl Into<String>,
        config: FeatureConfig,
        classes: Vec<String>,
        chunk_shape: ChunkShape,
        model: Box<dyn MaskModel>,
    ) -> Result<Self> {
        let classes = validate_classes(classes)?;
        validate_chunk_shape(
            &[chunk_shape.channels, chunk_shape.freq_bins, chunk_shape.frames],
            &config,
        )?;
        if model.num_classes() != classes.len() {
            return Err(SeparatorError::Config(format!(
                "model predicts {} classes, vocabulary has {}",
                model.num_classes(),
                classes.len()
            )));
        }
        Ok(Self {
            name: name.into(),
            version: String::new(),
            source: PathBuf::new(),
            config,
            classes,
            engine: InferenceEngine::new(model, chunk_shape),
            output_dir: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn model(&self) -> &dyn MaskModel {
        self.engine.model()
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn chunk_shape(&self) -> ChunkShape {
        self.engine.chunk_shape()
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn class_index(&self, name: &str) -> Result<usize> {
        self.classes
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                SeparatorError::Config(format!(
                    "unknown class `{name}`, available: {}",
                    self.classes.join(", ")
                ))
            })
    }
}

fn validate_classes(classes: Vec<String>) -> Result<Vec<String>> {
    if classes.is_empty() {
        return Err(SeparatorError::Config("`classes` must not be empty".into()));
    }
    let mut seen = HashSet::new();
    for c in &classes {
        // class names become part of output file names
        if c.is_empty() || c == "." || c == ".." || c.contains(['/', '\\']) {
            return Err(SeparatorError::Config(format!(
                "class `{c}` is not usable as a file name"
            )));
        }
        if !seen.insert(c.to_lowercase()) {
            return Err(SeparatorError::Config(format!("duplicate class `{c}`")));
        }
    }
    Ok(classes)
}

fn validate_chunk_shape(dims: &[usize], config: &FeatureConfig) -> Result<ChunkShape> {
    let [channels, freq_bins, frames] = dims else {
        return Err(SeparatorError::Config(format!(
            "`chunk_shape` must have 3 dimensions (channel, frequency, time), got {}",
            dims.len()
        )));
    };
    if *channels == 0 || *freq_bins == 0 || *frames == 0 {
        return Err(SeparatorError::Config(format!(
            "`chunk_shape` dimensions must be positive, got {dims:?}"
        )));
    }
    if *freq_bins != config.freq_bins() {
        return Err(SeparatorError::Config(format!(
            "`chunk_shape` has {freq_bins} frequency bins but n_fft={} yields {}",
            config.n_fft,
            config.freq_bins()
        )));
    }
    Ok(ChunkShape::new(*channels, *freq_bins, *frames))
}

fn resolve_artifact(artifact: &Artifact, base_dir: &Path) -> Result<PathBuf> {
    let path = base_dir.join(&artifact.file);
    if !path.is_file() {
        return Err(SeparatorError::load(path.display(), "model artifact not found"));
    }

    if let Some(sha) = &artifact.sha256 {
        if !verify_sha256(&path, sha)? {
            return Err(SeparatorError::load(path.display(), "checksum mismatch"));
        }
        debug!("checksum ok: {}", path.display());
    }

    if artifact.size_bytes > 0 {
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if size != artifact.size_bytes {
            warn!(
                "size mismatch for {}, expected {}, got {}",
                path.display(),
                artifact.size_bytes,
                size
            );
        }
    }

    Ok(path)
}

#[cfg(feature = "onnx")]
fn load_onnx(file: &Path, io: IoNames, classes: usize) -> Result<Box<dyn MaskModel>> {
    let model = crate::model::backend::OnnxMaskModel::load(file, io, classes)?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(file: &Path, _io: IoNames, _classes: usize) -> Result<Box<dyn MaskModel>> {
    Err(SeparatorError::load(
        file.display(),
        "onnx backend requested but this build lacks the `onnx` feature",
    ))
}
