use thiserror::Error;

/// Central error type for the mask-separator crate.
#[derive(Debug, Error)]
pub enum SeparatorError {
    // Generic fallback (wraps anyhow)
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),

    #[error("Failed to load checkpoint {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Audio I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Inference error: {0}")]
    Inference(String),
}

impl SeparatorError {
    pub(crate) fn load(path: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        SeparatorError::Load {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io<E>(path: impl std::fmt::Display, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        SeparatorError::Io {
            path: path.to_string(),
            source: source.into(),
        }
    }
}

impl From<ndarray::ShapeError> for SeparatorError {
    fn from(e: ndarray::ShapeError) -> Self {
        SeparatorError::Inference(e.to_string())
    }
}

#[cfg(feature = "onnx")]
impl From<ort::Error> for SeparatorError {
    fn from(e: ort::Error) -> Self {
        SeparatorError::Inference(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SeparatorError>;
