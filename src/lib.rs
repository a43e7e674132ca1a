//! # mask-separator
//!
//! Spectrogram-mask source separation from a trained checkpoint: read audio,
//! recompute the training-time STFT features, run the model chunk by chunk,
//! mask the mixture magnitude and resynthesize each class with the mixture phase.
//!
//! ```ignore
//! use mask_separator::{LoadOptions, SeparateOptions, Separator};
//!
//! let separator = Separator::load("checkpoints/demo", LoadOptions::default())?;
//! let result = separator.separate_file("mix.wav", &SeparateOptions::default())?;
//! for (class, path) in &result.outputs {
//!     println!("{class}: {}", path.display());
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod model;
pub mod types;

pub use crate::{
    config::{FeatureConfig, FeatureKind, Normalization, ScalingType, Stat},
    core::{
        audio::{load_audio, read_audio, write_audio},
        separator::{separate_file, Separator},
    },
    error::{Result, SeparatorError},
    io::progress::{clear_progress_callback, set_progress_callback, SeparationProgress},
    model::{
        backend::{MaskModel, UnityMaskModel},
        checkpoint::Checkpoint,
    },
    types::{
        AudioData, ChunkShape, LoadOptions, MaskOutput, SampleFormat, SeparateOptions,
        SeparatedSource, Separation, SeparationResult, Spectrogram,
    },
};
