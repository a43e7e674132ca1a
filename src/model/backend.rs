use ndarray::{Array4, ArrayView4};

use crate::{error::Result, types::MaskOutput};

/// A trained mask estimator. Inference only: implementations take `&self`.
pub trait MaskModel: Send + Sync {
    fn backend(&self) -> &str;

    fn num_classes(&self) -> usize;

    /// `(n_chunks, channel, frequency, time)` → masks `(n_chunks, n_classes, frequency, time)`.
    fn infer(&self, batch: ArrayView4<f32>) -> Result<MaskOutput>;
}

/// Passes the mixture through unchanged for every class.
pub struct UnityMaskModel {
    classes: usize,
}

impl UnityMaskModel {
    pub fn new(classes: usize) -> Self {
        Self { classes }
    }
}

impl MaskModel for UnityMaskModel {
    fn backend(&self) -> &str {
        "unity"
    }

    fn num_classes(&self) -> usize {
        self.classes
    }

    fn infer(&self, batch: ArrayView4<f32>) -> Result<MaskOutput> {
        let (n, _, bins, frames) = batch.dim();
        Ok(MaskOutput {
            masks: Array4::ones((n, self.classes, bins, frames)),
            logits: None,
        })
    }
}

#[cfg(feature = "onnx")]
pub use self::onnx::OnnxMaskModel;

#[cfg(feature = "onnx")]
mod onnx {
    use std::{path::Path, sync::Mutex};

    use ndarray::{Array2, Array4, ArrayView4};
    use ort::{
        session::{builder::GraphOptimizationLevel, Session},
        value::{Tensor, Value},
    };
    use tracing::debug;

    use super::MaskModel;
    use crate::{
        error::{Result, SeparatorError},
        model::manifest::IoNames,
        types::MaskOutput,
    };

    pub struct OnnxMaskModel {
        session: Mutex<Session>,
        io: IoNames,
        classes: usize,
    }

    impl OnnxMaskModel {
        pub fn load(path: &Path, io: IoNames, classes: usize) -> Result<Self> {
            let load_err = |e: &dyn std::fmt::Display| SeparatorError::load(path.display(), e.to_string());
            let builder = Session::builder().map_err(|e| load_err(&e))?;
            let builder = builder
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .map_err(|e| load_err(&e))?;
            let session = builder.commit_from_file(path).map_err(|e| load_err(&e))?;

            if !session.inputs.iter().any(|i| i.name == io.input) {
                return Err(SeparatorError::load(
                    path.display(),
                    format!("model has no input named `{}`", io.input),
                ));
            }
            if !session.outputs.iter().any(|o| o.name == io.masks) {
                return Err(SeparatorError::load(
                    path.display(),
                    format!("model has no output named `{}`", io.masks),
                ));
            }
            debug!("onnx session ready: {}", path.display());

            Ok(Self {
                session: Mutex::new(session),
                io,
                classes,
            })
        }
    }

    impl MaskModel for OnnxMaskModel {
        fn backend(&self) -> &str {
            "onnx"
        }

        fn num_classes(&self) -> usize {
            self.classes
        }

        fn infer(&self, batch: ArrayView4<f32>) -> Result<MaskOutput> {
            let (n, c, f, t) = batch.dim();
            let data: Vec<f32> = batch.iter().copied().collect();
            let input: Value = Tensor::from_array((vec![n, c, f, t], data))?.into_dyn();

            let mut session = self
                .session
                .lock()
                .map_err(|_| SeparatorError::Inference("onnx session poisoned".into()))?;

            let outputs = session.run(vec![(self.io.input.clone(), input)])?;

            let masks_value = outputs.get(self.io.masks.as_str()).ok_or_else(|| {
                SeparatorError::Inference(format!("model did not return `{}`", self.io.masks))
            })?;
            let (_shape, data) = masks_value.try_extract_tensor::<f32>()?;
            let expected = n * self.classes * f * t;
            if data.len() != expected {
                return Err(SeparatorError::Inference(format!(
                    "`{}` has {} values, expected {} for ({n}, {}, {f}, {t})",
                    self.io.masks,
                    data.len(),
                    expected,
                    self.classes
                )));
            }
            let masks = Array4::from_shape_vec((n, self.classes, f, t), data.to_vec())?;

            let logits = match outputs.get(self.io.logits.as_str()) {
                Some(v) => {
                    let (_shape, data) = v.try_extract_tensor::<f32>()?;
                    if data.len() == n * self.classes {
                        Some(Array2::from_shape_vec((n, self.classes), data.to_vec())?)
                    } else {
                        None
                    }
                }
                None => None,
            };

            Ok(MaskOutput { masks, logits })
        }
    }
}
