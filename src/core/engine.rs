use ndarray::ArrayView4;
use tracing::debug;

use crate::{
    error::{Result, SeparatorError},
    model::backend::MaskModel,
    types::{ChunkShape, MaskOutput},
};

/// Shape-checked wrapper around a loaded [`MaskModel`].
pub struct InferenceEngine {
    model: Box<dyn MaskModel>,
    chunk_shape: ChunkShape,
}

impl InferenceEngine {
    pub fn new(model: Box<dyn MaskModel>, chunk_shape: ChunkShape) -> Self {
        Self { model, chunk_shape }
    }

    pub fn model(&self) -> &dyn MaskModel {
        self.model.as_ref()
    }

    pub fn chunk_shape(&self) -> ChunkShape {
        self.chunk_shape
    }

    pub fn run(&self, batch: ArrayView4<f32>) -> Result<MaskOutput> {
        let (n, c, f, t) = batch.dim();
        let expected = self.chunk_shape;
        if (c, f, t) != expected.as_tuple() {
            return Err(SeparatorError::Inference(format!(
                "batch chunks are ({c}, {f}, {t}), model expects {:?}",
                expected.as_tuple()
            )));
        }
        if n == 0 {
            return Err(SeparatorError::Inference("empty chunk batch".into()));
        }

        debug!("running {} on {} chunks", self.model.backend(), n);
        let out = self.model.infer(batch)?;

        let want = (n, self.model.num_classes(), f, t);
        if out.masks.dim() != want {
            return Err(SeparatorError::Inference(format!(
                "model returned masks {:?}, expected {:?}",
                out.masks.shape(),
                want
            )));
        }
        Ok(out)
    }
}
