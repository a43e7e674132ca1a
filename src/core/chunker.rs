//! Fixed-size, non-overlapping time chunking. A trailing partial chunk is dropped, never padded.

use ndarray::{s, Array4, ArrayView3};

use crate::{
    error::{Result, SeparatorError},
    types::ChunkShape,
};

pub fn chunk_count(total_frames: usize, chunk_frames: usize) -> usize {
    if chunk_frames == 0 {
        0
    } else {
        total_frames / chunk_frames
    }
}

/// Frames that survive chunking: `chunk_frames * floor(total / chunk_frames)`.
pub fn truncated_frames(total_frames: usize, chunk_frames: usize) -> usize {
    chunk_count(total_frames, chunk_frames) * chunk_frames
}

/// Stack `(channel, frequency, time)` features into `(n_chunks, channel, frequency, chunk_time)`.
pub fn chunk(features: ArrayView3<f32>, shape: &ChunkShape) -> Result<Array4<f32>> {
    let (channels, bins, total) = features.dim();
    if channels != shape.channels || bins != shape.freq_bins {
        return Err(SeparatorError::Inference(format!(
            "features are ({channels}, {bins}, _), model expects ({}, {}, _)",
            shape.channels, shape.freq_bins
        )));
    }
    if shape.frames == 0 {
        return Err(SeparatorError::Inference("chunk time extent is zero".into()));
    }

    let tc = shape.frames;
    let n = chunk_count(total, tc);
    let mut batch = Array4::<f32>::zeros((n, channels, bins, tc));
    for i in 0..n {
        batch
            .slice_mut(s![i, .., .., ..])
            .assign(&features.slice(s![.., .., i * tc..(i + 1) * tc]));
    }
    Ok(batch)
}
