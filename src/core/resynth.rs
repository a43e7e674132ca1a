//! Mask application on raw magnitude, chunk reassembly and inverse STFT.

use ndarray::{s, Array3, Array4, ArrayView3, ArrayView4, Axis};

use crate::{
    core::dsp::Stft,
    error::{Result, SeparatorError},
    types::ChunkShape,
};

/// Scale one chunk of raw magnitude `(C, F, Tc)` by its class masks `(K, F, Tc)`.
///
/// The mask is shared across channels. Returns `(K, C, F, Tc)`.
pub fn apply_mask(
    mask_chunk: ArrayView3<f32>,
    feature_shape: &ChunkShape,
    magnitude_chunk: ArrayView3<f32>,
) -> Result<Array4<f32>> {
    let (classes, mf, mt) = mask_chunk.dim();
    if magnitude_chunk.dim() != feature_shape.as_tuple() {
        return Err(SeparatorError::Inference(format!(
            "magnitude chunk {:?} does not match chunk shape {:?}",
            magnitude_chunk.shape(),
            feature_shape.as_tuple()
        )));
    }
    if (mf, mt) != (feature_shape.freq_bins, feature_shape.frames) {
        return Err(SeparatorError::Inference(format!(
            "mask chunk {:?} does not match ({}, {})",
            mask_chunk.shape(),
            feature_shape.freq_bins,
            feature_shape.frames
        )));
    }

    let channels = feature_shape.channels;
    let mut out = Array4::<f32>::zeros((classes, channels, mf, mt));
    for k in 0..classes {
        let mask = mask_chunk.index_axis(Axis(0), k);
        for c in 0..channels {
            let mag = magnitude_chunk.index_axis(Axis(0), c);
            out.slice_mut(s![k, c, .., ..]).assign(&(&mask * &mag));
        }
    }
    Ok(out)
}

/// Apply every chunk's masks to the matching slice of raw magnitude and concatenate
/// along time. Returns `(K, C, F, n_chunks * Tc)`.
pub fn assemble(
    masks: ArrayView4<f32>,
    magnitude: ArrayView3<f32>,
    shape: &ChunkShape,
) -> Result<Array4<f32>> {
    let (n, classes, _, _) = masks.dim();
    let tc = shape.frames;
    let total = n * tc;
    if magnitude.dim().2 < total {
        return Err(SeparatorError::Inference(format!(
            "magnitude has {} frames, masks cover {}",
            magnitude.dim().2,
            total
        )));
    }

    let mut out = Array4::<f32>::zeros((classes, shape.channels, shape.freq_bins, total));
    for i in 0..n {
        let span = i * tc..(i + 1) * tc;
        let mag_chunk = magnitude.slice(s![.., .., span.clone()]);
        let separated = apply_mask(masks.index_axis(Axis(0), i), shape, mag_chunk)?;
        out.slice_mut(s![.., .., .., span]).assign(&separated);
    }
    Ok(out)
}

pub fn select_class(separated: ArrayView4<f32>, index: usize) -> Result<Array3<f32>> {
    let classes = separated.dim().0;
    if index >= classes {
        return Err(SeparatorError::Config(format!(
            "class index {index} out of range for {classes} classes"
        )));
    }
    Ok(separated.index_axis(Axis(0), index).to_owned())
}

/// Recombine a separated magnitude with the mixture phase and return planar samples.
///
/// Phase is truncated to the spectrogram's time extent; output is `frames * hop` long.
pub fn invert(
    stft: &Stft,
    spectrogram: ArrayView3<f32>,
    phase: ArrayView3<f32>,
) -> Result<Vec<Vec<f32>>> {
    let (c, f, t) = spectrogram.dim();
    let (pc, pf, pt) = phase.dim();
    if (pc, pf) != (c, f) || pt < t {
        return Err(SeparatorError::Inference(format!(
            "phase {:?} cannot cover spectrogram {:?}",
            phase.shape(),
            spectrogram.shape()
        )));
    }
    stft.inverse(spectrogram, phase.slice(s![.., .., ..t]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn mask_broadcasts_over_channels() {
        let shape = ChunkShape::new(2, 2, 2);
        let mag = Array3::from_shape_vec((2, 2, 2), vec![1., 2., 3., 4., 5., 6., 7., 8.]).unwrap();
        let mask = Array3::from_elem((1, 2, 2), 0.5);
        let out = apply_mask(mask.view(), &shape, mag.view()).unwrap();
        assert_eq!(out.dim(), (1, 2, 2, 2));
        assert_eq!(out[[0, 1, 1, 1]], 4.0);
        assert_eq!(out[[0, 0, 0, 1]], 1.0);
    }

    #[test]
    fn select_class_out_of_range() {
        let sep = Array4::<f32>::zeros((2, 1, 3, 4));
        assert!(matches!(select_class(sep.view(), 2), Err(SeparatorError::Config(_))));
    }
}
