use mask_separator::core::{
    chunker::{chunk, chunk_count, truncated_frames},
    resynth::assemble,
};
use mask_separator::ChunkShape;
use ndarray::{s, Array3, Array4};

#[test]
fn chunk_count_is_floor_of_ratio() {
    for total in [0usize, 1, 199, 200, 201, 399, 400, 501, 1000] {
        for tc in [1usize, 7, 200] {
            assert_eq!(chunk_count(total, tc), total / tc);
            let kept = truncated_frames(total, tc);
            assert_eq!(kept, tc * (total / tc));
            assert!(kept <= total);
        }
    }
}

#[test]
fn chunks_are_ordered_non_overlapping_slices() {
    let (c, f, t, tc) = (2, 5, 23, 6);
    let features = Array3::from_shape_fn((c, f, t), |(ch, bin, fr)| {
        (ch * 10_000 + bin * 100 + fr) as f32
    });
    let shape = ChunkShape::new(c, f, tc);
    let batch = chunk(features.view(), &shape).unwrap();
    assert_eq!(batch.dim(), (3, c, f, tc));

    for i in 0..3 {
        assert_eq!(
            batch.slice(s![i, .., .., ..]),
            features.slice(s![.., .., i * tc..(i + 1) * tc])
        );
    }
}

#[test]
fn unity_masks_reassemble_truncated_magnitude() {
    let (c, f, t, tc) = (1, 4, 11, 3);
    let magnitude = Array3::from_shape_fn((c, f, t), |(_, bin, fr)| (bin + fr) as f32 + 0.5);
    let shape = ChunkShape::new(c, f, tc);
    let n = chunk_count(t, tc);
    let masks = Array4::<f32>::ones((n, 2, f, tc));

    let separated = assemble(masks.view(), magnitude.view(), &shape).unwrap();
    assert_eq!(separated.dim(), (2, c, f, n * tc));
    for k in 0..2 {
        assert_eq!(
            separated.slice(s![k, .., .., ..]),
            magnitude.slice(s![.., .., ..n * tc])
        );
    }
}
