use approx::assert_abs_diff_eq;
use mask_separator::{
    config::RawFeatureConfig,
    core::{
        features::{affine_normalize, normalize, to_features, FeatureExtractor},
        resynth::apply_mask,
    },
    AudioData, ChunkShape, FeatureKind, Normalization, ScalingType, SeparatorError, Stat,
};
use ndarray::{s, Array3};

fn raw_config() -> RawFeatureConfig {
    RawFeatureConfig {
        sampling_rate: Some(16_000),
        n_fft: Some(256),
        hop_length: Some(64),
        ..Default::default()
    }
}

fn tone(sr: u32, secs: f32) -> AudioData {
    let n = (sr as f32 * secs) as usize;
    AudioData {
        samples: (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 300.0 * i as f32 / sr as f32).sin() * 0.4)
            .collect(),
        sample_rate: sr,
        channels: 1,
    }
}

#[test]
fn none_scaling_is_identity() {
    let cfg = raw_config().validate().unwrap();
    assert_eq!(cfg.scaling_type, ScalingType::None);

    let features = Array3::from_shape_fn((1, 129, 7), |(_, f, t)| f as f32 * 0.1 - t as f32);
    let out = normalize(features.clone(), &cfg.normalization);
    assert_eq!(out, features);
}

#[test]
fn standard_scaling_uses_stored_statistics() {
    let mut raw = raw_config();
    raw.scaling_type = ScalingType::Standard;
    raw.shift = Some(Stat::Scalar(2.0));
    raw.scaling = Some(Stat::Scalar(4.0));
    let cfg = raw.validate().unwrap();

    // Statistics of this tensor are nowhere near shift=2, scale=4.
    let features = Array3::from_elem((1, 129, 5), 10.0f32);
    let out = normalize(features, &cfg.normalization);
    for v in out.iter() {
        assert_abs_diff_eq!(*v, 2.0, epsilon = 1e-6);
    }
}

#[test]
fn per_bin_statistics_apply_along_frequency() {
    let shift = Stat::PerBin(vec![0.0, 1.0, 2.0]);
    let scale = Stat::PerBin(vec![1.0, 2.0, 4.0]);
    let features = Array3::from_elem((2, 3, 4), 6.0f32);
    let out = affine_normalize(features, &shift, &scale);
    assert_abs_diff_eq!(out[[0, 0, 0]], 6.0);
    assert_abs_diff_eq!(out[[1, 1, 3]], 2.5);
    assert_abs_diff_eq!(out[[0, 2, 2]], 1.0);
}

#[test]
fn feature_kinds() {
    let mag = Array3::from_shape_vec((1, 1, 3), vec![0.0, 1.0, 10.0]).unwrap();

    let lin = to_features(&mag, FeatureKind::Linear, 1e-8);
    assert_eq!(lin, mag);

    let log = to_features(&mag, FeatureKind::Log, 1e-8);
    assert_abs_diff_eq!(log[[0, 0, 0]], (1e-8f32).ln(), epsilon = 1e-3);
    assert_abs_diff_eq!(log[[0, 0, 1]], 0.0);

    let log1p = to_features(&mag, FeatureKind::Log1p, 1e-8);
    assert_abs_diff_eq!(log1p[[0, 0, 0]], 0.0);
    assert_abs_diff_eq!(log1p[[0, 0, 2]], 11.0f32.ln(), epsilon = 1e-6);

    let db = to_features(&mag, FeatureKind::Db, 1e-8);
    assert_abs_diff_eq!(db[[0, 0, 2]], 20.0, epsilon = 1e-4);
    assert_abs_diff_eq!(db[[0, 0, 0]], -160.0, epsilon = 1e-2);
}

#[test]
fn transform_rejects_wrong_sample_rate() {
    let extractor = FeatureExtractor::new(raw_config().validate().unwrap());
    let err = extractor.transform(&tone(22_050, 0.2)).unwrap_err();
    assert!(matches!(err, SeparatorError::Config(_)));
}

#[test]
fn extract_keeps_raw_magnitude_next_to_features() {
    let mut raw = raw_config();
    raw.scaling_type = ScalingType::Standard;
    raw.shift = Some(Stat::Scalar(-3.0));
    raw.scaling = Some(Stat::Scalar(2.0));
    let extractor = FeatureExtractor::new(raw.validate().unwrap());

    let (spec, features) = extractor.extract(&tone(16_000, 0.5)).unwrap();
    assert_eq!(spec.magnitude.dim(), features.dim());
    assert!(matches!(
        extractor.config().normalization,
        Normalization::Affine { .. }
    ));

    let m = spec.magnitude[[0, 5, 10]];
    let expected = (m.max(1e-8).ln() + 3.0) / 2.0;
    assert_abs_diff_eq!(features[[0, 5, 10]], expected, epsilon = 1e-5);
}

#[test]
fn masking_normalized_features_differs_from_masking_magnitude() {
    let mut raw = raw_config();
    raw.scaling_type = ScalingType::Standard;
    raw.shift = Some(Stat::Scalar(-3.0));
    raw.scaling = Some(Stat::Scalar(2.0));
    let extractor = FeatureExtractor::new(raw.validate().unwrap());
    let (spec, features) = extractor.extract(&tone(16_000, 0.5)).unwrap();

    let shape = ChunkShape::new(1, 129, 16);
    let mask = Array3::from_elem((1, 129, 16), 0.5f32);

    let from_mag = apply_mask(
        mask.view(),
        &shape,
        spec.magnitude.slice(s![.., .., 0..16]),
    )
    .unwrap();
    let from_features =
        apply_mask(mask.view(), &shape, features.slice(s![.., .., 0..16])).unwrap();

    let diff: f32 = from_mag
        .iter()
        .zip(from_features.iter())
        .map(|(a, b)| (a - b).abs())
        .sum();
    assert!(diff > 1.0, "masking features must not equal masking magnitude");

    for (out, m) in from_mag.iter().zip(spec.magnitude.slice(s![.., .., 0..16]).iter()) {
        assert_abs_diff_eq!(*out, m * 0.5, epsilon = 1e-7);
    }
}
