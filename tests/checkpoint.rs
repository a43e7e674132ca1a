use std::{fs, path::Path};

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tempfile::tempdir;

use mask_separator::{Checkpoint, ChunkShape, LoadOptions, Normalization, SeparatorError, Stat};

fn manifest() -> Value {
    json!({
        "name": "demo",
        "version": "1.0.0",
        "backend": "unity",
        "config": {
            "sampling_rate": 16000,
            "n_fft": 512,
            "hop_length": 160,
            "scaling_type": "standard",
            "shift": -4.0,
            "scaling": 2.5
        },
        "classes": ["speech", "music"],
        "chunk_shape": [1, 257, 200]
    })
}

fn write_manifest(dir: &Path, body: &Value) {
    fs::write(
        dir.join("checkpoint.json"),
        serde_json::to_string_pretty(body).unwrap(),
    )
    .unwrap();
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

#[test]
fn loads_unity_checkpoint_from_directory() {
    let tmp = tempdir().unwrap();
    write_manifest(tmp.path(), &manifest());

    let cp = Checkpoint::load(tmp.path(), &LoadOptions::default()).expect("load failed");
    assert_eq!(cp.name(), "demo");
    assert_eq!(cp.model().backend(), "unity");
    assert_eq!(cp.classes(), &["speech".to_string(), "music".to_string()]);
    assert_eq!(cp.chunk_shape(), ChunkShape::new(1, 257, 200));
    assert_eq!(cp.config().sampling_rate, 16_000);
    assert_eq!(
        cp.config().normalization,
        Normalization::Affine {
            shift: Stat::Scalar(-4.0),
            scale: Stat::Scalar(2.5)
        }
    );
    assert_eq!(cp.class_index("MUSIC").unwrap(), 1);
    assert!(matches!(cp.class_index("drums"), Err(SeparatorError::Config(_))));
}

#[test]
fn output_dir_placeholder_is_carried() {
    let tmp = tempdir().unwrap();
    write_manifest(tmp.path(), &manifest());
    let opts = LoadOptions {
        output_dir: Some(tmp.path().join("out")),
    };
    let cp = Checkpoint::load(tmp.path().join("checkpoint.json"), &opts).unwrap();
    assert_eq!(cp.output_dir(), Some(tmp.path().join("out").as_path()));
}

#[test]
fn missing_checkpoint_is_load_error() {
    let tmp = tempdir().unwrap();
    let err = Checkpoint::load(tmp.path().join("nope.json"), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, SeparatorError::Load { .. }), "got {err:?}");
}

#[test]
fn corrupted_manifest_is_load_error() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("checkpoint.json"), "{ \"backend\": \"unity\", ").unwrap();
    let err = Checkpoint::load(tmp.path(), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, SeparatorError::Load { .. }), "got {err:?}");
}

#[test]
fn missing_chunk_shape_is_config_error() {
    let tmp = tempdir().unwrap();
    let mut body = manifest();
    body.as_object_mut().unwrap().remove("chunk_shape");
    write_manifest(tmp.path(), &body);

    let err = Checkpoint::load(tmp.path(), &LoadOptions::default()).unwrap_err();
    match err {
        SeparatorError::Config(msg) => assert!(msg.contains("chunk_shape"), "{msg}"),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn missing_sampling_rate_is_config_error() {
    let tmp = tempdir().unwrap();
    let mut body = manifest();
    body["config"].as_object_mut().unwrap().remove("sampling_rate");
    write_manifest(tmp.path(), &body);

    let err = Checkpoint::load(tmp.path(), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, SeparatorError::Config(ref m) if m.contains("sampling_rate")));
}

#[test]
fn scaling_without_shift_is_config_error() {
    let tmp = tempdir().unwrap();
    let mut body = manifest();
    body["config"].as_object_mut().unwrap().remove("shift");
    write_manifest(tmp.path(), &body);

    let err = Checkpoint::load(tmp.path(), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, SeparatorError::Config(ref m) if m.contains("shift")));
}

#[test]
fn chunk_frequency_must_match_fft_size() {
    let tmp = tempdir().unwrap();
    let mut body = manifest();
    body["chunk_shape"] = json!([1, 256, 200]);
    write_manifest(tmp.path(), &body);

    let err = Checkpoint::load(tmp.path(), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, SeparatorError::Config(_)));
}

#[test]
fn unknown_backend_is_load_error() {
    let tmp = tempdir().unwrap();
    let mut body = manifest();
    body["backend"] = json!("tensorflow");
    write_manifest(tmp.path(), &body);

    let err = Checkpoint::load(tmp.path(), &LoadOptions::default()).unwrap_err();
    assert!(err.to_string().contains("unknown backend"), "{err}");
}

#[test]
fn artifact_checksum_mismatch_is_load_error() {
    let tmp = tempdir().unwrap();
    let payload = b"not really a model";
    fs::write(tmp.path().join("model.bin"), payload).unwrap();

    let mut bad_sha = sha256_hex(payload);
    let first = &bad_sha[0..1];
    bad_sha.replace_range(0..1, if first == "a" { "b" } else { "a" });

    let mut body = manifest();
    body["artifact"] = json!({ "file": "model.bin", "sha256": bad_sha });
    write_manifest(tmp.path(), &body);

    let err = Checkpoint::load(tmp.path(), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, SeparatorError::Load { .. }));
    assert!(err.to_string().to_lowercase().contains("checksum"), "{err}");
}

#[test]
fn matching_artifact_checksum_loads() {
    let tmp = tempdir().unwrap();
    let payload = b"not really a model";
    fs::write(tmp.path().join("model.bin"), payload).unwrap();

    let mut body = manifest();
    body["artifact"] = json!({
        "file": "model.bin",
        "sha256": sha256_hex(payload),
        "size_bytes": payload.len()
    });
    write_manifest(tmp.path(), &body);

    assert!(Checkpoint::load(tmp.path(), &LoadOptions::default()).is_ok());
}

#[test]
fn missing_artifact_is_load_error() {
    let tmp = tempdir().unwrap();
    let mut body = manifest();
    body["artifact"] = json!({ "file": "gone.onnx" });
    write_manifest(tmp.path(), &body);

    let err = Checkpoint::load(tmp.path(), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, SeparatorError::Load { .. }));
}

#[cfg(not(feature = "onnx"))]
#[test]
fn onnx_backend_needs_feature() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("model.onnx"), b"graph").unwrap();
    let mut body = manifest();
    body["backend"] = json!("onnx");
    body["artifact"] = json!({ "file": "model.onnx" });
    write_manifest(tmp.path(), &body);

    let err = Checkpoint::load(tmp.path(), &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, SeparatorError::Load { .. }));
}

#[test]
fn class_names_with_path_separators_are_rejected() {
    for bad in ["../escape", "a/b", "a\\b", ".."] {
        let tmp = tempdir().unwrap();
        let mut body = manifest();
        body["classes"] = json!(["speech", bad]);
        write_manifest(tmp.path(), &body);

        let err = Checkpoint::load(tmp.path(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, SeparatorError::Config(_)), "{bad}: got {err:?}");
    }
}
