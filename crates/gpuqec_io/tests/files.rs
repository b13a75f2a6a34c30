use gpuqec_core::registry::RegistryError;
use gpuqec_core::validate::SignatureError;
use gpuqec_io::loader::{load_b8_file, pack_shots, slice_shots, write_b8_file};
use gpuqec_io::load_manifest;
use std::fs;
use tempfile::TempDir;

const MANIFEST: &str = r#"
[[module]]
name = "Decoder"
file = "cudaq-qec"
config = "decoder.yaml"

[[module.function]]
name = "enqueue_syndromes_ui64"
signature = "(self: Decoder @inout, decoder_id: int, syndrome_size: int, syndrome: int, tag: int) -> None"
call_id = "hash"

[[module.function]]
name = "get_corrections_ui64"
signature = "(self: Decoder @inout, decoder_id: int, return_size: int, reset: int) -> int"
call_id = "hash"

[[module.function]]
name = "reset_decoder_ui64"
signature = "(self: Decoder @inout, decoder_id: int) -> None"
call_id = "hash"
"#;

#[test]
fn manifest_from_disk_registers_decoder() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("decoder.toml");
    fs::write(&path, MANIFEST).unwrap();

    let registry = load_manifest(&path).unwrap().into_registry().unwrap();
    let decoder = registry.module("Decoder").unwrap();
    assert_eq!(decoder.def.gpu_config.as_deref(), Some("decoder.yaml"));
    assert_eq!(decoder.functions.len(), 3);
    for f in &decoder.functions {
        assert!(f.op.is_some(), "{} is not a decoder op", f.name);
        assert_eq!(registry.by_call_id(f.call_id.unwrap()), Some(f));
    }
}

#[test]
fn diagnostics_point_into_the_manifest() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.toml");
    fs::write(
        &path,
        r#"[[module]]
name = "Decoder"
file = "cudaq-qec"

[[module.function]]
name = "lost_handle"
signature = "(decoder_id: int) -> int"

[[module.function]]
name = "bad_return"
signature = "(self: Decoder @inout) -> (int, int)"
"#,
    )
    .unwrap();

    let err = load_manifest(&path)
        .unwrap()
        .into_registry()
        .unwrap_err()
        .downcast::<RegistryError>()
        .unwrap();
    let RegistryError::Invalid(diags) = err else {
        panic!("expected invalid declarations, got {err}");
    };
    assert_eq!(diags.len(), 2);
    assert!(matches!(diags[0].error, SignatureError::FirstArgNotModule { .. }));
    assert!(matches!(diags[1].error, SignatureError::UnconvertibleType { .. }));

    let loc = diags[0].location.as_ref().unwrap();
    assert_eq!(loc.file, path.display().to_string());
    assert_eq!(loc.line, 6);
    assert_eq!(diags[1].location.as_ref().unwrap().line, 10);
}

#[test]
fn missing_manifest_reports_path() {
    let tmp = TempDir::new().unwrap();
    let err = load_manifest(tmp.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn b8_files_round_trip_through_disk() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("shots.b8");
    let shots = vec![
        vec![true, false, true, true, false, false, false, false, true, true],
        vec![false; 10],
        vec![true; 10],
    ];
    write_b8_file(&path, &shots).unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len(), 6);

    let raw = load_b8_file(&path).unwrap();
    assert_eq!(slice_shots(&raw, 10), shots);
    assert_eq!(
        pack_shots(&raw, 10).unwrap(),
        vec![0b10_1100_0011, 0, 0b11_1111_1111]
    );
}
