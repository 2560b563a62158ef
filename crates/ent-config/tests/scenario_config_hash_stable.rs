//! Config hash stability.
//!
//! GREEN when:
//! - Same inputs produce the same hash.
//! - Key order inside YAML does not change the hash.
//! - A changed value changes the hash.
//! - Overlays apply left to right on top of the built-in defaults.

use ent_config::{load_layered_yaml_from_strings, load_with_defaults, DEFAULT_CONFIG_YAML};
use std::io::Write;

const BASE_YAML: &str = r#"
reconcile:
  key_batch_size: 250
  exclude_incidental: true
exports:
  root: "/var/exports"
"#;

const BASE_YAML_REORDERED: &str = r#"
exports:
  root: "/var/exports"
reconcile:
  exclude_incidental: true
  key_batch_size: 250
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64, "sha256 hex");
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(original.config_hash, reordered.config_hash);
}

#[test]
fn changed_value_changes_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, "reconcile:\n  key_batch_size: 251\n"])
        .unwrap();
    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_file_wins_over_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "reconcile:\n  exclude_incidental: false").unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let loaded = load_with_defaults(&[path.as_str()]).unwrap();
    let settings = loaded.reconcile_settings().unwrap();
    assert!(!settings.exclude_incidental);
    // Untouched default survives the merge.
    assert_eq!(settings.key_batch_size, 500);

    let defaults_only = load_layered_yaml_from_strings(&[DEFAULT_CONFIG_YAML]).unwrap();
    assert_ne!(loaded.config_hash, defaults_only.config_hash);
    assert_eq!(
        load_with_defaults(&[]).unwrap().config_hash,
        defaults_only.config_hash
    );
}

#[test]
fn missing_file_names_the_path() {
    let err = load_with_defaults(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(err.to_string().contains("/definitely/not/here.yaml"));
}
