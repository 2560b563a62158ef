use ent_config::{load_layered_yaml_from_strings, report_unused_keys, ConfigUse, UnusedKeyPolicy};

const YAML: &str = r#"
stores:
  analytics:
    url_env: "ENT_ANALYTICS_DATABASE_URL"
reconcile:
  key_batch_size: 100
  legacy_vertica_mode: true
unused_section:
  foo: 1
"#;

#[test]
fn warn_mode_reports_unused_keys_without_error() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let report = report_unused_keys(
        ConfigUse::Reconcile,
        &loaded.config_json,
        UnusedKeyPolicy::Warn,
    )
    .expect("warn mode must not error");

    assert!(!report.is_clean());
    assert_eq!(
        report.unused_leaf_pointers,
        vec![
            "/reconcile/legacy_vertica_mode".to_string(),
            "/unused_section/foo".to_string()
        ]
    );
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let err = report_unused_keys(
        ConfigUse::Reconcile,
        &loaded.config_json,
        UnusedKeyPolicy::Fail,
    )
    .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("CONFIG_UNUSED_KEYS"), "got: {msg}");
    assert!(msg.contains("usage=RECONCILE"), "got: {msg}");
}

#[test]
fn db_status_does_not_consume_reconcile_section() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let report = report_unused_keys(
        ConfigUse::DbStatus,
        &loaded.config_json,
        UnusedKeyPolicy::Warn,
    )
    .unwrap();
    assert!(report
        .unused_leaf_pointers
        .contains(&"/reconcile/key_batch_size".to_string()));
    assert!(!report
        .unused_leaf_pointers
        .contains(&"/stores/analytics/url_env".to_string()));
}
