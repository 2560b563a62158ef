//! Store / API secret resolution.
//!
//! Failure tests use sentinel env var names that are never set anywhere, so
//! no test mutates a var another test reads.

use ent_config::{load_layered_yaml_from_strings, resolve_lms_api_secrets, resolve_store_secrets};

fn load(yaml: &str) -> serde_json::Value {
    load_layered_yaml_from_strings(&[yaml])
        .expect("test yaml must parse cleanly")
        .config_json
}

#[test]
fn missing_store_url_names_the_env_var() {
    let cfg = load(
        r#"
stores:
  analytics:
    url_env: "ENT_SENTINEL_ANALYTICS_URL_UNSET_A1"
  transactional:
    url_env: "ENT_SENTINEL_LMS_URL_UNSET_A1"
"#,
    );
    let msg = resolve_store_secrets(&cfg, "reconcile")
        .unwrap_err()
        .to_string();
    assert!(msg.contains("SECRETS_MISSING"), "got: {msg}");
    assert!(msg.contains("command=reconcile"), "got: {msg}");
    assert!(msg.contains("ENT_SENTINEL_ANALYTICS_URL_UNSET_A1"), "got: {msg}");
}

#[test]
fn resolved_store_urls_are_redacted_in_debug() {
    std::env::set_var("ENT_SENTINEL_ANALYTICS_URL_SET_B2", "postgres://u:hunter2@a/db");
    std::env::set_var("ENT_SENTINEL_LMS_URL_SET_B2", "mysql://u:hunter2@t/db");
    let cfg = load(
        r#"
stores:
  analytics:
    url_env: "ENT_SENTINEL_ANALYTICS_URL_SET_B2"
  transactional:
    url_env: "ENT_SENTINEL_LMS_URL_SET_B2"
"#,
    );
    let resolved = resolve_store_secrets(&cfg, "db status").unwrap();
    assert_eq!(resolved.analytics_url, "postgres://u:hunter2@a/db");
    assert_eq!(resolved.transactional_url, "mysql://u:hunter2@t/db");

    let debug = format!("{resolved:?}");
    assert!(!debug.contains("hunter2"), "Debug leaked a secret: {debug}");
    assert!(debug.contains("<REDACTED>"));
}

#[test]
fn api_secrets_fail_on_first_missing_var() {
    std::env::set_var("ENT_SENTINEL_ROOT_SET_C3", "https://lms.example.com");
    let cfg = load(
        r#"
lms_api:
  root_url_env: "ENT_SENTINEL_ROOT_SET_C3"
  oauth_host_env: "ENT_SENTINEL_OAUTH_UNSET_C3"
  client_id_env: "ENT_SENTINEL_ID_UNSET_C3"
  client_secret_env: "ENT_SENTINEL_SECRET_UNSET_C3"
"#,
    );
    let msg = resolve_lms_api_secrets(&cfg).unwrap_err().to_string();
    assert!(msg.contains("ENT_SENTINEL_OAUTH_UNSET_C3"), "got: {msg}");
    assert!(!msg.contains("lms.example.com"));
}

#[test]
fn api_client_credentials_are_redacted() {
    for (k, v) in [
        ("ENT_SENTINEL_ROOT_SET_D4", "https://lms.example.com"),
        ("ENT_SENTINEL_OAUTH_SET_D4", "https://auth.example.com"),
        ("ENT_SENTINEL_ID_SET_D4", "client-abc"),
        ("ENT_SENTINEL_SECRET_SET_D4", "s3cr3t-value"),
    ] {
        std::env::set_var(k, v);
    }
    let cfg = load(
        r#"
lms_api:
  root_url_env: "ENT_SENTINEL_ROOT_SET_D4"
  oauth_host_env: "ENT_SENTINEL_OAUTH_SET_D4"
  client_id_env: "ENT_SENTINEL_ID_SET_D4"
  client_secret_env: "ENT_SENTINEL_SECRET_SET_D4"
"#,
    );
    let resolved = resolve_lms_api_secrets(&cfg).unwrap();
    assert_eq!(resolved.client_secret, "s3cr3t-value");
    let debug = format!("{resolved:?}");
    assert!(debug.contains("lms.example.com"));
    assert!(!debug.contains("s3cr3t-value"));
    assert!(!debug.contains("client-abc"));
}
