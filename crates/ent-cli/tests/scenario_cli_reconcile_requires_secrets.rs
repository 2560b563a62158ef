//! `ent reconcile` must fail before touching any store when the configured
//! URL env vars are unset, naming the variable but not leaking anything.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

const ANALYTICS_VAR: &str = "ENT_TEST_UNSET_ANALYTICS_URL_7F3A";
const LMS_VAR: &str = "ENT_TEST_UNSET_LMS_URL_7F3A";

#[test]
fn reconcile_without_store_urls_fails_with_secrets_missing() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let cfg = dir.path().join("stores.yaml");
    fs::write(
        &cfg,
        format!(
            "stores:\n  analytics:\n    url_env: \"{ANALYTICS_VAR}\"\n  transactional:\n    url_env: \"{LMS_VAR}\"\n"
        ),
    )?;

    let exports = dir.path().join("exports");
    Command::cargo_bin("ent")?
        .env_remove(ANALYTICS_VAR)
        .env_remove(LMS_VAR)
        .args([
            "reconcile",
            "--config",
            cfg.to_str().unwrap(),
            "--exports-root",
            exports.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SECRETS_MISSING command=reconcile"))
        .stderr(predicate::str::contains(ANALYTICS_VAR));

    // Nothing is written on failure.
    assert!(!exports.exists());
    Ok(())
}

#[test]
fn db_status_without_store_urls_fails() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let cfg = dir.path().join("stores.yaml");
    fs::write(
        &cfg,
        format!(
            "stores:\n  analytics:\n    url_env: \"{ANALYTICS_VAR}\"\n  transactional:\n    url_env: \"{LMS_VAR}\"\n"
        ),
    )?;

    Command::cargo_bin("ent")?
        .env_remove(ANALYTICS_VAR)
        .env_remove(LMS_VAR)
        .args(["db", "status", "--config", cfg.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SECRETS_MISSING command=db status"));
    Ok(())
}

#[test]
fn api_get_rejects_malformed_query_before_any_request() -> anyhow::Result<()> {
    Command::cargo_bin("ent")?
        .args(["api", "get", "enterprise/v1/enterprise-customer/", "--query", "novalue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected key=value"));
    Ok(())
}

#[test]
fn reconcile_rejects_customer_id_that_is_not_a_uuid() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let exports = dir.path().join("exports");
    Command::cargo_bin("ent")?
        .env_remove(ANALYTICS_VAR)
        .env_remove(LMS_VAR)
        .args([
            "reconcile",
            "--enterprise-customer",
            "acme",
            "--exports-root",
            exports.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--enterprise-customer is not a valid UUID"));

    assert!(!exports.exists());
    Ok(())
}
