//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only **env var NAMES** (e.g. `"ENT_LMS_DATABASE_URL"`).
//! - Commands resolve once at startup and pass the resolved structs into
//!   constructors; no other crate calls `std::env::var` for credentials.
//! - `Debug` impls on secret-containing structs **redact** values.
//! - Error messages name the env var, never the value.
//!
//! # Requirements by command
//! | Command      | Required                                         |
//! |--------------|--------------------------------------------------|
//! | reconcile    | analytics URL, transactional URL                 |
//! | db status    | analytics URL, transactional URL                 |
//! | api get      | LMS root URL, OAuth host, client id, client secret |

use anyhow::{bail, Result};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Store connection URLs. **Redacted in `Debug`.**
#[derive(Clone)]
pub struct ResolvedStoreSecrets {
    pub analytics_url: String,
    pub transactional_url: String,
}

impl std::fmt::Debug for ResolvedStoreSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedStoreSecrets")
            .field("analytics_url", &"<REDACTED>")
            .field("transactional_url", &"<REDACTED>")
            .finish()
    }
}

/// LMS REST API endpoint + OAuth client credentials. Hosts are not secret;
/// the client credentials are **redacted in `Debug`**.
#[derive(Clone)]
pub struct ResolvedLmsApiSecrets {
    pub root_url: String,
    pub oauth_host: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ResolvedLmsApiSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedLmsApiSecrets")
            .field("root_url", &self.root_url)
            .field("oauth_host", &self.oauth_host)
            .field("client_id", &"<REDACTED>")
            .field("client_secret", &"<REDACTED>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Non-empty trimmed string at `pointer`, or `None`.
fn read_str_at(config: &Value, pointer: &str) -> Option<String> {
    let s = config.pointer(pointer)?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// `None` if unset or blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn env_name(config: &Value, pointer: &str, fallback: &str) -> String {
    read_str_at(config, pointer).unwrap_or_else(|| fallback.to_string())
}

fn require(var_name: &str, what: &str, command: &str) -> Result<String> {
    match resolve_env(var_name) {
        Some(v) => Ok(v),
        None => bail!(
            "SECRETS_MISSING command={command}: required env var '{var_name}' \
             ({what}) is not set or empty"
        ),
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Resolve both store URLs. `command` only labels the error.
pub fn resolve_store_secrets(config_json: &Value, command: &str) -> Result<ResolvedStoreSecrets> {
    let analytics_var = env_name(
        config_json,
        "/stores/analytics/url_env",
        "ENT_ANALYTICS_DATABASE_URL",
    );
    let transactional_var = env_name(
        config_json,
        "/stores/transactional/url_env",
        "ENT_LMS_DATABASE_URL",
    );
    Ok(ResolvedStoreSecrets {
        analytics_url: require(&analytics_var, "analytics store url", command)?,
        transactional_url: require(&transactional_var, "transactional store url", command)?,
    })
}

pub fn resolve_lms_api_secrets(config_json: &Value) -> Result<ResolvedLmsApiSecrets> {
    let command = "api";
    let root_var = env_name(config_json, "/lms_api/root_url_env", "LMS_ROOT_URL");
    let oauth_var = env_name(config_json, "/lms_api/oauth_host_env", "LMS_OAUTH_HOST");
    let id_var = env_name(config_json, "/lms_api/client_id_env", "LMS_CLIENT_ID");
    let secret_var = env_name(config_json, "/lms_api/client_secret_env", "LMS_CLIENT_SECRET");
    Ok(ResolvedLmsApiSecrets {
        root_url: require(&root_var, "LMS root url", command)?,
        oauth_host: require(&oauth_var, "OAuth host", command)?,
        client_id: require(&id_var, "OAuth client id", command)?,
        client_secret: require(&secret_var, "OAuth client secret", command)?,
    })
}
