//! Command handler modules for ent-cli.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod api;
pub mod db;
pub mod reconcile;

use anyhow::{bail, Result};
use ent_config::{
    load_layered_yaml_from_strings, report_unused_keys, ConfigUse, LoadedConfig, UnusedKeyPolicy,
    DEFAULT_CONFIG_YAML,
};
use tracing::warn;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Built-in defaults, then `--config` paths left to right.
pub fn load_config(config_paths: &[String]) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    ent_config::load_with_defaults(&path_refs)
}

/// Unused keys never block an operator command; they are logged. Built-in
/// default sections that belong to other commands are not reported.
pub fn warn_unused_keys(usage: ConfigUse, loaded: &LoadedConfig) -> Result<()> {
    let report = report_unused_keys(usage, &loaded.config_json, UnusedKeyPolicy::Warn)?;
    let defaults = load_layered_yaml_from_strings(&[DEFAULT_CONFIG_YAML])?;
    let baseline =
        report_unused_keys(usage, &defaults.config_json, UnusedKeyPolicy::Warn)?.unused_leaf_pointers;

    let unused: Vec<&String> = report
        .unused_leaf_pointers
        .iter()
        .filter(|p| !baseline.contains(p))
        .collect();
    if !unused.is_empty() {
        warn!(
            usage = %report.usage,
            unused_leaf_keys = unused.len(),
            "CONFIG_UNUSED_KEYS"
        );
        for p in unused.iter().take(50) {
            warn!(unused = %p, "unused config key");
        }
    }
    Ok(())
}

/// `key=value` pairs; the value may be empty, the key may not.
pub fn parse_query_pairs(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
            _ => bail!("invalid --query '{pair}'. expected key=value"),
        })
        .collect()
}
