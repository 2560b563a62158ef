use anyhow::{bail, Result};
use serde_json::Value;

pub const DEFAULT_EXPORTS_ROOT: &str = "../exports";
const DEFAULT_KEY_BATCH_SIZE: usize = 500;

/// Typed view of the `reconcile` + `exports` sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSettings {
    pub key_batch_size: usize,
    pub exclude_incidental: bool,
    pub exports_root: String,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            key_batch_size: DEFAULT_KEY_BATCH_SIZE,
            exclude_incidental: true,
            exports_root: DEFAULT_EXPORTS_ROOT.to_string(),
        }
    }
}

impl ReconcileSettings {
    /// Absent keys take defaults; present keys of the wrong type are errors.
    pub fn from_config_json(config: &Value) -> Result<Self> {
        let mut out = Self::default();

        if let Some(v) = config.pointer("/reconcile/key_batch_size") {
            match v.as_u64() {
                Some(n) if n > 0 => out.key_batch_size = n as usize,
                _ => bail!("CONFIG_INVALID /reconcile/key_batch_size must be a positive integer"),
            }
        }

        if let Some(v) = config.pointer("/reconcile/exclude_incidental") {
            match v.as_bool() {
                Some(b) => out.exclude_incidental = b,
                None => bail!("CONFIG_INVALID /reconcile/exclude_incidental must be a boolean"),
            }
        }

        if let Some(v) = config.pointer("/exports/root") {
            match v.as_str().map(str::trim) {
                Some(s) if !s.is_empty() => out.exports_root = s.to_string(),
                _ => bail!("CONFIG_INVALID /exports/root must be a non-empty string"),
            }
        }

        Ok(out)
    }
}
