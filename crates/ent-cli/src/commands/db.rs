//! `ent db status`

use anyhow::{Context, Result};
use ent_config::{resolve_store_secrets, ConfigUse};
use ent_db::{SqlGateway, StoreUrls};

use super::{load_config, warn_unused_keys};

pub async fn db_status(config_paths: Vec<String>) -> Result<()> {
    let loaded = load_config(&config_paths)?;
    warn_unused_keys(ConfigUse::DbStatus, &loaded)?;
    let secrets = resolve_store_secrets(&loaded.config_json, "db status")?;

    let gateway = SqlGateway::connect(&StoreUrls {
        analytics: secrets.analytics_url,
        transactional: secrets.transactional_url,
    })
    .await
    .context("connect to stores failed")?;
    let status = gateway.ping().await;
    gateway.close().await;
    let status = status.context("store ping failed")?;

    println!(
        "analytics_ok={} transactional_ok={}",
        status.analytics_ok, status.transactional_ok
    );
    Ok(())
}
