//! `ent api get`

use anyhow::{Context, Result};
use ent_config::{resolve_lms_api_secrets, ConfigUse};
use ent_lms_client::{LmsApiClient, LmsApiConfig};
use serde_json::Value;

use super::{load_config, parse_query_pairs, warn_unused_keys};

pub async fn api_get(path: &str, query: &[String], all: bool, config_paths: Vec<String>) -> Result<()> {
    let query = parse_query_pairs(query)?;
    let loaded = load_config(&config_paths)?;
    warn_unused_keys(ConfigUse::ApiGet, &loaded)?;
    let secrets = resolve_lms_api_secrets(&loaded.config_json)?;

    let client = LmsApiClient::new(LmsApiConfig {
        root_url: secrets.root_url,
        oauth_host: secrets.oauth_host,
        client_id: secrets.client_id,
        client_secret: secrets.client_secret,
    });

    let body = if all {
        Value::Array(client.get_all(path, &query).await?)
    } else {
        client.get(path, &query).await?
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&body).context("serialize response failed")?
    );
    Ok(())
}
