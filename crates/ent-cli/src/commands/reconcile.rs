//! `ent reconcile`

use anyhow::{Context, Result};
use chrono::Local;
use ent_artifacts::{write_report, WriteReportArgs};
use ent_config::{resolve_store_secrets, ConfigUse};
use ent_db::{SqlGateway, StoreUrls};
use ent_reconcile::{run_pipeline, CustomerScope, PipelineOptions};
use std::path::Path;
use tracing::info;

use super::{load_config, warn_unused_keys};

pub struct ReconcileArgs {
    pub enterprise_customer: Option<String>,
    pub config_paths: Vec<String>,
    pub exports_root: Option<String>,
    pub include_incidental: bool,
}

pub async fn run_reconcile(args: ReconcileArgs) -> Result<()> {
    let started_at = Local::now().naive_local();
    let scope = CustomerScope::from_option(args.enterprise_customer)
        .context("--enterprise-customer is not a valid UUID")?;

    let loaded = load_config(&args.config_paths)?;
    warn_unused_keys(ConfigUse::Reconcile, &loaded)?;
    let settings = loaded.reconcile_settings()?;

    let secrets = resolve_store_secrets(&loaded.config_json, "reconcile")?;
    let urls = StoreUrls {
        analytics: secrets.analytics_url,
        transactional: secrets.transactional_url,
    };

    let opts = PipelineOptions {
        scope,
        key_batch_size: settings.key_batch_size,
    };
    let exclude_incidental = settings.exclude_incidental && !args.include_incidental;
    let exports_root = args.exports_root.unwrap_or(settings.exports_root);

    info!(
        scope = %opts.scope,
        config_hash = %loaded.config_hash,
        exclude_incidental,
        "reconcile start"
    );

    let gateway = SqlGateway::connect(&urls)
        .await
        .context("connect to stores failed")?;
    let outcome = run_pipeline(&gateway, &opts).await;
    gateway.close().await;
    let report = outcome.context("reconciliation failed")?;

    let summary = report.summary();
    let written = write_report(WriteReportArgs {
        exports_root: Path::new(&exports_root),
        started_at,
        exclude_incidental,
        learners: report.learners.values(),
    })?;

    info!(
        config_hash = %loaded.config_hash,
        export_csv = %written.export_csv_path.display(),
        rows = written.rows,
        summary = %serde_json::to_string(&summary).context("serialize summary failed")?,
        "reconcile summary"
    );

    println!("export_csv={}", written.export_csv_path.display());
    println!("learners={}", report.learners.len());
    println!("rows={}", written.rows);
    Ok(())
}
