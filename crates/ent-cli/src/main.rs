use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ent")]
#[command(about = "Enterprise enrollment reconciliation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find enterprise learners whose course enrollments were never linked
    /// to their enterprise, and export them as CSV.
    Reconcile {
        /// Restrict every query to one enterprise customer (UUID)
        #[arg(short = 'e', long = "enterprise-customer")]
        enterprise_customer: Option<String>,

        /// Layered config paths in merge order (applied over built-in defaults)
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Override exports.root from config
        #[arg(long = "exports-root")]
        exports_root: Option<String>,

        /// Also export enrollments created before the learner joined the enterprise
        #[arg(long = "include-incidental", default_value_t = false)]
        include_incidental: bool,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Store connectivity commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// LMS REST API commands
    Api {
        #[command(subcommand)]
        cmd: ApiCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Ping both stores.
    Status {
        #[arg(long = "config")]
        config_paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ApiCmd {
    /// GET an endpoint under <root_url>/api/ and print the JSON.
    Get {
        /// Endpoint path, e.g. enterprise/v1/enterprise-customer/
        path: String,

        /// Query parameter as key=value (repeatable)
        #[arg(long = "query")]
        query: Vec<String>,

        /// Follow `next` links and print the concatenated `results`
        #[arg(long, default_value_t = false)]
        all: bool,

        #[arg(long = "config")]
        config_paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Reconcile {
            enterprise_customer,
            config_paths,
            exports_root,
            include_incidental,
        } => {
            commands::reconcile::run_reconcile(commands::reconcile::ReconcileArgs {
                enterprise_customer,
                config_paths,
                exports_root,
                include_incidental,
            })
            .await?;
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = ent_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Db { cmd } => match cmd {
            DbCmd::Status { config_paths } => commands::db::db_status(config_paths).await?,
        },

        Commands::Api { cmd } => match cmd {
            ApiCmd::Get {
                path,
                query,
                all,
                config_paths,
            } => commands::api::api_get(&path, &query, all, config_paths).await?,
        },
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
