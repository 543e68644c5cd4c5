use anyhow::{Context, Result};
use clap::Parser;
use pprogramist_db::config;
use pprogramist_db::db;
use pprogramist_db::seed::{self, ResetConfirmation};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Drop every table, recreate the schema and insert the starter departments and courses. DESTROYS ALL DATA."
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Confirm the reset without setting `reset.allow` or PPROGRAMIST_ALLOW_RESET.
    #[arg(long)]
    yes_destroy_data: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;

    let confirmation = if args.yes_destroy_data {
        ResetConfirmation::explicit()
    } else {
        ResetConfirmation::from_config(&cfg).inspect_err(|_| {
            error!(
                "refusing to reset: pass --yes-destroy-data, set reset.allow: true or {}=1",
                config::ALLOW_RESET_ENV
            )
        })?
    };

    let db_cfg = cfg.database.clone().with_env_override();
    let pool = db::init_pool(&db_cfg).await?;
    let report = seed::reset(&pool, confirmation).await?;
    info!(
        departments = report.departments,
        courses = report.courses,
        "reseed complete"
    );

    db::close_pool(pool).await;
    Ok(())
}
