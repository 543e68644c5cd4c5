use anyhow::{Context, Result};
use clap::Parser;
use pprogramist_db::{config, db};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Open the course catalogue database and apply any missing schema"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
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
    let db_cfg = cfg.database.clone().with_env_override();

    let pool = db::init_pool(&db_cfg).await?;
    db::schema::apply(&pool).await?;

    for (table, rows) in db::table_counts(&pool).await? {
        info!(table, rows, "table ready");
    }

    db::close_pool(pool).await;
    Ok(())
}
