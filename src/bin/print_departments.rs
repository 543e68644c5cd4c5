use anyhow::{Context, Result};
use clap::Parser;
use pprogramist_db::config;
use pprogramist_db::db;
use serde_json::to_string_pretty;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Print every department with its customers, courses, vacancies and news as JSON"
)]
struct Args {
    /// Path to YAML config file (reads only `database`)
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Only print the department with this id
    #[arg(long)]
    id: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let pool = db::init_pool(&cfg.database.clone().with_env_override()).await?;

    let ids: Vec<i64> = match args.id {
        Some(id) => vec![id],
        None => db::list_departments(&pool)
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect(),
    };

    let mut trees = Vec::with_capacity(ids.len());
    for id in ids {
        trees.push(db::department_tree(&pool, id).await?);
    }
    println!("{}", to_string_pretty(&trees)?);

    db::close_pool(pool).await;
    Ok(())
}
