use std::env;
use std::path::PathBuf;

use actix_web::{App, HttpServer, web};
use anyhow::Context;
use clap::Parser;
use sitecheck_core::data::Storage;
use sitecheck_probe::Prober;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sitecheck", version, about = "On-demand SEO metadata checks for submitted URLs")]
struct Args {
    /// Address to listen on (falls back to BIND_ADDR, then 127.0.0.1:8080)
    #[arg(long)]
    bind: Option<String>,

    /// SQLite database path (falls back to DATABASE_URL, then sitecheck.db)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Page fetch timeout in seconds
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    /// User-agent header sent with page fetches
    #[arg(long)]
    user_agent: Option<String>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let bind = args
        .bind
        .or_else(|| env::var("BIND_ADDR").ok())
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());
    let database = args
        .database
        .or_else(|| env::var("DATABASE_URL").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("sitecheck.db"));

    let storage = Storage::open(&database)
        .with_context(|| format!("failed to open database at {}", database.display()))?;
    let prober = match args.user_agent {
        Some(ua) => Prober::with_settings(args.timeout, &ua),
        None => Prober::with_timeout(args.timeout),
    };

    info!(bind = %bind, database = %database.display(), "starting sitecheck");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(storage.clone()))
            .app_data(web::Data::new(prober.clone()))
            .configure(sitecheck::configure)
    })
    .bind(&bind)
    .with_context(|| format!("failed to bind {bind}"))?
    .run()
    .await?;

    Ok(())
}
