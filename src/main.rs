//! Day-task web server: login gate, month calendar and per-day task modal.
//!
//! Usage: cargo run --bin daytasks
//!        cargo run --bin daytasks -- --config daytasks.toml --bind 127.0.0.1:3000

mod app;
mod cache;
mod calendar;
mod config;
mod date_key;
mod editor;
mod mail;
mod reminder;
mod session;
mod store;
mod task;
mod views;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::fmt;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "daytasks")]
#[command(about = "Serve the day-task calendar")]
struct Args {
    /// TOML settings file, read before .env and the environment
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address (overrides DAYTASKS_BIND)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(config::log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    fs::create_dir_all("static")?;

    let app = app::router(app::AppState::new(&config));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, store = %config.store_url, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
