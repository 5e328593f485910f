//! One-shot reminder: emails today's pending tasks, if any.
//!
//! Usage: cargo run --bin remind
//!        cargo run --bin remind -- --config daytasks.toml
//!
//! Prints the same JSON reply as `/api/check-tasks` and exits non-zero when
//! the job fails.

mod config;
mod date_key;
mod mail;
mod reminder;
mod store;
mod task;

use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt;

use crate::config::AppConfig;
use crate::mail::HttpMailer;
use crate::reminder::ReminderJob;
use crate::store::HttpTaskStore;

#[derive(Parser, Debug)]
#[command(name = "remind")]
#[command(about = "Email a reminder when today's tasks are not all done")]
struct Args {
    /// TOML settings file, read before .env and the environment
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(config::log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;

    let job = ReminderJob::new(
        Arc::new(HttpTaskStore::new(config.store_url.clone(), config.user_id.clone())),
        Arc::new(HttpMailer::new(config.mail_url.clone())),
        config.reminder.clone(),
    );

    let response = job.respond().await;
    println!("{}", serde_json::to_string(&response.body)?);

    if !response.status.is_success() {
        bail!("reminder job failed with status {}", response.status);
    }
    Ok(())
}
