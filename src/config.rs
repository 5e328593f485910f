use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use crate::task::default_task_texts;

/// Application settings. Built-in defaults, then an optional TOML file, then
/// `.env` and the process environment, each layer overriding the last.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Base URL of the task store, e.g. `https://example.com/api/task`.
    pub store_url: String,
    pub user_id: String,
    pub password: String,
    /// Base URL of the mail API; `/sendMail` is appended.
    pub mail_url: String,
    /// Tasks seeded into a day that has none yet.
    pub default_tasks: Vec<String>,
    pub reminder: ReminderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub to: String,
    pub subject: String,
    pub website_name: String,
    /// Linked from the email body.
    pub site_url: String,
    /// End of day is computed in this zone.
    pub timezone: String,
    /// Ping the store once before the real read.
    pub warm_up: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind_addr: "0.0.0.0:3000".to_string(),
            store_url: "http://localhost:8000/api/task".to_string(),
            user_id: "2313841".to_string(),
            password: "changeme".to_string(),
            mail_url: "http://localhost:8001".to_string(),
            default_tasks: default_task_texts(),
            reminder: ReminderConfig::default(),
        }
    }
}

impl Default for ReminderConfig {
    fn default() -> Self {
        ReminderConfig {
            to: "owner@example.com".to_string(),
            subject: "Reminder: Tasks Pending".to_string(),
            website_name: "Task Manager".to_string(),
            site_url: "http://localhost:3000/".to_string(),
            timezone: "Asia/Kolkata".to_string(),
            warm_up: true,
        }
    }
}

impl AppConfig {
    /// Load the layered configuration. `path` names an optional TOML file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                Self::from_toml(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => AppConfig::default(),
        };

        let dotenv: std::collections::HashMap<String, String> = dotenvy::from_filename_iter(".env")
            .and_then(|iter| iter.collect::<Result<_, _>>())
            .map(|mut map: std::collections::HashMap<String, String>| {
                map.extend(std::env::vars());
                map
            })
            .unwrap_or_default();
        config.apply_overrides(|key| {
            dotenv
                .get(key)
                .cloned()
                .or_else(|| std::env::var(key).ok())
        });

        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let targets: [(&str, &mut String); 10] = [
            ("DAYTASKS_BIND", &mut self.bind_addr),
            ("TASK_STORE_URL", &mut self.store_url),
            ("TASK_USER_ID", &mut self.user_id),
            ("LOGIN_PASSWORD", &mut self.password),
            ("MAIL_URL", &mut self.mail_url),
            ("REMINDER_TO", &mut self.reminder.to),
            ("REMINDER_SUBJECT", &mut self.reminder.subject),
            ("REMINDER_WEBSITE_NAME", &mut self.reminder.website_name),
            ("REMINDER_TIMEZONE", &mut self.reminder.timezone),
            ("SITE_URL", &mut self.reminder.site_url),
        ];

        for (key, slot) in targets {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }
    }
}

impl ReminderConfig {
    /// The configured zone, or UTC when the name is not a known zone.
    pub fn timezone(&self) -> Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            tracing::warn!(timezone = %self.timezone, "invalid timezone, falling back to UTC");
            chrono_tz::UTC
        })
    }
}

/// Log filter from `RUST_LOG`-style directives, or `info` when they are
/// missing or unparsable.
pub fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
