//! Emails a summary of today's unfinished tasks.
//!
//! Runs without input, either behind `/api/check-tasks` for an external
//! scheduler or once from the `remind` binary. Reads go straight to the task
//! store: no cache, no seeding.

use axum::http::StatusCode;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use hypertext::prelude::*;
use serde::Serialize;
use std::sync::Arc;

use crate::config::ReminderConfig;
use crate::date_key::DateKey;
use crate::mail::{Email, MailError, Mailer};
use crate::store::{RemoteTaskStore, StoreError};
use crate::task::Task;

pub const NOTHING_PENDING_MESSAGE: &str = "No email needed. All tasks complete.";
pub const EMAIL_SENT_MESSAGE: &str = "Email sent successfully!";

#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Mail(#[from] MailError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderOutcome {
    NothingPending,
    EmailSent { pending: usize },
}

/// Body of the job's JSON reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReminderReply {
    Message { message: String },
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderResponse {
    pub status: StatusCode,
    pub body: ReminderReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLeft {
    pub hours: i64,
    pub minutes: i64,
}

pub struct ReminderJob {
    store: Arc<dyn RemoteTaskStore>,
    mailer: Arc<dyn Mailer>,
    settings: ReminderConfig,
    timezone: Tz,
}

impl ReminderJob {
    pub fn new(
        store: Arc<dyn RemoteTaskStore>,
        mailer: Arc<dyn Mailer>,
        settings: ReminderConfig,
    ) -> Self {
        let timezone = settings.timezone();
        Self {
            store,
            mailer,
            settings,
            timezone,
        }
    }

    /// Today is the server's local date.
    pub async fn run(&self) -> Result<ReminderOutcome, ReminderError> {
        let now = Utc::now();
        let today = now.with_timezone(&Local).date_naive();
        self.run_at(today, now).await
    }

    pub async fn run_at(
        &self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ReminderOutcome, ReminderError> {
        let key = DateKey::from_date(today);

        if self.settings.warm_up {
            self.store.warm_up(&key).await;
        }

        let tasks = self.store.get(&key).await?;
        let pending = pending_tasks(&tasks);

        if pending.is_empty() {
            tracing::info!(date = %key, "all tasks complete, no reminder sent");
            return Ok(ReminderOutcome::NothingPending);
        }

        let left = time_left_today(now, self.timezone);
        let email = Email {
            to: self.settings.to.clone(),
            subject: self.settings.subject.clone(),
            website_name: self.settings.website_name.clone(),
            message: render_email_body(&pending, left, &self.settings.site_url),
        };

        self.mailer.send(&email).await?;
        tracing::info!(date = %key, pending = pending.len(), "reminder email sent");

        Ok(ReminderOutcome::EmailSent {
            pending: pending.len(),
        })
    }

    /// Runs the job and turns every outcome, failures included, into a reply.
    pub async fn respond(&self) -> ReminderResponse {
        into_response(self.run().await)
    }
}

pub fn into_response(result: Result<ReminderOutcome, ReminderError>) -> ReminderResponse {
    match result {
        Ok(ReminderOutcome::NothingPending) => ReminderResponse {
            status: StatusCode::OK,
            body: ReminderReply::Message {
                message: NOTHING_PENDING_MESSAGE.to_string(),
            },
        },
        Ok(ReminderOutcome::EmailSent { .. }) => ReminderResponse {
            status: StatusCode::OK,
            body: ReminderReply::Message {
                message: EMAIL_SENT_MESSAGE.to_string(),
            },
        },
        Err(e) => {
            tracing::error!(error = %e, "reminder job failed");
            ReminderResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: ReminderReply::Error {
                    error: e.to_string(),
                },
            }
        }
    }
}

pub fn pending_tasks(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|task| !task.done).collect()
}

/// Whole hours and leftover minutes until 23:59:59 in `tz`.
pub fn time_left_today(now: DateTime<Utc>, tz: Tz) -> TimeLeft {
    let local_now = now.with_timezone(&tz);
    let end_of_day = local_now
        .date_naive()
        .and_hms_opt(23, 59, 59)
        .and_then(|end| tz.from_local_datetime(&end).earliest())
        .unwrap_or(local_now);

    let remaining = (end_of_day - local_now).max(chrono::TimeDelta::zero());

    TimeLeft {
        hours: remaining.num_hours(),
        minutes: remaining.num_minutes() % 60,
    }
}

pub fn render_email_body(pending: &[&Task], left: TimeLeft, site_url: &str) -> String {
    let time_left = format!("{} hours {} minutes", left.hours, left.minutes);

    maud! {
        h3 { "Today's tasks are not finished yet" }
        p { strong { "Still pending:" } }
        ul {
            @for task in pending {
                li { (task.text) }
            }
        }
        p { strong { "Time left today: " } (time_left) }
        a href=(site_url) { "Open the task list and mark them off" }
    }
    .render()
    .into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::HttpMailer;
    use crate::store::HttpTaskStore;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn noon_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn job_for(server: &MockServer) -> ReminderJob {
        let settings = ReminderConfig {
            to: "me@example.com".to_string(),
            warm_up: false,
            ..ReminderConfig::default()
        };
        ReminderJob::new(
            Arc::new(HttpTaskStore::new(format!("{}/api/task", server.uri()), "u1")),
            Arc::new(HttpMailer::new(server.uri())),
            settings,
        )
    }

    async fn store_returns(server: &MockServer, tasks: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/task/u1/19-9-2026"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tasks": tasks })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_time_left_in_india() {
        // 12:00 UTC is 17:30 in Kolkata
        let left = time_left_today(noon_utc(), chrono_tz::Asia::Kolkata);
        assert_eq!(left, TimeLeft { hours: 6, minutes: 29 });

        let last_second = Utc.with_ymd_and_hms(2026, 10, 19, 18, 29, 59).unwrap();
        let left = time_left_today(last_second, chrono_tz::Asia::Kolkata);
        assert_eq!(left, TimeLeft { hours: 0, minutes: 0 });

        let midnight = Utc.with_ymd_and_hms(2026, 10, 19, 18, 30, 0).unwrap();
        let left = time_left_today(midnight, chrono_tz::Asia::Kolkata);
        assert_eq!(left, TimeLeft { hours: 23, minutes: 59 });
    }

    #[test]
    fn test_email_body_escapes_task_text() {
        let task = Task::new("<script>alert(1)</script>");
        let body = render_email_body(&[&task], TimeLeft { hours: 1, minutes: 5 }, "https://x.test/");

        assert!(!body.contains("<script>"));
        assert!(body.contains("1 hours 5 minutes"));
        assert!(body.contains("https://x.test/"));
    }

    #[tokio::test]
    async fn test_only_pending_tasks_are_mailed() {
        let server = MockServer::start().await;
        store_returns(
            &server,
            json!([{ "text": "A", "done": false }, { "text": "B", "done": true }]),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/sendMail"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = job_for(&server).run_at(today(), noon_utc()).await.unwrap();
        assert_eq!(outcome, ReminderOutcome::EmailSent { pending: 1 });

        let requests = server.received_requests().await.unwrap();
        let mail = requests
            .iter()
            .find(|r| r.url.path() == "/sendMail")
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&mail.body).unwrap();

        assert_eq!(body["to"], "me@example.com");
        assert_eq!(body["subject"], "Reminder: Tasks Pending");
        assert_eq!(body["websiteName"], "Task Manager");
        let message = body["message"].as_str().unwrap();
        assert!(message.contains("<li>A</li>"));
        assert!(!message.contains("<li>B</li>"));
        assert!(message.contains("6 hours 29 minutes"));
    }

    #[tokio::test]
    async fn test_no_mail_when_everything_done() {
        let server = MockServer::start().await;
        store_returns(&server, json!([{ "text": "A", "done": true }])).await;
        Mock::given(method("POST"))
            .and(path("/sendMail"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let response = into_response(job_for(&server).run_at(today(), noon_utc()).await);

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(&response.body).unwrap(),
            json!({ "message": NOTHING_PENDING_MESSAGE })
        );
    }

    #[tokio::test]
    async fn test_empty_day_sends_nothing_and_seeds_nothing() {
        let server = MockServer::start().await;
        store_returns(&server, json!([])).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = job_for(&server).run_at(today(), noon_utc()).await.unwrap();
        assert_eq!(outcome, ReminderOutcome::NothingPending);
    }

    #[tokio::test]
    async fn test_store_failure_becomes_error_reply() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let response = into_response(job_for(&server).run_at(today(), noon_utc()).await);

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_value(&response.body).unwrap();
        assert!(body["error"].as_str().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_mail_failure_becomes_error_reply() {
        let server = MockServer::start().await;
        store_returns(&server, json!([{ "text": "A", "done": false }])).await;
        Mock::given(method("POST"))
            .and(path("/sendMail"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let response = into_response(job_for(&server).run_at(today(), noon_utc()).await);

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(response.body, ReminderReply::Error { .. }));
    }

    #[tokio::test]
    async fn test_warm_up_pings_store_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/task/u1/19-9-2026"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tasks": [] })))
            .expect(2)
            .mount(&server)
            .await;

        let settings = ReminderConfig {
            warm_up: true,
            ..ReminderConfig::default()
        };
        let job = ReminderJob::new(
            Arc::new(HttpTaskStore::new(format!("{}/api/task", server.uri()), "u1")),
            Arc::new(HttpMailer::new(server.uri())),
            settings,
        );

        job.run_at(today(), noon_utc()).await.unwrap();
    }
}
