use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail service answered {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub website_name: String,
    /// HTML body.
    pub message: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Posts the email as JSON to `{base}/sendMail`.
pub struct HttpMailer {
    base_url: String,
    client: reqwest::Client,
}

impl HttpMailer {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let url = format!("{}/sendMail", self.base_url);
        let response = self.client.post(&url).json(email).send().await?;

        if !response.status().is_success() {
            return Err(MailError::Status(response.status()));
        }
        Ok(())
    }
}
