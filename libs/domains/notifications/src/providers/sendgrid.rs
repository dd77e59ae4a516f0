//! SendGrid email provider implementation.

use super::{EmailProvider, OutgoingEmail, SentEmail};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use core_config::{env_or_default, env_required, ConfigError, FromEnv};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_API_URL: &str = "https://api.sendgrid.com/v3";

/// SendGrid API configuration.
#[derive(Debug, Clone)]
pub struct SendGridConfig {
    /// SendGrid API key.
    pub api_key: String,
    /// SendGrid API base URL (defaults to production).
    pub api_url: String,
}

impl SendGridConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl FromEnv for SendGridConfig {
    /// Reads `SENDGRID_API_KEY` (required) and `SENDGRID_API_URL`.
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: env_required("SENDGRID_API_KEY")?,
            api_url: env_or_default("SENDGRID_API_URL", DEFAULT_API_URL),
        })
    }
}

/// SendGrid email provider.
pub struct SendGridProvider {
    config: SendGridConfig,
    client: Client,
}

impl SendGridProvider {
    pub fn new(config: SendGridConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    pub fn from_env() -> NotificationResult<Self> {
        Ok(Self::new(SendGridConfig::from_env()?))
    }
}

// SendGrid API request/response structures

#[derive(Debug, Serialize)]
struct SendGridRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: EmailAddress<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<EmailAddress<'a>>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<EmailAddress<'a>>,
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendGridError {
    errors: Vec<SendGridErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct SendGridErrorDetail {
    message: String,
}

fn build_request(email: &OutgoingEmail) -> SendGridRequest<'_> {
    // SendGrid requires text/plain before text/html and rejects empty values.
    let mut content = Vec::with_capacity(2);
    if !email.text_body.is_empty() {
        content.push(Content {
            content_type: "text/plain",
            value: &email.text_body,
        });
    }
    content.push(Content {
        content_type: "text/html",
        value: &email.html_body,
    });

    SendGridRequest {
        personalizations: vec![Personalization {
            to: vec![EmailAddress {
                email: &email.to,
                name: None,
            }],
        }],
        from: EmailAddress {
            email: &email.from_email,
            name: Some(email.from_name.as_str()).filter(|n| !n.is_empty()),
        },
        reply_to: email.reply_to.as_deref().map(|addr| EmailAddress {
            email: addr,
            name: None,
        }),
        subject: &email.subject,
        content,
    }
}

#[async_trait]
impl EmailProvider for SendGridProvider {
    async fn send(&self, email: &OutgoingEmail) -> NotificationResult<SentEmail> {
        let request = build_request(email);

        debug!(
            to = %email.to,
            subject = %email.subject,
            has_reply_to = email.reply_to.is_some(),
            "Sending email via SendGrid"
        );

        let response = self
            .client
            .post(format!("{}/mail/send", self.config.api_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if status.is_success() {
            debug!(to = %email.to, message_id = ?message_id, "SendGrid accepted email");
            return Ok(SentEmail { message_id });
        }

        let error_body = response.text().await.unwrap_or_default();
        warn!(to = %email.to, status = %status, "SendGrid rejected email");

        let error_message = match serde_json::from_str::<SendGridError>(&error_body) {
            Ok(sg_error) => sg_error
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join(", "),
            Err(_) => error_body,
        };

        Err(NotificationError::Provider(format!(
            "SendGrid error ({}): {}",
            status, error_message
        )))
    }

    fn name(&self) -> &'static str {
        "SendGrid"
    }

    async fn health_check(&self) -> NotificationResult<bool> {
        // No dedicated health endpoint; validate the key shape instead.
        if self.config.api_key.starts_with("SG.") {
            Ok(true)
        } else {
            Err(NotificationError::Config(
                "Invalid SendGrid API key format".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(text: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: "member@x.org".to_string(),
            subject: "Hi".to_string(),
            html_body: "<p>Hi</p>".to_string(),
            text_body: text.to_string(),
            from_email: "noreply@portal.org".to_string(),
            from_name: "Coalition Portal".to_string(),
            reply_to: Some("staff@portal.org".to_string()),
        }
    }

    #[test]
    fn test_request_orders_text_before_html() {
        let outgoing = email("Hi");
        let json = serde_json::to_value(build_request(&outgoing)).unwrap();
        assert_eq!(json["content"][0]["type"], "text/plain");
        assert_eq!(json["content"][1]["type"], "text/html");
        assert_eq!(json["reply_to"]["email"], "staff@portal.org");
        assert_eq!(json["from"]["name"], "Coalition Portal");
    }

    #[test]
    fn test_request_skips_empty_text_part() {
        let outgoing = email("");
        let json = serde_json::to_value(build_request(&outgoing)).unwrap();
        assert_eq!(json["content"].as_array().unwrap().len(), 1);
        assert_eq!(json["content"][0]["type"], "text/html");
    }

    #[test]
    fn test_sendgrid_config_from_env() {
        temp_env::with_vars(
            [("SENDGRID_API_KEY", Some("SG.key")), ("SENDGRID_API_URL", None::<&str>)],
            || {
                let config = SendGridConfig::from_env().unwrap();
                assert_eq!(config.api_key, "SG.key");
                assert_eq!(config.api_url, DEFAULT_API_URL);
            },
        );
    }

    #[tokio::test]
    async fn test_health_check_rejects_malformed_key() {
        let provider = SendGridProvider::new(SendGridConfig::new("nope".to_string()));
        assert!(provider.health_check().await.is_err());
    }
}
