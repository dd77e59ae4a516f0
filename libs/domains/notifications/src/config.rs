//! Engine configuration.

use core_config::{env_or_default, env_parse_or, env_required, ConfigError, FromEnv};

use crate::personalizer::Personalizer;
use crate::templates::RenderSettings;

/// Sender identity, portal links and send concurrency.
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub from_email: String,
    pub from_name: String,
    pub reply_to: Option<String>,
    /// Base URL of the portal, without a trailing slash.
    pub portal_url: String,
    /// Upper bound on in-flight provider calls per partition.
    pub max_concurrency: usize,
}

impl NotifierConfig {
    pub fn new(from_email: impl Into<String>, portal_url: impl Into<String>) -> Self {
        Self {
            from_email: from_email.into(),
            from_name: "Coalition Portal".to_string(),
            reply_to: None,
            portal_url: portal_url.into().trim_end_matches('/').to_string(),
            max_concurrency: 4,
        }
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn account_settings_url(&self) -> String {
        format!("{}/settings/notifications", self.portal_url)
    }

    pub fn unsubscribe_url(&self) -> String {
        format!("{}/unsubscribe", self.portal_url)
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            portal_url: self.portal_url.clone(),
            brand_name: self.from_name.clone(),
        }
    }

    pub fn personalizer(&self) -> Personalizer {
        Personalizer::new(self.account_settings_url(), self.unsubscribe_url())
    }
}

impl FromEnv for NotifierConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let portal_url = env_or_default("PORTAL_URL", "http://localhost:3000");
        let reply_to = std::env::var("NOTIFY_REPLY_TO")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(Self {
            from_email: env_required("NOTIFY_FROM_EMAIL")?,
            from_name: env_or_default("NOTIFY_FROM_NAME", "Coalition Portal"),
            reply_to,
            portal_url: portal_url.trim_end_matches('/').to_string(),
            max_concurrency: env_parse_or("NOTIFY_MAX_CONCURRENCY", 4usize)?.max(1),
        })
    }
}
