//! In-process provider that records mail instead of sending it.
//!
//! Backs the CLI `--dry-run` mode and the test suite.

use super::{EmailProvider, OutgoingEmail, SentEmail};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock email provider that captures sent emails
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    attempts: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that rejects mail to the given addresses.
    pub fn failing_for<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing: addresses.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Every accepted email, in send order.
    pub async fn sent_emails(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Every address `send` was called with, including failures.
    pub async fn attempts(&self) -> Vec<String> {
        self.attempts.lock().await.clone()
    }

    pub async fn was_sent_to(&self, address: &str) -> bool {
        self.sent.lock().await.iter().any(|e| e.to == address)
    }
}

#[async_trait]
impl EmailProvider for MockProvider {
    async fn send(&self, email: &OutgoingEmail) -> NotificationResult<SentEmail> {
        self.attempts.lock().await.push(email.to.clone());

        if self.failing.contains(&email.to) {
            return Err(NotificationError::Provider(format!(
                "mailbox unavailable: {}",
                email.to
            )));
        }

        let mut sent = self.sent.lock().await;
        sent.push(email.clone());

        Ok(SentEmail {
            message_id: Some(format!("mock-{}", sent.len())),
        })
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    async fn health_check(&self) -> NotificationResult<bool> {
        Ok(true)
    }
}
