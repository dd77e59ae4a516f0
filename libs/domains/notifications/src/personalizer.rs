//! Per-recipient rewrite of call-to-action links.
//!
//! Organizations manage their preferences through their portal account, so
//! both link tokens point at the account settings page. Subscribers have no
//! account; both tokens become a one-click unsubscribe link carrying their
//! address.

use crate::models::{NotificationContent, RecipientPartition};
use crate::templates::LinkToken;

/// Rewrites [`LinkToken`] placeholders for one recipient at a time.
#[derive(Debug, Clone)]
pub struct Personalizer {
    account_settings_url: String,
    unsubscribe_base_url: String,
}

impl Personalizer {
    pub fn new(account_settings_url: impl Into<String>, unsubscribe_base_url: impl Into<String>) -> Self {
        Self {
            account_settings_url: account_settings_url.into(),
            unsubscribe_base_url: unsubscribe_base_url.into(),
        }
    }

    /// The URL both tokens resolve to for this recipient.
    pub fn link_for(&self, address: &str, partition: RecipientPartition) -> String {
        match partition {
            RecipientPartition::Organization => self.account_settings_url.clone(),
            RecipientPartition::Subscriber => format!(
                "{}?email={}",
                self.unsubscribe_base_url,
                urlencoding::encode(address)
            ),
        }
    }

    /// Substitute link tokens in the HTML and text bodies.
    ///
    /// Only token occurrences change. Running this on already personalized
    /// content is a no-op since no tokens remain.
    pub fn personalize(
        &self,
        content: &NotificationContent,
        address: &str,
        partition: RecipientPartition,
    ) -> NotificationContent {
        let link = self.link_for(address, partition);

        NotificationContent {
            subject: content.subject.clone(),
            html_body: substitute(&content.html_body, &link),
            text_body: substitute(&content.text_body, &link),
        }
    }
}

fn substitute(body: &str, link: &str) -> String {
    LinkToken::ALL
        .iter()
        .fold(body.to_string(), |acc, token| acc.replace(token.token(), link))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn personalizer() -> Personalizer {
        Personalizer::new(
            "https://portal.example.org/settings/notifications",
            "https://portal.example.org/unsubscribe",
        )
    }

    fn content() -> NotificationContent {
        NotificationContent {
            subject: "Hello".to_string(),
            html_body: format!(
                r#"<a href="https://portal.example.org/blogs/1">Read</a> <a href="{}">Unsubscribe</a> <a href="{}">Prefs</a>"#,
                LinkToken::Unsubscribe.token(),
                LinkToken::ManagePreferences.token()
            ),
            text_body: format!(
                "Unsubscribe: {}\nManage preferences: {}",
                LinkToken::Unsubscribe.token(),
                LinkToken::ManagePreferences.token()
            ),
        }
    }

    #[test]
    fn test_organization_links_point_to_account_settings() {
        let out = personalizer().personalize(&content(), "org@x.org", RecipientPartition::Organization);
        assert!(!out.html_body.contains("[["));
        assert_eq!(
            out.html_body.matches("https://portal.example.org/settings/notifications").count(),
            2
        );
        assert!(out.text_body.contains("Unsubscribe: https://portal.example.org/settings/notifications"));
    }

    #[test]
    fn test_subscriber_links_carry_encoded_address() {
        let out = personalizer().personalize(&content(), "jo+news@x.org", RecipientPartition::Subscriber);
        let expected = "https://portal.example.org/unsubscribe?email=jo%2Bnews%40x.org";
        assert_eq!(out.html_body.matches(expected).count(), 2);
        assert!(out.text_body.contains(&format!("Manage preferences: {}", expected)));
    }

    #[test]
    fn test_unrelated_links_untouched() {
        let out = personalizer().personalize(&content(), "a@x.org", RecipientPartition::Subscriber);
        assert!(out.html_body.contains(r#"<a href="https://portal.example.org/blogs/1">Read</a>"#));
        assert_eq!(out.subject, "Hello");
    }

    #[test]
    fn test_personalize_is_idempotent() {
        let p = personalizer();
        for partition in [RecipientPartition::Organization, RecipientPartition::Subscriber] {
            let once = p.personalize(&content(), "a@x.org", partition);
            let twice = p.personalize(&once, "a@x.org", partition);
            assert_eq!(once, twice);
        }
    }
}
