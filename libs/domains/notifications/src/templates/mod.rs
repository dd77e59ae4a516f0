//! Email template rendering engine.
//!
//! One canonical [`NotificationContent`] is rendered per dispatch. The
//! call-to-action links that differ between recipients are left as
//! [`LinkToken`] placeholders for the personalizer to fill in.

use chrono::{DateTime, NaiveDate, Utc};
use handlebars::Handlebars;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::{NotificationError, NotificationResult};
use crate::models::{
    Alert, Announcement, Blog, ContentEntity, Event, NotificationCategory, NotificationContent,
    Survey,
};

/// Per-recipient link placeholders embedded in rendered templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkToken {
    Unsubscribe,
    ManagePreferences,
}

impl LinkToken {
    pub const ALL: [LinkToken; 2] = [LinkToken::Unsubscribe, LinkToken::ManagePreferences];

    pub const fn token(&self) -> &'static str {
        match self {
            LinkToken::Unsubscribe => "[[unsubscribe_url]]",
            LinkToken::ManagePreferences => "[[preferences_url]]",
        }
    }
}

/// Static settings shared by every template.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Base URL of the portal, without a trailing slash.
    pub portal_url: String,
    /// Name shown in headers and footers.
    pub brand_name: String,
}

/// Footer fields flattened into every template context.
#[derive(Debug, Serialize)]
struct Footer<'a> {
    brand_name: &'a str,
    portal_url: &'a str,
    unsubscribe_url: &'static str,
    preferences_url: &'static str,
    /// Mandatory categories only offer the preferences link.
    mandatory: bool,
}

#[derive(Debug, Serialize)]
struct AnnouncementContext<'a> {
    title: &'a str,
    content_html: &'a str,
    content_text: String,
    author: Option<&'a str>,
    attachment_url: Option<&'a str>,
    view_url: String,
    #[serde(flatten)]
    footer: Footer<'a>,
}

#[derive(Debug, Serialize)]
struct BlogContext<'a> {
    title: &'a str,
    summary_html: &'a str,
    summary_text: String,
    author: Option<&'a str>,
    view_url: String,
    #[serde(flatten)]
    footer: Footer<'a>,
}

#[derive(Debug, Serialize)]
struct AlertContext<'a> {
    title: &'a str,
    message_html: &'a str,
    message_text: String,
    priority: String,
    header_color: &'static str,
    view_url: String,
    #[serde(flatten)]
    footer: Footer<'a>,
}

#[derive(Debug, Serialize)]
struct SurveyContext<'a> {
    title: &'a str,
    description_html: Option<&'a str>,
    description_text: Option<String>,
    due_date: Option<String>,
    view_url: String,
    #[serde(flatten)]
    footer: Footer<'a>,
}

#[derive(Debug, Serialize)]
struct EventContext<'a> {
    title: &'a str,
    description_html: Option<&'a str>,
    description_text: Option<String>,
    starts_at: String,
    ends_at: Option<String>,
    location: Option<&'a str>,
    meeting_url: Option<&'a str>,
    view_url: String,
    #[serde(flatten)]
    footer: Footer<'a>,
}

/// Template engine for rendering notification emails.
pub struct TemplateRenderer {
    handlebars: Arc<Handlebars<'static>>,
    settings: RenderSettings,
    tag_pattern: Regex,
}

impl TemplateRenderer {
    /// Create a renderer with all templates registered.
    pub fn new(settings: RenderSettings) -> NotificationResult<Self> {
        let mut handlebars = Handlebars::new();

        handlebars.register_partial("footer_html", FOOTER_HTML_PARTIAL)?;
        handlebars.register_partial("footer_text", FOOTER_TEXT_PARTIAL)?;

        for (name, source) in [
            ("announcement_html", ANNOUNCEMENT_HTML_TEMPLATE),
            ("announcement_text", ANNOUNCEMENT_TEXT_TEMPLATE),
            ("blog_html", BLOG_HTML_TEMPLATE),
            ("blog_text", BLOG_TEXT_TEMPLATE),
            ("alert_html", ALERT_HTML_TEMPLATE),
            ("alert_text", ALERT_TEXT_TEMPLATE),
            ("survey_html", SURVEY_HTML_TEMPLATE),
            ("survey_text", SURVEY_TEXT_TEMPLATE),
            ("event_html", EVENT_HTML_TEMPLATE),
            ("event_text", EVENT_TEXT_TEMPLATE),
        ] {
            handlebars
                .register_template_string(name, source)
                .map_err(|e| NotificationError::Render(format!("Failed to register {}: {}", name, e)))?;
        }

        let tag_pattern = Regex::new(r"<[^>]*>")
            .map_err(|e| NotificationError::Render(format!("invalid tag pattern: {}", e)))?;

        Ok(Self {
            handlebars: Arc::new(handlebars),
            settings,
            tag_pattern,
        })
    }

    /// Render the shared content for an entity.
    pub fn render(&self, entity: &ContentEntity) -> NotificationResult<NotificationContent> {
        match entity {
            ContentEntity::Announcement(a) => self.render_announcement(a),
            ContentEntity::Blog(b) => self.render_blog(b),
            ContentEntity::Alert(a) => self.render_alert(a),
            ContentEntity::Survey(s) => self.render_survey(s),
            ContentEntity::Event(e) => self.render_event(e),
        }
    }

    pub fn render_announcement(&self, announcement: &Announcement) -> NotificationResult<NotificationContent> {
        let title = require_title(NotificationCategory::Announcement, &announcement.title)?;
        debug!(id = %announcement.id, "Rendering announcement email");

        let ctx = AnnouncementContext {
            title,
            content_html: &announcement.content,
            content_text: self.to_plain_text(&announcement.content),
            author: non_blank(announcement.author.as_deref()),
            attachment_url: non_blank(announcement.attachment_url.as_deref()),
            view_url: self.view_url(NotificationCategory::Announcement, announcement.id),
            footer: self.footer(false),
        };

        self.render_pair("announcement", &ctx, format!("New Announcement: {}", title))
    }

    pub fn render_blog(&self, blog: &Blog) -> NotificationResult<NotificationContent> {
        let title = require_title(NotificationCategory::Blog, &blog.title)?;
        debug!(id = %blog.id, "Rendering blog email");

        let summary = non_blank(blog.excerpt.as_deref()).unwrap_or(&blog.content);
        let ctx = BlogContext {
            title,
            summary_html: summary,
            summary_text: self.to_plain_text(summary),
            author: non_blank(blog.author.as_deref()),
            view_url: self.view_url(NotificationCategory::Blog, blog.id),
            footer: self.footer(false),
        };

        self.render_pair("blog", &ctx, format!("New Blog Post: {}", title))
    }

    pub fn render_alert(&self, alert: &Alert) -> NotificationResult<NotificationContent> {
        let title = require_title(NotificationCategory::Alert, &alert.title)?;
        debug!(id = %alert.id, priority = %alert.priority, "Rendering alert email");

        let ctx = AlertContext {
            title,
            message_html: &alert.message,
            message_text: self.to_plain_text(&alert.message),
            priority: alert.priority.to_string(),
            header_color: alert.priority.header_color(),
            view_url: self.view_url(NotificationCategory::Alert, alert.id),
            footer: self.footer(true),
        };

        let subject = match alert.priority.subject_prefix() {
            Some(prefix) => format!("{} Alert: {}", prefix, title),
            None => format!("Alert: {}", title),
        };

        self.render_pair("alert", &ctx, subject)
    }

    pub fn render_survey(&self, survey: &Survey) -> NotificationResult<NotificationContent> {
        let title = require_title(NotificationCategory::Survey, &survey.title)?;
        debug!(id = %survey.id, "Rendering survey email");

        let description = non_blank(survey.description.as_deref());
        let ctx = SurveyContext {
            title,
            description_html: description,
            description_text: description.map(|d| self.to_plain_text(d)),
            due_date: survey.due_date.map(format_date),
            view_url: self.view_url(NotificationCategory::Survey, survey.id),
            footer: self.footer(false),
        };

        self.render_pair("survey", &ctx, format!("New Survey: {}", title))
    }

    pub fn render_event(&self, event: &Event) -> NotificationResult<NotificationContent> {
        let title = require_title(NotificationCategory::Event, &event.title)?;
        debug!(id = %event.id, public = event.is_public, "Rendering event email");

        if let Some(ends_at) = event.ends_at {
            if ends_at < event.starts_at {
                return Err(NotificationError::Render(format!(
                    "event {} ends before it starts",
                    event.id
                )));
            }
        }

        let description = non_blank(event.description.as_deref());
        let ctx = EventContext {
            title,
            description_html: description,
            description_text: description.map(|d| self.to_plain_text(d)),
            starts_at: format_datetime(event.starts_at),
            ends_at: event.ends_at.map(format_datetime),
            location: non_blank(event.location.as_deref()),
            meeting_url: non_blank(event.meeting_url.as_deref()),
            view_url: self.view_url(NotificationCategory::Event, event.id),
            footer: self.footer(false),
        };

        self.render_pair("event", &ctx, format!("New Event: {}", title))
    }

    fn render_pair<T: Serialize>(
        &self,
        template: &str,
        ctx: &T,
        subject: String,
    ) -> NotificationResult<NotificationContent> {
        let html_body = self.handlebars.render(&format!("{}_html", template), ctx)?;
        let text_body = self.handlebars.render(&format!("{}_text", template), ctx)?;

        Ok(NotificationContent {
            subject,
            html_body,
            text_body,
        })
    }

    fn footer(&self, mandatory: bool) -> Footer<'_> {
        Footer {
            brand_name: &self.settings.brand_name,
            portal_url: &self.settings.portal_url,
            unsubscribe_url: LinkToken::Unsubscribe.token(),
            preferences_url: LinkToken::ManagePreferences.token(),
            mandatory,
        }
    }

    fn view_url(&self, category: NotificationCategory, id: uuid::Uuid) -> String {
        format!("{}/{}/{}", self.settings.portal_url, category.path_segment(), id)
    }

    /// Strip markup from rich-text fields for the plain-text body.
    fn to_plain_text(&self, html: &str) -> String {
        let stripped = self.tag_pattern.replace_all(html, "");
        stripped
            .replace("&nbsp;", " ")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn require_title(category: NotificationCategory, title: &str) -> NotificationResult<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(NotificationError::Render(format!("{} has no title", category)));
    }
    Ok(title)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn format_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn format_datetime(at: DateTime<Utc>) -> String {
    at.format("%A, %B %-d, %Y at %-I:%M %p UTC").to_string()
}

// ============================================================================
// Email Templates
// ============================================================================

const FOOTER_HTML_PARTIAL: &str = r#"<tr>
      <td style="padding: 24px 0; text-align: center;">
        <p style="color: #71717a; font-size: 12px; margin: 0 0 16px 0;">
          {{#if mandatory}}
          Alerts are sent to every member organization and cannot be switched off.
          <a href="{{{preferences_url}}}" style="color: #2563eb; text-decoration: none;">Manage preferences</a>
          {{else}}
          <a href="{{{unsubscribe_url}}}" style="color: #2563eb; text-decoration: none;">Unsubscribe</a>
          &nbsp;|&nbsp;
          <a href="{{{preferences_url}}}" style="color: #2563eb; text-decoration: none;">Manage preferences</a>
          {{/if}}
        </p>
        <p style="color: #a1a1aa; font-size: 11px; margin: 0;">
          <a href="{{{portal_url}}}" style="color: #a1a1aa;">{{brand_name}}</a>
        </p>
      </td>
    </tr>"#;

const FOOTER_TEXT_PARTIAL: &str = r#"---
{{#if mandatory}}
Alerts are sent to every member organization and cannot be switched off.
Manage preferences: {{{preferences_url}}}
{{else}}
Unsubscribe: {{{unsubscribe_url}}}
Manage preferences: {{{preferences_url}}}
{{/if}}

{{{brand_name}}} | {{{portal_url}}}"#;

const ANNOUNCEMENT_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>{{title}}</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f4f4f5;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; padding: 40px 20px;">
    <tr>
      <td style="background-color: #ffffff; border-radius: 8px; padding: 40px;">
        <p style="color: #2563eb; font-size: 12px; font-weight: 600; text-transform: uppercase; margin: 0 0 8px 0;">New announcement</p>
        <h1 style="color: #18181b; font-size: 24px; font-weight: 600; margin: 0 0 8px 0;">{{title}}</h1>
        {{#if author}}
        <p style="color: #71717a; font-size: 14px; margin: 0 0 24px 0;">Posted by {{author}}</p>
        {{/if}}
        <div style="color: #3f3f46; font-size: 16px; line-height: 24px;">{{{content_html}}}</div>
        {{#if attachment_url}}
        <p style="margin: 24px 0 0 0;">
          <a href="{{{attachment_url}}}" style="color: #2563eb;">Download attachment</a>
        </p>
        {{/if}}
        <p style="text-align: center; margin: 32px 0 0 0;">
          <a href="{{{view_url}}}" style="display: inline-block; background-color: #2563eb; color: #ffffff; font-size: 16px; padding: 12px 32px; text-decoration: none; border-radius: 6px;">Read on the portal</a>
        </p>
      </td>
    </tr>
    {{> footer_html}}
  </table>
</body>
</html>"#;

const ANNOUNCEMENT_TEXT_TEMPLATE: &str = r#"NEW ANNOUNCEMENT: {{{title}}}
{{#if author}}
Posted by {{{author}}}
{{/if}}

{{{content_text}}}
{{#if attachment_url}}

Attachment: {{{attachment_url}}}
{{/if}}

Read on the portal: {{{view_url}}}

{{> footer_text}}"#;

const BLOG_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>{{title}}</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f4f4f5;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; padding: 40px 20px;">
    <tr>
      <td style="background-color: #ffffff; border-radius: 8px; padding: 40px;">
        <p style="color: #16a34a; font-size: 12px; font-weight: 600; text-transform: uppercase; margin: 0 0 8px 0;">New on the blog</p>
        <h1 style="color: #18181b; font-size: 24px; font-weight: 600; margin: 0 0 8px 0;">{{title}}</h1>
        {{#if author}}
        <p style="color: #71717a; font-size: 14px; margin: 0 0 24px 0;">By {{author}}</p>
        {{/if}}
        <div style="color: #3f3f46; font-size: 16px; line-height: 24px;">{{{summary_html}}}</div>
        <p style="text-align: center; margin: 32px 0 0 0;">
          <a href="{{{view_url}}}" style="display: inline-block; background-color: #16a34a; color: #ffffff; font-size: 16px; padding: 12px 32px; text-decoration: none; border-radius: 6px;">Read the full post</a>
        </p>
      </td>
    </tr>
    {{> footer_html}}
  </table>
</body>
</html>"#;

const BLOG_TEXT_TEMPLATE: &str = r#"NEW BLOG POST: {{{title}}}
{{#if author}}
By {{{author}}}
{{/if}}

{{{summary_text}}}

Read the full post: {{{view_url}}}

{{> footer_text}}"#;

const ALERT_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>{{title}}</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f4f4f5;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; padding: 40px 20px;">
    <tr>
      <td style="background-color: {{header_color}}; border-radius: 8px 8px 0 0; padding: 16px 40px;">
        <p style="color: #ffffff; font-size: 14px; font-weight: 700; margin: 0;">{{priority}} PRIORITY ALERT</p>
      </td>
    </tr>
    <tr>
      <td style="background-color: #ffffff; border-radius: 0 0 8px 8px; padding: 40px;">
        <h1 style="color: {{header_color}}; font-size: 24px; font-weight: 700; margin: 0 0 16px 0;">{{title}}</h1>
        <div style="color: #3f3f46; font-size: 16px; line-height: 24px;">{{{message_html}}}</div>
        <p style="text-align: center; margin: 32px 0 0 0;">
          <a href="{{{view_url}}}" style="display: inline-block; background-color: {{header_color}}; color: #ffffff; font-size: 16px; padding: 12px 32px; text-decoration: none; border-radius: 6px;">View alert</a>
        </p>
      </td>
    </tr>
    {{> footer_html}}
  </table>
</body>
</html>"#;

const ALERT_TEXT_TEMPLATE: &str = r#"{{{priority}}} PRIORITY ALERT
{{{title}}}

{{{message_text}}}

View alert: {{{view_url}}}

{{> footer_text}}"#;

const SURVEY_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>{{title}}</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f4f4f5;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; padding: 40px 20px;">
    <tr>
      <td style="background-color: #ffffff; border-radius: 8px; padding: 40px;">
        <p style="color: #7c3aed; font-size: 12px; font-weight: 600; text-transform: uppercase; margin: 0 0 8px 0;">Your input is requested</p>
        <h1 style="color: #18181b; font-size: 24px; font-weight: 600; margin: 0 0 16px 0;">{{title}}</h1>
        {{#if description_html}}
        <div style="color: #3f3f46; font-size: 16px; line-height: 24px;">{{{description_html}}}</div>
        {{/if}}
        {{#if due_date}}
        <p style="background-color: #f5f3ff; border-left: 4px solid #7c3aed; border-radius: 6px; padding: 12px 16px; color: #5b21b6; font-size: 14px; margin: 24px 0 0 0;">
          <strong>Please respond by {{due_date}}</strong>
        </p>
        {{/if}}
        <p style="text-align: center; margin: 32px 0 0 0;">
          <a href="{{{view_url}}}" style="display: inline-block; background-color: #7c3aed; color: #ffffff; font-size: 16px; padding: 12px 32px; text-decoration: none; border-radius: 6px;">Take the survey</a>
        </p>
      </td>
    </tr>
    {{> footer_html}}
  </table>
</body>
</html>"#;

const SURVEY_TEXT_TEMPLATE: &str = r#"NEW SURVEY: {{{title}}}
{{#if description_text}}

{{{description_text}}}
{{/if}}
{{#if due_date}}

Please respond by {{{due_date}}}
{{/if}}

Take the survey: {{{view_url}}}

{{> footer_text}}"#;

const EVENT_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>{{title}}</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f4f4f5;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; padding: 40px 20px;">
    <tr>
      <td style="background-color: #ffffff; border-radius: 8px; padding: 40px;">
        <p style="color: #0891b2; font-size: 12px; font-weight: 600; text-transform: uppercase; margin: 0 0 8px 0;">Upcoming event</p>
        <h1 style="color: #18181b; font-size: 24px; font-weight: 600; margin: 0 0 16px 0;">{{title}}</h1>
        <table width="100%" cellspacing="0" cellpadding="0" style="background-color: #ecfeff; border-radius: 6px; margin: 0 0 24px 0;">
          <tr>
            <td style="padding: 16px; color: #155e75; font-size: 14px; line-height: 22px;">
              <strong>When:</strong> {{starts_at}}{{#if ends_at}} until {{ends_at}}{{/if}}<br>
              {{#if location}}<strong>Where:</strong> {{location}}<br>{{/if}}
              {{#if meeting_url}}<strong>Join online:</strong> <a href="{{{meeting_url}}}" style="color: #0891b2;">{{meeting_url}}</a>{{/if}}
            </td>
          </tr>
        </table>
        {{#if description_html}}
        <div style="color: #3f3f46; font-size: 16px; line-height: 24px;">{{{description_html}}}</div>
        {{/if}}
        <p style="text-align: center; margin: 32px 0 0 0;">
          <a href="{{{view_url}}}" style="display: inline-block; background-color: #0891b2; color: #ffffff; font-size: 16px; padding: 12px 32px; text-decoration: none; border-radius: 6px;">Event details</a>
        </p>
      </td>
    </tr>
    {{> footer_html}}
  </table>
</body>
</html>"#;

const EVENT_TEXT_TEMPLATE: &str = r#"UPCOMING EVENT: {{{title}}}

When: {{{starts_at}}}{{#if ends_at}} until {{{ends_at}}}{{/if}}
{{#if location}}
Where: {{{location}}}
{{/if}}
{{#if meeting_url}}
Join online: {{{meeting_url}}}
{{/if}}
{{#if description_text}}

{{{description_text}}}
{{/if}}

Event details: {{{view_url}}}

{{> footer_text}}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertPriority;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn renderer() -> TemplateRenderer {
        TemplateRenderer::new(RenderSettings {
            portal_url: "https://portal.example.org".to_string(),
            brand_name: "Coalition Portal".to_string(),
        })
        .unwrap()
    }

    fn alert(priority: AlertPriority) -> Alert {
        Alert {
            id: Uuid::new_v4(),
            title: "Boil water notice".to_string(),
            message: "<p>Until further notice.</p>".to_string(),
            priority,
            is_published: true,
        }
    }

    #[test]
    fn test_announcement_embeds_both_link_tokens() {
        let content = renderer()
            .render_announcement(&Announcement {
                id: Uuid::new_v4(),
                title: "Annual meeting".to_string(),
                content: "<p>Join us &amp; bring a friend.</p>".to_string(),
                author: Some("Board".to_string()),
                attachment_url: None,
                is_published: true,
                published_at: None,
            })
            .unwrap();

        assert_eq!(content.subject, "New Announcement: Annual meeting");
        for token in LinkToken::ALL {
            assert!(content.html_body.contains(token.token()));
            assert!(content.text_body.contains(token.token()));
        }
        assert!(content.text_body.contains("Join us & bring a friend."));
        assert!(!content.text_body.contains("<p>"));
        assert!(!content.html_body.contains("Download attachment"));
    }

    #[test]
    fn test_alert_priority_drives_subject_and_color() {
        let r = renderer();

        let urgent = r.render_alert(&alert(AlertPriority::Urgent)).unwrap();
        assert_eq!(urgent.subject, "[URGENT] Alert: Boil water notice");
        assert!(urgent.html_body.contains("#dc2626"));

        let high = r.render_alert(&alert(AlertPriority::High)).unwrap();
        assert!(high.subject.starts_with("[IMPORTANT]"));

        let low = r.render_alert(&alert(AlertPriority::Low)).unwrap();
        assert_eq!(low.subject, "Alert: Boil water notice");
    }

    #[test]
    fn test_alert_offers_preferences_instead_of_unsubscribe() {
        let content = renderer().render_alert(&alert(AlertPriority::Medium)).unwrap();
        assert!(content.html_body.contains(LinkToken::ManagePreferences.token()));
        assert!(!content.html_body.contains(LinkToken::Unsubscribe.token()));
        assert!(!content.text_body.contains("Unsubscribe:"));
    }

    #[test]
    fn test_survey_without_due_date_omits_section() {
        let content = renderer()
            .render_survey(&Survey {
                id: Uuid::new_v4(),
                title: "Needs assessment".to_string(),
                description: None,
                due_date: None,
                is_published: true,
            })
            .unwrap();
        assert!(!content.html_body.contains("Please respond by"));

        let dated = renderer()
            .render_survey(&Survey {
                id: Uuid::new_v4(),
                title: "Needs assessment".to_string(),
                description: None,
                due_date: NaiveDate::from_ymd_opt(2026, 3, 5),
                is_published: true,
            })
            .unwrap();
        assert!(dated.text_body.contains("Please respond by March 5, 2026"));
    }

    #[test]
    fn test_event_renders_location_and_meeting_link() {
        let content = renderer()
            .render_event(&Event {
                id: Uuid::new_v4(),
                title: "Volunteer fair".to_string(),
                description: None,
                starts_at: Utc.with_ymd_and_hms(2026, 5, 2, 15, 0, 0).unwrap(),
                ends_at: None,
                location: Some("Community Hall".to_string()),
                meeting_url: Some("https://meet.example.org/fair".to_string()),
                is_public: true,
                is_published: true,
            })
            .unwrap();

        assert_eq!(content.subject, "New Event: Volunteer fair");
        assert!(content.text_body.contains("Where: Community Hall"));
        assert!(content.text_body.contains("Join online: https://meet.example.org/fair"));
        assert!(content.text_body.contains("Saturday, May 2, 2026 at 3:00 PM UTC"));
    }

    #[test]
    fn test_blank_title_is_a_render_error() {
        let result = renderer().render_blog(&Blog {
            id: Uuid::new_v4(),
            title: "   ".to_string(),
            content: "body".to_string(),
            excerpt: None,
            author: None,
            is_published: true,
        });
        assert!(matches!(result, Err(NotificationError::Render(_))));
    }

    #[test]
    fn test_html_fields_are_escaped_in_titles() {
        let content = renderer()
            .render_blog(&Blog {
                id: Uuid::new_v4(),
                title: "Rent <and> utilities".to_string(),
                content: "body".to_string(),
                excerpt: None,
                author: None,
                is_published: true,
            })
            .unwrap();
        assert!(content.html_body.contains("Rent &lt;and&gt; utilities"));
        assert!(content.text_body.contains("Rent <and> utilities"));
    }
}
