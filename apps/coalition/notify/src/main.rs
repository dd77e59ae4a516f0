//! Coalition Notify
//!
//! Sends portal notifications for published content and admin broadcasts,
//! printing the dispatch outcome as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::FromEnv;
use domain_notifications::{
    BroadcastFilters, InMemoryBroadcastLog, NotificationService, OrganizationSize,
    RecipientFilters,
};
use eyre::{eyre, Result};
use serde_json::json;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

mod config;
mod wiring;

use config::Config;
use wiring::ProviderKind;

#[derive(Parser)]
#[command(name = "coalition-notify")]
#[command(about = "Notify member organizations and subscribers about portal content")]
struct Cli {
    /// JSON fixture to use instead of Postgres
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Email transport
    #[arg(long, value_enum, default_value = "smtp", global = true)]
    provider: ProviderKind,

    /// Record emails instead of sending them
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct AudienceArgs {
    /// Organization tags; any match qualifies
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,

    /// Organization regions
    #[arg(long, value_delimiter = ',')]
    regions: Vec<String>,
}

impl AudienceArgs {
    fn filters(&self) -> RecipientFilters {
        RecipientFilters::none()
            .with_tags(self.tags.clone())
            .with_regions(self.regions.clone())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Notify about a published announcement
    Announcement { id: Uuid },

    /// Notify about a published blog post
    Blog { id: Uuid },

    /// Notify about a published alert
    Alert { id: Uuid },

    /// Notify about a published event
    Event { id: Uuid },

    /// Invite organizations to a published survey
    Survey {
        id: Uuid,

        #[command(flatten)]
        audience: AudienceArgs,
    },

    /// Send an admin broadcast
    Broadcast {
        #[arg(long)]
        subject: String,

        /// HTML body
        #[arg(long, conflicts_with = "html_file", required_unless_present = "html_file")]
        html: Option<String>,

        /// Read the HTML body from a file
        #[arg(long)]
        html_file: Option<PathBuf>,

        #[command(flatten)]
        audience: AudienceArgs,

        /// Organization sizes (small, medium, large)
        #[arg(long, value_delimiter = ',')]
        sizes: Vec<OrganizationSize>,

        /// Explicit recipients; skips audience selection
        #[arg(long, value_delimiter = ',')]
        to: Vec<String>,
    },

    /// List the addresses a broadcast would go to
    Preview {
        #[command(flatten)]
        audience: AudienceArgs,

        #[arg(long, value_delimiter = ',')]
        sizes: Vec<OrganizationSize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let stores = wiring::stores(cli.fixture.as_deref(), &config).await?;
    let provider = wiring::provider(cli.provider, cli.dry_run, &config)?;
    info!(provider = provider.name(), "Provider ready");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping dispatch");
            let _ = shutdown_tx.send(true);
        }
    });

    let log = Arc::new(InMemoryBroadcastLog::new());
    let service = wiring::service(stores, provider, &config)?
        .with_broadcast_log(log.clone())
        .with_shutdown(shutdown_rx);

    let output = run(cli.command, &service, &log).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

async fn run(command: Commands, service: &NotificationService, log: &InMemoryBroadcastLog) -> Result<serde_json::Value> {
    let outcome = match command {
        Commands::Announcement { id } => service.notify_announcement_published(id).await?,
        Commands::Blog { id } => service.notify_blog_published(id).await?,
        Commands::Alert { id } => service.notify_alert_published(id).await?,
        Commands::Event { id } => service.notify_event_published(id).await?,
        Commands::Survey { id, audience } => service.notify_survey_published(id, audience.filters()).await?,

        Commands::Preview { audience, sizes } => {
            let filters = BroadcastFilters {
                recipients: audience.filters(),
                sizes,
            };
            let addresses = service.preview_broadcast_recipients(&filters).await?;
            return Ok(json!({ "count": addresses.len(), "recipients": addresses }));
        }

        Commands::Broadcast {
            subject,
            html,
            html_file,
            audience,
            sizes,
            to,
        } => {
            let html_body = match (html, html_file) {
                (Some(html), _) => html,
                (None, Some(path)) => tokio::fs::read_to_string(&path).await?,
                (None, None) => return Err(eyre!("--html or --html-file is required")),
            };
            let filters = BroadcastFilters {
                recipients: audience.filters(),
                sizes,
            };
            let recipients = if to.is_empty() {
                service.preview_broadcast_recipients(&filters).await?
            } else {
                to
            };

            let outcome = service
                .send_broadcast(&subject, &html_body, &recipients, filters)
                .await?;
            let record = log.records().await.pop();
            return Ok(json!({ "outcome": outcome, "broadcast": record }));
        }
    };

    if !outcome.errors.is_empty() {
        warn!(
            sent = outcome.sent,
            total = outcome.total,
            "Sent to {} of {}; {} failed",
            outcome.sent,
            outcome.total,
            outcome.failed()
        );
    }

    Ok(serde_json::to_value(&outcome)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_help_needs_no_environment() {
        temp_env::with_var_unset("NOTIFY_FROM_EMAIL", || {
            let err = Cli::try_parse_from(["coalition-notify", "--help"]).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        });
    }

    #[test]
    fn test_broadcast_arguments_parse() {
        let cli = Cli::try_parse_from([
            "coalition-notify",
            "--dry-run",
            "broadcast",
            "--subject",
            "Annual meeting",
            "--html",
            "<p>Hi</p>",
            "--sizes",
            "small,large",
        ])
        .unwrap();

        assert!(cli.dry_run);
        match cli.command {
            Commands::Broadcast { subject, sizes, to, .. } => {
                assert_eq!(subject, "Annual meeting");
                assert_eq!(sizes, vec![OrganizationSize::Small, OrganizationSize::Large]);
                assert!(to.is_empty());
            }
            _ => panic!("expected broadcast"),
        }
    }
}
