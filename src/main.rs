//! Infrasense chat - the support chat widget in a terminal
//!
//! Sends every message to the configured automation webhook and renders the
//! replies, including the booking button backed by the scheduling widget.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use infrasense_chat::config::{Config, Texts};
use infrasense_chat::core::{get_or_create_session_id, ChatWidget, StorageCapability, WidgetSettings};
use infrasense_chat::reply::ReplyNormalizer;
use infrasense_chat::scheduler::{HttpScriptHost, Scheduler, SchedulerLoader, SystemBrowser};
use infrasense_chat::shell;
use infrasense_chat::webhook::HttpWebhook;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Webhook endpoint, overrides CHAT_WEBHOOK_URL
    #[arg(long)]
    webhook_url: Option<String>,

    /// Directory backing the local storage
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Widget configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "infrasense_chat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(url) = cli.webhook_url {
        config.webhook_url = url;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if cli.config.is_some() {
        config.widget_config = cli.config;
    }

    let widget_config = config.load_widget_config()?;
    let texts = Texts::default();

    let storage = StorageCapability::detect(&config.data_dir);
    let session_id = get_or_create_session_id(&storage);

    let loader = SchedulerLoader::process_wide(|| {
        SchedulerLoader::new(
            Arc::new(HttpScriptHost::new()),
            widget_config.scheduler.script_url.clone(),
        )
        .with_stylesheet(widget_config.scheduler.stylesheet_url.clone())
    });
    let scheduler = Arc::new(Scheduler::new(loader, Arc::new(SystemBrowser)));

    let webhook = HttpWebhook::new(config.webhook_url.clone(), widget_config.widget.client_tag.clone());
    let normalizer = ReplyNormalizer::new(
        widget_config.replies.booking_policy,
        widget_config.scheduler.url.clone(),
        texts.clone(),
    );

    tracing::info!(
        "Chat widget ready (webhook {}, session {})",
        webhook.url(),
        session_id
    );

    let widget = ChatWidget::new(
        Arc::new(webhook),
        normalizer,
        session_id,
        WidgetSettings {
            greeting: widget_config.widget.greeting.clone(),
            suggestions: widget_config.suggestions.items.clone(),
            texts,
            scheduler: Some(scheduler),
        },
    );

    shell::run(widget, &widget_config.widget.title).await
}
