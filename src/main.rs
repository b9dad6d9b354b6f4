//! Jira webhook receiver service.
//!
//! Main entry point for the receiver. Loads configuration, registers the
//! default handlers and serves until a shutdown signal arrives.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use jira_webhook_api::Config;
use jira_webhook_core::{HandlerRegistry, HandlerResult, WebhookHandler, WebhookPayload};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Config goes first so `log_level` can seed the filter
    let config = Config::load().context("Failed to load configuration")?;
    init_tracing(&config.log_level)?;

    info!("Starting Jira webhook receiver");
    info!(
        host = %config.host,
        port = config.port,
        webhook_path = %config.webhook_path,
        dispatch_policy = %config.dispatch_policy,
        "Configuration loaded"
    );

    let registry = build_registry(&config);

    jira_webhook_api::start_server(&config, registry).await.context("Server failed")?;

    info!("Jira webhook receiver shutdown complete");
    Ok(())
}

/// Initializes tracing. `RUST_LOG` takes precedence over `log_level`.
fn init_tracing(log_level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{log_level},tower_http=debug")))
        .context("Invalid log filter")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to install tracing subscriber")
}

/// Builds the registry served by this binary.
fn build_registry(config: &Config) -> HandlerRegistry {
    let mut registry = HandlerRegistry::with_policy(config.dispatch_policy);
    registry.register("jira:issue_updated", Arc::new(IssueUpdateLogger));
    registry
}

/// Logs every issue update it sees.
#[derive(Debug)]
struct IssueUpdateLogger;

#[async_trait]
impl WebhookHandler for IssueUpdateLogger {
    async fn handle(&self, payload: &WebhookPayload) -> HandlerResult {
        let issue_key = payload.issue_key().unwrap_or("<none>");
        let status = payload.get_str(&["issue", "fields", "status", "name"]);

        info!(event = payload.event_type(), issue_key, status, "Issue updated");
        debug!(payload = %payload, "Issue update payload");
        Ok(())
    }

    fn name(&self) -> &str {
        "issue_update_logger"
    }
}

#[cfg(test)]
mod tests {
    use jira_webhook_core::DEFAULT_EVENT_TYPE;

    use super::*;

    #[test]
    fn default_registry_logs_issue_updates() {
        let registry = build_registry(&Config::default());

        assert_eq!(registry.handler_count(DEFAULT_EVENT_TYPE), 1);
        assert_eq!(registry.handler_count("jira:issue_created"), 0);
    }

    #[tokio::test]
    async fn issue_update_logger_accepts_payloads_without_issue() {
        let payload = WebhookPayload::from_slice(br#"{"webhookEvent": "jira:issue_updated"}"#)
            .expect("valid payload");

        assert!(IssueUpdateLogger.handle(&payload).await.is_ok());
    }
}
