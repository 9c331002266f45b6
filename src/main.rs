use std::sync::Arc;

use orapulse::application::{MonitorKind, MonitorOptions, PerfMonitor};
use orapulse::config::MonitorConfig;
use orapulse::domain::models::PageQuery;
use orapulse::domain::telemetry_source::TelemetrySource;
use orapulse::infrastructure::PerfApiClient;
use orapulse::session::SessionContext;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn spawn_monitor(base_url: &str, kind: MonitorKind) -> PerfMonitor {
    let options = MonitorOptions::default();
    PerfMonitor::with_feed_config(base_url, kind, &options, move |config| {
        config
            .with_auto_connect(true)
            .with_on_open(move || info!(monitor = kind.endpoint(), "feed open"))
            .with_on_close(move || info!(monitor = kind.endpoint(), "feed closed"))
            .with_on_error(move |err| warn!(monitor = kind.endpoint(), %err, "feed error"))
            .with_on_message(move |msg| {
                if let Some(error_text) = &msg.error_text {
                    warn!(monitor = kind.endpoint(), error_text, "server-side error");
                } else {
                    info!(monitor = kind.endpoint(), kind = %msg.kind, "update received");
                }
            })
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orapulse=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MonitorConfig::from_env();
    info!(ws = %config.ws_base_url, api = %config.api_base_url, "starting monitors");

    let session = Arc::new(match std::env::var("ORAPULSE_TOKEN") {
        Ok(token) => SessionContext::login(token),
        Err(_) => SessionContext::anonymous(),
    });

    let monitors = [
        spawn_monitor(&config.ws_base_url, MonitorKind::Queries),
        spawn_monitor(&config.ws_base_url, MonitorKind::Sessions),
        spawn_monitor(&config.ws_base_url, MonitorKind::WaitEvents),
        spawn_monitor(&config.ws_base_url, MonitorKind::Metrics),
    ];

    // One REST read up front so a misconfigured backend shows early.
    let api = PerfApiClient::new(&config.api_base_url, session);
    match api.slow_queries(&PageQuery::default(), None).await {
        Ok(envelope) => info!(count = envelope.data.len(), "slow queries fetched"),
        Err(err) => warn!(%err, "initial REST probe failed"),
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    for monitor in &monitors {
        monitor.disconnect().await;
    }
    Ok(())
}
