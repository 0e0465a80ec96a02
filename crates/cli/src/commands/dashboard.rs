//! Dashboard commands: a single stats fetch or a live view

use anyhow::{Context, Result};
use colored::Colorize;
use logpilot_core::{
    DashboardControllerBuilder, DashboardView, EndpointConfig, HighlightFlags, HttpStatsClient,
    StatsSource,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::output::{print_dashboard, print_info, OutputFormat};

/// Fetch statistics once and print every panel
pub async fn show_stats(endpoints: &EndpointConfig, format: OutputFormat) -> Result<()> {
    let client = HttpStatsClient::new(endpoints)?;
    let snapshot = client
        .poll()
        .await
        .with_context(|| format!("Failed to fetch statistics from {}", endpoints.base_url))?;

    let view = DashboardView {
        version: 1,
        snapshot: Some(Arc::new(snapshot)),
        highlights: HighlightFlags::NONE,
    };

    print_dashboard(&view, format)
}

/// Keep the dashboard live and re-print it on every change until Ctrl-C
pub async fn watch(
    endpoints: &EndpointConfig,
    interval: Duration,
    format: OutputFormat,
) -> Result<()> {
    let controller = DashboardControllerBuilder::new()
        .source(Arc::new(HttpStatsClient::new(endpoints)?))
        .poll_interval(interval)
        .build()?;

    let mut views = controller.subscribe();
    controller.start();
    print_info(&format!(
        "Watching {} every {} ms (Ctrl-C to stop)",
        endpoints.base_url,
        interval.as_millis()
    ));

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                debug!(version = view.version, "Dashboard view changed");

                if matches!(format, OutputFormat::Table) {
                    println!("{}", format!("── update #{} ──", view.version).dimmed());
                }
                print_dashboard(&view, format)?;
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    controller.teardown();
    Ok(())
}
