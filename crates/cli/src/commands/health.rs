//! Backend liveness check

use anyhow::{Context, Result};
use logpilot_core::{EndpointConfig, HttpAnsweringClient};

use crate::output::{color_status, print_json, print_success, OutputFormat};

/// Probe the backend's health endpoint
pub async fn check(endpoints: &EndpointConfig, format: OutputFormat) -> Result<()> {
    let client = HttpAnsweringClient::new(endpoints)?;
    let health = client
        .health()
        .await
        .with_context(|| format!("Backend at {} is not reachable", endpoints.base_url))?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            print_success(&format!("Backend at {} responded", endpoints.base_url));
            println!("Status:   {}", color_status(&health.status));
            if let Some(message) = &health.message {
                println!("Message:  {}", message);
            }
        }
    }

    Ok(())
}
