//! Auxiliary service endpoints: liveness and recent translation history.

use crate::config::Config;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl ServiceStatus {
    pub fn is_running(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryEntry {
    pub session_id: String,
    pub original_filename: String,
    pub target_language: String,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub translated_text: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl HistoryEntry {
    /// Parse `created_at`, which the service sends as an RFC 2822 date
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc2822(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    history: Vec<HistoryEntry>,
}

/// Ask the service root whether it is up.
pub async fn check_health(client: &reqwest::Client, config: &Config) -> Result<ServiceStatus> {
    let response = client
        .get(config.endpoint("/"))
        .timeout(config.catalog_timeout())
        .send()
        .await
        .context("Failed to reach translation service")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Translation service health check failed ({}): {}", status, body);
    }

    let status: ServiceStatus = response
        .json()
        .await
        .context("Failed to parse health check response")?;

    info!(
        "Translation service: {} (version {})",
        status.message,
        status.version.as_deref().unwrap_or("?")
    );
    Ok(status)
}

/// Fetch the most recent translations recorded by the service.
pub async fn fetch_history(client: &reqwest::Client, config: &Config) -> Result<Vec<HistoryEntry>> {
    let response = client
        .get(config.endpoint("history"))
        .timeout(config.catalog_timeout())
        .send()
        .await
        .context("Failed to request translation history")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Translation history error ({}): {}", status, body);
    }

    let history: HistoryResponse = response
        .json()
        .await
        .context("Failed to parse translation history")?;

    info!("Fetched {} history entries", history.history.len());
    Ok(history.history)
}
