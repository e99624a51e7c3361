//! Geocoding agent
//!
//! Resolves free-text place descriptions to candidate locations via the
//! Nominatim search API. Nominatim's usage policy requires an
//! identifying User-Agent, so the client always sends one.

use super::{map_transport, AgentError, NO_RESULTS};
use std::time::Duration;

/// Maximum number of candidate locations requested and rendered
const MAX_CANDIDATES: usize = 5;

pub struct GeocodingAgent {
    endpoint: String,
    client: reqwest::Client,
}

impl GeocodingAgent {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .user_agent("atlas-agent/0.1 (knowledge assistant)")
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Search for locations matching a free-text description.
    pub async fn search(&self, place: &str) -> Result<String, AgentError> {
        let limit = MAX_CANDIDATES.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", place), ("format", "json"), ("limit", &limit)])
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Upstream { status, body });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))?;

        format_candidates(&data)
    }
}

/// Render candidates as a numbered `name (lat, lon)` list.
fn format_candidates(data: &serde_json::Value) -> Result<String, AgentError> {
    let candidates = data
        .as_array()
        .ok_or_else(|| AgentError::Parse("expected a JSON array".to_string()))?;

    if candidates.is_empty() {
        return Ok(NO_RESULTS.to_string());
    }

    let lines: Vec<String> = candidates
        .iter()
        .take(MAX_CANDIDATES)
        .enumerate()
        .filter_map(|(i, c)| {
            let name = c.get("display_name").and_then(|n| n.as_str())?;
            let lat = c.get("lat").and_then(|l| l.as_str())?;
            let lon = c.get("lon").and_then(|l| l.as_str())?;
            Some(format!("{}. {} ({}, {})", i + 1, name, lat, lon))
        })
        .collect();

    if lines.is_empty() {
        return Err(AgentError::Parse(
            "candidates missing display_name/lat/lon".to_string(),
        ));
    }

    Ok(lines.join("\n"))
}
