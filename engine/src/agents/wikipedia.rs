//! Wikipedia summary agent
//!
//! Fetches the introductory summary of an article from the REST summary
//! endpoint. Titles are normalized the way the site does it (spaces to
//! underscores) and percent-encoded as a path segment. A 404 from the
//! endpoint means the article does not exist and is surfaced as a
//! distinguishable not-found error rather than a generic failure.

use super::{map_transport, AgentError};
use std::time::Duration;

pub struct WikipediaAgent {
    endpoint: String,
    client: reqwest::Client,
}

impl WikipediaAgent {
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

    /// Fetch the summary for an article title.
    pub async fn summary(&self, title: &str) -> Result<String, AgentError> {
        let normalized = title.trim().replace(' ', "_");

        let mut url = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| AgentError::Network(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| AgentError::Network("endpoint cannot be a base URL".to_string()))?
            .push(&normalized);

        let response = self.client.get(url).send().await.map_err(map_transport)?;

        if response.status().as_u16() == 404 {
            return Err(AgentError::NotFound(title.to_string()));
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Upstream { status, body });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))?;

        format_summary(&data)
    }
}

/// Render title, extract, and canonical URL (when present).
fn format_summary(data: &serde_json::Value) -> Result<String, AgentError> {
    let title = data
        .get("title")
        .and_then(|t| t.as_str())
        .ok_or_else(|| AgentError::Parse("missing title".to_string()))?;

    let extract = data
        .get("extract")
        .and_then(|e| e.as_str())
        .ok_or_else(|| AgentError::Parse("missing extract".to_string()))?;

    let mut out = format!("{}\n\n{}", title, extract);

    if let Some(url) = data
        .get("content_urls")
        .and_then(|c| c.get("desktop"))
        .and_then(|d| d.get("page"))
        .and_then(|p| p.as_str())
    {
        out.push_str(&format!("\n\nSource: {}", url));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_with_source_link() {
        let data = json!({
            "title": "Tokyo",
            "extract": "Tokyo is the capital of Japan.",
            "content_urls": {"desktop": {"page": "https://en.wikipedia.org/wiki/Tokyo"}},
        });
        let out = format_summary(&data).unwrap();
        assert!(out.starts_with("Tokyo\n\nTokyo is the capital of Japan."));
        assert!(out.ends_with("Source: https://en.wikipedia.org/wiki/Tokyo"));
    }

    #[test]
    fn test_format_without_source_link() {
        let data = json!({"title": "Tokyo", "extract": "Capital of Japan."});
        let out = format_summary(&data).unwrap();
        assert_eq!(out, "Tokyo\n\nCapital of Japan.");
    }

    #[test]
    fn test_missing_extract_is_a_parse_error() {
        let data = json!({"title": "Tokyo"});
        assert!(matches!(format_summary(&data), Err(AgentError::Parse(_))));
    }
}
