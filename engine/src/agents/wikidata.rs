//! Wikidata SPARQL agent
//!
//! Executes validated read-only SPARQL queries against the query service
//! and renders the `head.vars` / `results.bindings` JSON shape as a
//! short row-per-line table. Result rows are capped so a broad query
//! cannot flood the model's context.

use super::{map_transport, AgentError, NO_RESULTS};
use std::time::Duration;

/// Maximum number of result rows rendered for the model
const MAX_ROWS: usize = 10;

pub struct WikidataAgent {
    endpoint: String,
    client: reqwest::Client,
}

impl WikidataAgent {
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

    /// Execute a SPARQL query and render the bindings.
    pub async fn query(&self, sparql: &str) -> Result<String, AgentError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("query", sparql), ("format", "json")])
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

        format_bindings(&data)
    }
}

/// Render a SPARQL JSON result set as `var: value` lines, one row per
/// line, capped at [`MAX_ROWS`].
fn format_bindings(data: &serde_json::Value) -> Result<String, AgentError> {
    let vars: Vec<&str> = data
        .get("head")
        .and_then(|h| h.get("vars"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| AgentError::Parse("missing head.vars".to_string()))?
        .iter()
        .filter_map(|v| v.as_str())
        .collect();

    let bindings = data
        .get("results")
        .and_then(|r| r.get("bindings"))
        .and_then(|b| b.as_array())
        .ok_or_else(|| AgentError::Parse("missing results.bindings".to_string()))?;

    if bindings.is_empty() {
        return Ok(NO_RESULTS.to_string());
    }

    let mut lines = Vec::new();
    for row in bindings.iter().take(MAX_ROWS) {
        let cells: Vec<String> = vars
            .iter()
            .filter_map(|var| {
                row.get(*var)
                    .and_then(|cell| cell.get("value"))
                    .and_then(|v| v.as_str())
                    .map(|value| format!("{}: {}", var, value))
            })
            .collect();
        lines.push(cells.join(", "));
    }

    if bindings.len() > MAX_ROWS {
        lines.push(format!(
            "(showing {} of {} rows)",
            MAX_ROWS,
            bindings.len()
        ));
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result_set(rows: usize) -> serde_json::Value {
        let bindings: Vec<serde_json::Value> = (0..rows)
            .map(|i| {
                json!({
                    "city": {"type": "uri", "value": format!("http://www.wikidata.org/entity/Q{}", i)},
                    "population": {"type": "literal", "value": format!("{}", 1000 * (i + 1))},
                })
            })
            .collect();
        json!({
            "head": {"vars": ["city", "population"]},
            "results": {"bindings": bindings},
        })
    }

    #[test]
    fn test_format_rows() {
        let out = format_bindings(&result_set(2)).unwrap();
        assert_eq!(
            out,
            "city: http://www.wikidata.org/entity/Q0, population: 1000\n\
             city: http://www.wikidata.org/entity/Q1, population: 2000"
        );
    }

    #[test]
    fn test_empty_bindings_yield_marker() {
        let out = format_bindings(&result_set(0)).unwrap();
        assert_eq!(out, NO_RESULTS);
    }

    #[test]
    fn test_rows_are_capped() {
        let out = format_bindings(&result_set(25)).unwrap();
        assert_eq!(out.lines().count(), MAX_ROWS + 1);
        assert!(out.ends_with("(showing 10 of 25 rows)"));
    }

    #[test]
    fn test_unbound_variables_are_skipped() {
        let data = json!({
            "head": {"vars": ["a", "b"]},
            "results": {"bindings": [{"a": {"type": "literal", "value": "only"}}]},
        });
        assert_eq!(format_bindings(&data).unwrap(), "a: only");
    }

    #[test]
    fn test_malformed_shape_is_a_parse_error() {
        let data = json!({"unexpected": true});
        assert!(matches!(
            format_bindings(&data),
            Err(AgentError::Parse(_))
        ));
    }
}
