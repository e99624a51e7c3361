//! Knowledge agents
//!
//! Each agent wraps one external HTTP API: build the request, call it,
//! and map the response into a short human-readable string the model can
//! read. The registry owns the four agents plus the SPARQL validation
//! gate and dispatches model-requested invocations by operation name,
//! rejecting unknown names outright.
//!
//! Agents perform no retries; a single failed call becomes a single
//! visible error to the model.

pub mod geocoding;
pub mod weather;
pub mod wikidata;
pub mod wikipedia;

pub use geocoding::GeocodingAgent;
pub use weather::WeatherAgent;
pub use wikidata::WikidataAgent;
pub use wikipedia::WikipediaAgent;

use crate::config::AgentsConfig;
use crate::llm::ToolSpec;
use crate::validator::{SparqlValidator, ValidationError};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

/// Marker returned when an upstream answers successfully with nothing in it.
pub const NO_RESULTS: &str = "No results found.";

/// Errors that can occur during an agent invocation
#[derive(Debug, Error)]
pub enum AgentError {
    /// The query failed the validation gate
    #[error(transparent)]
    Rejected(#[from] ValidationError),

    /// The upstream did not answer within the timeout
    #[error("Request timed out")]
    Timeout,

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream answered with a non-success status
    #[error("Upstream error ({status}): {body}")]
    Upstream { status: u16, body: String },

    /// The upstream signalled absence with a not-found status
    #[error("No entry found for '{0}'")]
    NotFound(String),

    /// Upstream answered 2xx but the body did not have the expected shape
    #[error("Malformed upstream response: {0}")]
    Parse(String),

    /// The model asked for an operation that does not exist
    #[error("Unsupported operation '{0}'")]
    UnknownOperation(String),

    /// A required argument was missing or of the wrong type
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Map a reqwest transport error into an [`AgentError`].
pub(crate) fn map_transport(e: reqwest::Error) -> AgentError {
    if e.is_timeout() {
        AgentError::Timeout
    } else {
        AgentError::Network(e.to_string())
    }
}

/// Registry of the knowledge agents, dispatched by operation name.
pub struct AgentRegistry {
    wikidata: WikidataAgent,
    wikipedia: WikipediaAgent,
    geocoding: GeocodingAgent,
    weather: WeatherAgent,
    validator: SparqlValidator,
}

impl AgentRegistry {
    /// Build the registry from configuration.
    pub fn new(config: &AgentsConfig) -> Self {
        Self {
            wikidata: WikidataAgent::new(&config.wikidata_endpoint, config.timeout_secs),
            wikipedia: WikipediaAgent::new(&config.wikipedia_endpoint, config.timeout_secs),
            geocoding: GeocodingAgent::new(&config.nominatim_endpoint, config.timeout_secs),
            weather: WeatherAgent::new(&config.open_meteo_endpoint, config.timeout_secs),
            validator: SparqlValidator::new(),
        }
    }

    /// Dispatch one invocation by operation name.
    ///
    /// Graph queries pass through the validation gate before any network
    /// call; a rejection comes back as an error without touching the
    /// endpoint. Unknown operation names are rejected rather than
    /// silently ignored.
    pub async fn dispatch(
        &self,
        name: &str,
        args: &serde_json::Value,
    ) -> Result<String, AgentError> {
        debug!("Dispatching '{}' with args: {}", name, args);

        match name {
            "query_wikidata" => {
                let query = str_arg(args, "query")?;
                self.validator.validate(query)?;
                self.wikidata.query(query).await
            }
            "wikipedia_summary" => {
                let title = str_arg(args, "title")?;
                self.wikipedia.summary(title).await
            }
            "geocode_place" => {
                let place = str_arg(args, "query")?;
                self.geocoding.search(place).await
            }
            "get_weather" => {
                let latitude = f64_arg(args, "latitude")?;
                let longitude = f64_arg(args, "longitude")?;
                let forecast = args
                    .get("forecast")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                self.weather.current(latitude, longitude, forecast).await
            }
            _ => Err(AgentError::UnknownOperation(name.to_string())),
        }
    }

    /// The fixed schema list advertised to the chat provider.
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "query_wikidata".to_string(),
                description: "Run a read-only SPARQL SELECT/ASK query against Wikidata. \
                              Use the standard wd:/wdt: prefixes; they are predeclared. \
                              Returns up to 10 result rows."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "The SPARQL query to execute"
                        }
                    },
                    "required": ["query"]
                }),
            },
            ToolSpec {
                name: "wikipedia_summary".to_string(),
                description: "Fetch the introductory summary of an English Wikipedia \
                              article by title."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "title": {
                            "type": "string",
                            "description": "Article title, e.g. \"Tokyo\""
                        }
                    },
                    "required": ["title"]
                }),
            },
            ToolSpec {
                name: "geocode_place".to_string(),
                description: "Resolve a free-text place description to candidate \
                              locations with coordinates."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Place description, e.g. \"Eiffel Tower\""
                        }
                    },
                    "required": ["query"]
                }),
            },
            ToolSpec {
                name: "get_weather".to_string(),
                description: "Get current weather conditions for a coordinate pair, \
                              optionally with a 3-day forecast."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "latitude": {"type": "number"},
                        "longitude": {"type": "number"},
                        "forecast": {
                            "type": "boolean",
                            "description": "Include a short daily forecast"
                        }
                    },
                    "required": ["latitude", "longitude"]
                }),
            },
        ]
    }

    /// System instruction for the chat session.
    pub fn system_prompt(&self) -> String {
        [
            "You are Atlas, a research assistant that answers questions using \
             external knowledge services.",
            "",
            "Guidelines:",
            "1. Use query_wikidata for structured facts (populations, dates, \
             relationships between entities). Queries must be read-only.",
            "2. Use wikipedia_summary for background prose about a topic.",
            "3. Use geocode_place to turn place names into coordinates, then \
             get_weather for conditions there.",
            "4. If a tool returns an error, adjust the request and retry, or \
             explain the limitation to the user.",
            "5. When you have enough information, answer in plain language and \
             mention which sources you used.",
        ]
        .join("\n")
    }
}

/// Extract a required string argument.
fn str_arg<'a>(args: &'a serde_json::Value, key: &str) -> Result<&'a str, AgentError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AgentError::InvalidArguments(format!("missing string field '{}'", key)))
}

/// Extract a required numeric argument.
fn f64_arg(args: &serde_json::Value, key: &str) -> Result<f64, AgentError> {
    args.get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| AgentError::InvalidArguments(format!("missing number field '{}'", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentsConfig;

    fn registry() -> AgentRegistry {
        AgentRegistry::new(&AgentsConfig::default())
    }

    #[tokio::test]
    async fn test_unknown_operation_rejected() {
        let err = registry().dispatch("launch_rocket", &json!({})).await;
        match err {
            Err(AgentError::UnknownOperation(name)) => assert_eq!(name, "launch_rocket"),
            other => panic!("Expected UnknownOperation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_argument_rejected() {
        let err = registry().dispatch("wikipedia_summary", &json!({})).await;
        assert!(matches!(err, Err(AgentError::InvalidArguments(_))));
    }

    #[tokio::test]
    async fn test_forbidden_query_rejected_before_network() {
        // Validation runs before any network I/O, so this fails locally
        let err = registry()
            .dispatch("query_wikidata", &json!({"query": "DELETE WHERE { ?x ?y ?z }"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("DELETE"));
    }

    #[test]
    fn test_tool_specs_cover_all_operations() {
        let names: Vec<String> = registry()
            .tool_specs()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "query_wikidata",
                "wikipedia_summary",
                "geocode_place",
                "get_weather"
            ]
        );
    }

    #[test]
    fn test_system_prompt_mentions_operations() {
        let prompt = registry().system_prompt();
        assert!(prompt.contains("query_wikidata"));
        assert!(prompt.contains("get_weather"));
    }
}
