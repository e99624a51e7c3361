//! Gemini Chat Provider
//!
//! Implements the ChatProvider trait against the Gemini generateContent
//! API using native function calling: tool schemas are sent as
//! functionDeclarations, the model's requested invocations come back as
//! functionCall parts, and tool results are returned as functionResponse
//! parts. Gemini does not assign call identifiers, so this provider
//! synthesizes one per functionCall.

use super::{ChatProvider, LLMError, Message, MessageRole, ModelTurn, ToolCall, ToolSpec};
use crate::config::GeminiConfig;
use async_trait::async_trait;
use serde_json::json;

pub struct GeminiProvider {
    config: GeminiConfig,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig, api_key: impl Into<String>) -> Self {
        Self {
            config,
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Convert our message history into Gemini `contents` entries.
    ///
    /// Assistant messages become `model` turns carrying text and
    /// functionCall parts; tool results become `user` turns carrying a
    /// functionResponse part keyed by operation name.
    fn build_contents(messages: &[Message]) -> Vec<serde_json::Value> {
        let mut contents = Vec::new();
        for msg in messages {
            match msg.role {
                MessageRole::User => {
                    contents.push(json!({
                        "role": "user",
                        "parts": [{"text": msg.content}]
                    }));
                }
                MessageRole::Assistant => {
                    let mut parts = Vec::new();
                    if !msg.content.is_empty() {
                        parts.push(json!({"text": msg.content}));
                    }
                    for call in &msg.tool_calls {
                        parts.push(json!({
                            "functionCall": {
                                "name": call.name,
                                "args": call.arguments,
                            }
                        }));
                    }
                    contents.push(json!({"role": "model", "parts": parts}));
                }
                MessageRole::Tool => {
                    let name = msg.tool_name.clone().unwrap_or_default();
                    contents.push(json!({
                        "role": "user",
                        "parts": [{
                            "functionResponse": {
                                "name": name,
                                "response": {"content": msg.content},
                            }
                        }]
                    }));
                }
            }
        }
        contents
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        system: &str,
        tools: &[ToolSpec],
        messages: &[Message],
    ) -> super::Result<ModelTurn> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );

        let declarations: Vec<serde_json::Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                })
            })
            .collect();

        let payload = json!({
            "system_instruction": {"parts": [{"text": system}]},
            "contents": Self::build_contents(messages),
            "tools": [{"function_declarations": declarations}],
        });

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(LLMError::AuthenticationFailed(text));
            } else if status.as_u16() == 429 {
                return Err(LLMError::RateLimitExceeded);
            } else {
                return Err(LLMError::InvalidRequest(text));
            }
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let parts = data
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.as_array())
            .ok_or_else(|| LLMError::ParseError("No candidate parts in response".to_string()))?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for part in parts {
            if let Some(t) = part.get("text").and_then(|t| t.as_str()) {
                text.push_str(t);
            }
            if let Some(fc) = part.get("functionCall") {
                let name = fc
                    .get("name")
                    .and_then(|n| n.as_str())
                    .ok_or_else(|| LLMError::ParseError("functionCall without name".to_string()))?;
                let args = fc.get("args").cloned().unwrap_or_else(|| json!({}));
                tool_calls.push(ToolCall::new(
                    format!("call_{}", uuid::Uuid::new_v4()),
                    name,
                    args,
                ));
            }
        }

        Ok(ModelTurn {
            text: if text.is_empty() { None } else { Some(text) },
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_contents_roles() {
        let call = ToolCall::new("call_1", "geocode_place", json!({"query": "Oslo"}));
        let messages = vec![
            Message::user("Where is Oslo?"),
            Message::assistant_tool_calls("Checking.", vec![call.clone()]),
            Message::tool_result("Oslo, Norway (59.91, 10.75)", &call),
        ];

        let contents = GeminiProvider::build_contents(&messages);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["role"], "user");

        // Assistant turn carries both the thought text and the call
        let parts = contents[1]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["functionCall"]["name"], "geocode_place");

        // Tool result pairs by operation name
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"]["name"],
            "geocode_place"
        );
    }

    #[test]
    fn test_build_contents_skips_empty_assistant_text() {
        let call = ToolCall::new("call_1", "get_weather", json!({}));
        let messages = vec![Message::assistant_tool_calls("", vec![call])];

        let contents = GeminiProvider::build_contents(&messages);
        let parts = contents[0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert!(parts[0].get("functionCall").is_some());
    }
}
