//! OpenAI Chat Provider
//!
//! Implements the ChatProvider trait against the chat/completions API
//! with native tool calling. OpenAI serializes tool-call arguments as a
//! JSON string on the wire; this provider parses them into a value on
//! the way in and re-encodes them on the way out.

use super::{ChatProvider, LLMError, Message, MessageRole, ModelTurn, ToolCall, ToolSpec};
use crate::config::OpenAiConfig;
use async_trait::async_trait;
use serde_json::json;

pub struct OpenAiProvider {
    config: OpenAiConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig, api_key: impl Into<String>) -> Self {
        Self {
            config,
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Convert our message history into chat/completions message objects.
    fn build_messages(system: &str, messages: &[Message]) -> Vec<serde_json::Value> {
        let mut api_messages = vec![json!({"role": "system", "content": system})];
        for msg in messages {
            match msg.role {
                MessageRole::User => {
                    api_messages.push(json!({"role": "user", "content": msg.content}));
                }
                MessageRole::Assistant => {
                    let mut obj = json!({"role": "assistant", "content": msg.content});
                    if !msg.tool_calls.is_empty() {
                        let calls: Vec<serde_json::Value> = msg
                            .tool_calls
                            .iter()
                            .map(|c| {
                                json!({
                                    "id": c.id,
                                    "type": "function",
                                    "function": {
                                        "name": c.name,
                                        "arguments": c.arguments.to_string(),
                                    }
                                })
                            })
                            .collect();
                        obj["tool_calls"] = json!(calls);
                    }
                    api_messages.push(obj);
                }
                MessageRole::Tool => {
                    api_messages.push(json!({
                        "role": "tool",
                        "tool_call_id": msg.tool_call_id.clone().unwrap_or_default(),
                        "content": msg.content,
                    }));
                }
            }
        }
        api_messages
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(
        &self,
        system: &str,
        tools: &[ToolSpec],
        messages: &[Message],
    ) -> super::Result<ModelTurn> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let api_tools: Vec<serde_json::Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();

        let payload = json!({
            "model": self.config.model,
            "messages": Self::build_messages(system, messages),
            "tools": api_tools,
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
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

        let message = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("message"))
            .ok_or_else(|| LLMError::ParseError("No message in response".to_string()))?;

        let text = message
            .get("content")
            .and_then(|c| c.as_str())
            .filter(|c| !c.is_empty())
            .map(String::from);

        let mut tool_calls = Vec::new();
        if let Some(calls) = message.get("tool_calls").and_then(|c| c.as_array()) {
            for call in calls {
                let id = call
                    .get("id")
                    .and_then(|i| i.as_str())
                    .ok_or_else(|| LLMError::ParseError("tool_call without id".to_string()))?;
                let function = call
                    .get("function")
                    .ok_or_else(|| LLMError::ParseError("tool_call without function".to_string()))?;
                let name = function
                    .get("name")
                    .and_then(|n| n.as_str())
                    .ok_or_else(|| LLMError::ParseError("tool_call without name".to_string()))?;
                let arguments = function
                    .get("arguments")
                    .and_then(|a| a.as_str())
                    .map(serde_json::from_str)
                    .transpose()
                    .map_err(|e| {
                        LLMError::ParseError(format!("Malformed tool_call arguments: {}", e))
                    })?
                    .unwrap_or_else(|| json!({}));
                tool_calls.push(ToolCall::new(id, name, arguments));
            }
        }

        if text.is_none() && tool_calls.is_empty() {
            return Err(LLMError::ParseError("Empty model turn".to_string()));
        }

        Ok(ModelTurn { text, tool_calls })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_messages_prepends_system() {
        let messages = vec![Message::user("Hello")];
        let api = OpenAiProvider::build_messages("You are Atlas.", &messages);

        assert_eq!(api.len(), 2);
        assert_eq!(api[0]["role"], "system");
        assert_eq!(api[0]["content"], "You are Atlas.");
        assert_eq!(api[1]["role"], "user");
    }

    #[test]
    fn test_build_messages_tool_roundtrip_shape() {
        let call = ToolCall::new("call_9", "query_wikidata", json!({"query": "SELECT ?x"}));
        let messages = vec![
            Message::assistant_tool_calls("", vec![call.clone()]),
            Message::tool_result("3 rows", &call),
        ];

        let api = OpenAiProvider::build_messages("sys", &messages);
        // Arguments travel as an encoded JSON string
        let encoded = api[1]["tool_calls"][0]["function"]["arguments"]
            .as_str()
            .unwrap();
        let decoded: serde_json::Value = serde_json::from_str(encoded).unwrap();
        assert_eq!(decoded["query"], "SELECT ?x");

        assert_eq!(api[2]["role"], "tool");
        assert_eq!(api[2]["tool_call_id"], "call_9");
    }
}
