//! Orchestration loop core
//!
//! Coordinates the multi-turn exchange with the chat provider. Each
//! turn either ends the run (no tool calls requested) or fans out the
//! requested invocations, feeds the results back, and continues. A hard
//! turn budget keeps a non-converging model from looping forever.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::agents::AgentRegistry;
use crate::error::EngineError;
use crate::llm::{router::ProviderRouter, Message};

use super::{AgentCallRecord, AgentOutcome, ContextWindow, QueryOutcome};

/// Maximum number of chat calls per query
pub const MAX_TURNS: usize = 10;

/// Answer text reported when the turn budget runs out
const INCOMPLETE_ANSWER: &str = "I was unable to reach a final answer within the allotted \
     number of reasoning turns. The agent call trace contains what was gathered so far.";

/// Drives the think-act-observe loop over the provider router and the
/// agent registry. Holds no mutable state; each `run` is independent.
pub struct Orchestrator {
    router: Arc<ProviderRouter>,
    registry: Arc<AgentRegistry>,
}

impl Orchestrator {
    pub fn new(router: Arc<ProviderRouter>, registry: Arc<AgentRegistry>) -> Self {
        Self { router, registry }
    }

    /// Run one query to completion.
    ///
    /// `prior` seeds the chat context with earlier conversation history.
    /// Agent failures are converted into error-tagged results the model
    /// can see; only a failure of the chat transport itself escalates.
    pub async fn run(
        &self,
        query: &str,
        prior: &[Message],
    ) -> Result<QueryOutcome, EngineError> {
        let start = Instant::now();
        let system = self.registry.system_prompt();
        let tools = self.registry.tool_specs();

        let mut window = ContextWindow::new();
        for message in prior {
            window.push(message.clone());
        }
        window.push(Message::user(query));

        let mut thoughts: Vec<String> = Vec::new();
        let mut agent_calls: Vec<AgentCallRecord> = Vec::new();

        for turn in 1..=MAX_TURNS {
            debug!("Query turn {}/{}", turn, MAX_TURNS);

            let (model_turn, provider) = self
                .router
                .call(&system, &tools, window.messages())
                .await
                .map_err(|e| EngineError::ChatTransport(e.to_string()))?;

            if model_turn.is_final() {
                let answer = model_turn.text.unwrap_or_default();
                let latency_ms = start.elapsed().as_millis() as u64;
                info!(
                    "Query answered by {} in {}ms after {} turn(s), {} agent call(s)",
                    provider,
                    latency_ms,
                    turn,
                    agent_calls.len()
                );
                return Ok(QueryOutcome {
                    query: query.to_string(),
                    thoughts,
                    agent_calls,
                    answer,
                    latency_ms,
                    complete: true,
                });
            }

            let text = model_turn.text.unwrap_or_default();
            if !text.trim().is_empty() {
                thoughts.push(text.clone());
            }

            let calls = model_turn.tool_calls;
            debug!(
                "Model requested {} invocation(s): {:?}",
                calls.len(),
                calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
            );
            window.push(Message::assistant_tool_calls(text, calls.clone()));

            // Invocations within one turn are independent; dispatch them
            // together and pair each outcome back to its call by position.
            let outcomes = join_all(calls.iter().map(|call| {
                let registry = Arc::clone(&self.registry);
                async move {
                    match registry.dispatch(&call.name, &call.arguments).await {
                        Ok(result) => AgentOutcome::Success(result),
                        Err(e) => {
                            warn!("Invocation '{}' failed: {}", call.name, e);
                            AgentOutcome::Error(e.to_string())
                        }
                    }
                }
            }))
            .await;

            for (call, outcome) in calls.iter().zip(outcomes) {
                window.push(Message::tool_result(outcome.text(), call));
                agent_calls.push(AgentCallRecord {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                    outcome,
                });
            }
        }

        // The budget is spent and the model still wants tools; report an
        // incomplete result rather than issuing another chat call.
        warn!("Query hit the {}-turn budget without converging", MAX_TURNS);
        Ok(QueryOutcome {
            query: query.to_string(),
            thoughts,
            agent_calls,
            answer: INCOMPLETE_ANSWER.to_string(),
            latency_ms: start.elapsed().as_millis() as u64,
            complete: false,
        })
    }
}
