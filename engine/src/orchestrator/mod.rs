//! Orchestration loop
//!
//! Drives a multi-turn exchange with the chat provider: send the user
//! query, execute the tool invocations the model requests, feed the
//! results back, and repeat until the model produces a final answer or
//! the turn budget runs out.

mod core;
mod history;

pub use self::core::{Orchestrator, MAX_TURNS};
pub use self::history::ContextWindow;

use serde::{Deserialize, Serialize};

/// Outcome of one executed tool invocation, paired with what was asked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentCallRecord {
    /// Operation name the model requested
    pub name: String,

    /// Arguments the model supplied
    pub arguments: serde_json::Value,

    /// What the invocation produced
    pub outcome: AgentOutcome,
}

/// Success payload or error text for one invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum AgentOutcome {
    /// The agent produced a textual payload
    Success(String),

    /// The invocation failed; the text is what the model sees
    Error(String),
}

impl AgentOutcome {
    /// The text fed back to the model, error or not.
    pub fn text(&self) -> &str {
        match self {
            AgentOutcome::Success(s) => s,
            AgentOutcome::Error(e) => e,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AgentOutcome::Error(_))
    }
}

/// Result of one full orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutcome {
    /// The original user query
    pub query: String,

    /// Intermediate reasoning fragments the model surfaced alongside
    /// its tool calls, in order
    pub thoughts: Vec<String>,

    /// Every invocation executed, in request order across turns
    pub agent_calls: Vec<AgentCallRecord>,

    /// Final answer text
    pub answer: String,

    /// Wall-clock latency from request start to answer
    pub latency_ms: u64,

    /// False when the turn budget ran out before the model converged
    pub complete: bool,
}
