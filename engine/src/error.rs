//! Engine error types
//!
//! The error taxonomy follows the recovery policy of the orchestration
//! loop: agent and validation failures are converted into textual tool
//! results the model can route around, so they never appear here. The
//! variants below are the conditions that escalate to the caller.

use thiserror::Error;

/// Errors that escalate out of the engine to the HTTP layer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The chat provider transport itself failed; fatal to the request
    #[error("Chat transport error: {0}")]
    ChatTransport(String),

    /// Unknown conversation identifier
    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    /// A caller-supplied argument was malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl EngineError {
    /// Returns whether the error is recoverable by the caller.
    ///
    /// Not-found and bad-argument errors are request-scoped; transport
    /// and configuration failures typically require intervention.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::ConversationNotFound(_) | EngineError::InvalidArgument(_)
        )
    }
}
