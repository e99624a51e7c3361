//! Context window for the orchestration loop
//!
//! Holds the message history handed to the chat provider and trims the
//! oldest messages when the estimated token count grows past the limit.
//! A tool-call exchange (the assistant message requesting calls plus the
//! tool results answering it) is always dropped as a unit, so the
//! provider never sees an orphaned half-exchange.

use crate::llm::{Message, MessageRole};

/// Default context limit in tokens (conservative estimate for most models)
const DEFAULT_CONTEXT_LIMIT: usize = 8000;

/// Average tokens per character (rough estimate: 1 token ≈ 4 characters)
const CHARS_PER_TOKEN: usize = 4;

/// Message history bounded by an estimated token budget
#[derive(Debug, Clone)]
pub struct ContextWindow {
    /// Messages in conversation order
    messages: Vec<Message>,

    /// Maximum number of tokens allowed in context
    context_limit: usize,

    /// Current estimated token count
    token_count: usize,
}

impl ContextWindow {
    /// Create a new context window with the default limit
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_CONTEXT_LIMIT)
    }

    /// Create a new context window with a specific token limit
    pub fn with_limit(context_limit: usize) -> Self {
        Self {
            messages: Vec::new(),
            context_limit,
            token_count: 0,
        }
    }

    /// Append a message, trimming old messages if the limit is exceeded.
    pub fn push(&mut self, message: Message) {
        self.token_count += Self::estimate_tokens(&message);
        self.messages.push(message);

        if self.token_count > self.context_limit {
            self.trim();
        }
    }

    /// All messages currently in the window
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current estimated token count
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Remove the oldest messages until the estimate fits the limit,
    /// always keeping at least the most recent exchange.
    fn trim(&mut self) {
        while self.token_count > self.context_limit && self.messages.len() > 2 {
            let group = self.front_group_len();
            if group >= self.messages.len() {
                break;
            }
            for removed in self.messages.drain(..group) {
                self.token_count = self
                    .token_count
                    .saturating_sub(Self::estimate_tokens(&removed));
            }
        }
    }

    /// Length of the unit at the front of the window: a lone message, or
    /// an assistant tool-call message together with the tool results
    /// that answer it.
    fn front_group_len(&self) -> usize {
        let Some(first) = self.messages.first() else {
            return 0;
        };

        let mut len = 1;
        if first.role == MessageRole::Assistant && !first.tool_calls.is_empty()
            || first.role == MessageRole::Tool
        {
            while len < self.messages.len() && self.messages[len].role == MessageRole::Tool {
                len += 1;
            }
        }
        len
    }

    /// Estimate the number of tokens in a message.
    ///
    /// Character-count heuristic; different tokenizers will differ, but
    /// this is close enough for budget enforcement.
    fn estimate_tokens(message: &Message) -> usize {
        let content_chars = message.content.len();
        let call_chars: usize = message
            .tool_calls
            .iter()
            .map(|c| c.name.len() + c.arguments.to_string().len())
            .sum();

        let overhead = 10;
        (content_chars + call_chars).div_ceil(CHARS_PER_TOKEN) + overhead
    }
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new()
    }
}
