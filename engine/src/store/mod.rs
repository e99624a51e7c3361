//! In-memory conversation store
//!
//! Holds bounded, addressable chat history and derived usage metrics
//! across requests. The store is a plain mutable structure; the HTTP
//! layer serializes access behind a mutex, since axum handlers run on a
//! genuinely parallel runtime.
//!
//! Capacity policy: when the number of held conversations exceeds the
//! configured maximum, the least-recently-updated conversations beyond
//! that maximum are evicted. This bounds memory growth in a
//! long-running process that has no external persistence.

use crate::error::EngineError;
use crate::llm::Message;
use crate::orchestrator::AgentCallRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Display budget for derived conversation titles, in characters
const TITLE_MAX_CHARS: usize = 50;

/// Title used until the first user message arrives
const UNTITLED: &str = "New conversation";

/// Role of a stored chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One stored message, with the agent-call trace for assistant turns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,

    /// Invocations executed while producing this message (assistant only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_calls: Vec<AgentCallRecord>,
}

/// Aggregate usage metadata for one conversation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    /// Completed queries (assistant turns)
    pub queries: u64,

    /// Cumulative wall-clock latency of completed queries
    pub total_latency_ms: u64,

    /// Distinct operation names used across the conversation
    pub agents_used: BTreeSet<String>,
}

/// One conversation: identifier, title, ordered messages, stats
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
    pub stats: UsageStats,

    /// Monotonic recency marker; timestamps can collide within a
    /// millisecond, this cannot.
    #[serde(skip)]
    last_touch: u64,
}

/// Listing entry for one conversation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Bounded map of conversations with recency-based eviction
pub struct ConversationStore {
    conversations: HashMap<String, Conversation>,
    max_conversations: usize,
    touch_counter: u64,
}

impl ConversationStore {
    /// Create a store holding at most `max_conversations` conversations.
    pub fn new(max_conversations: usize) -> Self {
        Self {
            conversations: HashMap::new(),
            max_conversations: max_conversations.max(1),
            touch_counter: 0,
        }
    }

    /// Create a conversation, evicting the least-recently-updated ones
    /// if the store is over capacity. Returns a snapshot of the new
    /// conversation.
    pub fn create(&mut self, title: Option<String>) -> Conversation {
        self.touch_counter += 1;
        let now = Utc::now();
        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.unwrap_or_else(|| UNTITLED.to_string()),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
            stats: UsageStats::default(),
            last_touch: self.touch_counter,
        };
        let snapshot = conversation.clone();
        self.conversations
            .insert(conversation.id.clone(), conversation);
        self.evict_over_capacity();
        snapshot
    }

    /// Fetch a conversation by identifier.
    pub fn get(&self, id: &str) -> Result<&Conversation, EngineError> {
        self.conversations
            .get(id)
            .ok_or_else(|| EngineError::ConversationNotFound(id.to_string()))
    }

    /// All conversations, most recently updated first.
    pub fn list(&self) -> Vec<ConversationSummary> {
        let mut entries: Vec<&Conversation> = self.conversations.values().collect();
        entries.sort_by(|a, b| b.last_touch.cmp(&a.last_touch));
        entries
            .into_iter()
            .map(|c| ConversationSummary {
                id: c.id.clone(),
                title: c.title.clone(),
                created_at: c.created_at,
                updated_at: c.updated_at,
                message_count: c.messages.len(),
            })
            .collect()
    }

    /// Append a user message.
    ///
    /// The first user message always (re)derives the conversation title,
    /// truncated to the display budget with an ellipsis when cut.
    pub fn append_user(&mut self, id: &str, content: impl Into<String>) -> Result<(), EngineError> {
        self.touch_counter += 1;
        let touch = self.touch_counter;
        let conversation = self
            .conversations
            .get_mut(id)
            .ok_or_else(|| EngineError::ConversationNotFound(id.to_string()))?;

        let content = content.into();
        let is_first_user_message = !conversation
            .messages
            .iter()
            .any(|m| m.role == ChatRole::User);
        if is_first_user_message {
            conversation.title = derive_title(&content);
        }

        conversation.messages.push(ChatMessage {
            role: ChatRole::User,
            content,
            timestamp: Utc::now(),
            agent_calls: Vec::new(),
        });
        conversation.updated_at = Utc::now();
        conversation.last_touch = touch;
        Ok(())
    }

    /// Append an assistant message, folding the completed turn's latency
    /// and distinct operation names into the aggregate stats.
    pub fn append_assistant(
        &mut self,
        id: &str,
        content: impl Into<String>,
        latency_ms: u64,
        agent_calls: Vec<AgentCallRecord>,
    ) -> Result<(), EngineError> {
        self.touch_counter += 1;
        let touch = self.touch_counter;
        let conversation = self
            .conversations
            .get_mut(id)
            .ok_or_else(|| EngineError::ConversationNotFound(id.to_string()))?;

        for call in &agent_calls {
            conversation.stats.agents_used.insert(call.name.clone());
        }
        conversation.stats.queries += 1;
        conversation.stats.total_latency_ms += latency_ms;

        conversation.messages.push(ChatMessage {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            agent_calls,
        });
        conversation.updated_at = Utc::now();
        conversation.last_touch = touch;
        Ok(())
    }

    /// The conversation's history as chat-provider messages, for seeding
    /// the next orchestration run.
    pub fn history(&self, id: &str) -> Result<Vec<Message>, EngineError> {
        let conversation = self.get(id)?;
        Ok(conversation
            .messages
            .iter()
            .map(|m| match m.role {
                ChatRole::User => Message::user(&m.content),
                ChatRole::Assistant => Message::assistant(&m.content),
            })
            .collect())
    }

    /// Remove one conversation.
    pub fn remove(&mut self, id: &str) -> Result<(), EngineError> {
        self.conversations
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| EngineError::ConversationNotFound(id.to_string()))
    }

    /// Remove every conversation.
    pub fn clear(&mut self) {
        self.conversations.clear();
    }

    /// Number of conversations currently held.
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Drop least-recently-updated conversations beyond the maximum.
    fn evict_over_capacity(&mut self) {
        while self.conversations.len() > self.max_conversations {
            let oldest = self
                .conversations
                .values()
                .min_by_key(|c| c.last_touch)
                .map(|c| c.id.clone());
            if let Some(id) = oldest {
                debug!("Evicting conversation {}", id);
                self.conversations.remove(&id);
            } else {
                break;
            }
        }
    }
}

/// Derive a display title from the first user message.
fn derive_title(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= TITLE_MAX_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}…", cut.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::AgentOutcome;
    use serde_json::json;

    fn record(name: &str) -> AgentCallRecord {
        AgentCallRecord {
            name: name.to_string(),
            arguments: json!({}),
            outcome: AgentOutcome::Success("ok".to_string()),
        }
    }

    #[test]
    fn test_create_and_get() {
        let mut store = ConversationStore::new(10);
        let created = store.create(None);

        let fetched = store.get(&created.id).unwrap();
        assert_eq!(fetched.title, UNTITLED);
        assert!(fetched.messages.is_empty());
        assert_eq!(fetched.stats.queries, 0);
    }

    #[test]
    fn test_get_unknown_id_fails() {
        let store = ConversationStore::new(10);
        assert!(matches!(
            store.get("missing"),
            Err(EngineError::ConversationNotFound(_))
        ));
    }

    #[test]
    fn test_first_user_message_derives_title() {
        let mut store = ConversationStore::new(10);
        let id = store.create(Some("Provided".to_string())).id;

        store.append_user(&id, "What is the population of Tokyo?").unwrap();
        assert_eq!(
            store.get(&id).unwrap().title,
            "What is the population of Tokyo?"
        );

        // Later messages leave the title alone
        store.append_user(&id, "And of Osaka?").unwrap();
        assert_eq!(
            store.get(&id).unwrap().title,
            "What is the population of Tokyo?"
        );
    }

    #[test]
    fn test_long_title_truncated_with_ellipsis() {
        let mut store = ConversationStore::new(10);
        let id = store.create(None).id;

        let long = "a".repeat(80);
        store.append_user(&id, long).unwrap();

        let title = &store.get(&id).unwrap().title;
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS + 1);
        assert!(title.ends_with('…'));
    }

    #[test]
    fn test_append_assistant_folds_stats() {
        let mut store = ConversationStore::new(10);
        let id = store.create(None).id;
        store.append_user(&id, "question").unwrap();

        store
            .append_assistant(
                &id,
                "answer",
                1234,
                vec![record("geocode_place"), record("get_weather")],
            )
            .unwrap();

        let conversation = store.get(&id).unwrap();
        assert_eq!(conversation.stats.queries, 1);
        assert_eq!(conversation.stats.total_latency_ms, 1234);
        assert_eq!(conversation.stats.agents_used.len(), 2);

        // A second turn adds exactly once more
        store
            .append_assistant(&id, "answer 2", 766, vec![record("get_weather")])
            .unwrap();
        let conversation = store.get(&id).unwrap();
        assert_eq!(conversation.stats.queries, 2);
        assert_eq!(conversation.stats.total_latency_ms, 2000);
        // Distinct names only
        assert_eq!(conversation.stats.agents_used.len(), 2);
    }

    #[test]
    fn test_eviction_keeps_most_recent() {
        let mut store = ConversationStore::new(3);
        let ids: Vec<String> = (0..5).map(|_| store.create(None).id).collect();

        assert_eq!(store.len(), 3);
        // The two oldest are gone
        assert!(store.get(&ids[0]).is_err());
        assert!(store.get(&ids[1]).is_err());
        for id in &ids[2..] {
            assert!(store.get(id).is_ok());
        }
    }

    #[test]
    fn test_eviction_respects_updates() {
        let mut store = ConversationStore::new(2);
        let first = store.create(None).id;
        let second = store.create(None).id;

        // Touch the older conversation so the newer one becomes the
        // eviction candidate when capacity is exceeded.
        store.append_user(&first, "still here").unwrap();
        let third = store.create(None).id;

        assert!(store.get(&first).is_ok());
        assert!(store.get(&second).is_err());
        assert!(store.get(&third).is_ok());
    }

    #[test]
    fn test_list_orders_by_recency() {
        let mut store = ConversationStore::new(10);
        let a = store.create(None).id;
        let b = store.create(None).id;

        store.append_user(&a, "newest activity").unwrap();

        let listing = store.list();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].id, a);
        assert_eq!(listing[1].id, b);
        assert_eq!(listing[0].message_count, 1);
    }

    #[test]
    fn test_history_maps_roles() {
        let mut store = ConversationStore::new(10);
        let id = store.create(None).id;
        store.append_user(&id, "question").unwrap();
        store
            .append_assistant(&id, "answer", 10, vec![])
            .unwrap();

        let history = store.history(&id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "question");
        assert_eq!(history[1].content, "answer");
    }

    #[test]
    fn test_remove_and_clear() {
        let mut store = ConversationStore::new(10);
        let id = store.create(None).id;

        store.remove(&id).unwrap();
        assert!(store.remove(&id).is_err());

        store.create(None);
        store.create(None);
        store.clear();
        assert!(store.is_empty());
    }
}
