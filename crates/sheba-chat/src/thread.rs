//! Threads and the messages they hold.

use serde::{Deserialize, Serialize};
use sheba_ai::{Role, Turn};

/// Longest title, in characters, before it is cut and an ellipsis appended.
pub const TITLE_MAX_CHARS: usize = 30;

/// One message in a thread transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub text: String,
    /// Set only on the assistant placeholder while its reply is streaming.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_streaming: bool,
}

impl ChatMessage {
    /// A finished user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role: Role::User,
            text: text.into(),
            is_streaming: false,
        }
    }

    /// An empty assistant message that will receive streamed text
    pub fn placeholder() -> Self {
        Self {
            id: new_id(),
            role: Role::Assistant,
            text: String::new(),
            is_streaming: true,
        }
    }

    /// Convert to a provider turn
    pub fn to_turn(&self) -> Turn {
        Turn::new(self.role, self.text.clone())
    }
}

/// A persisted conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    /// Unix milliseconds
    pub created_at: i64,
}

impl Thread {
    /// Start an empty thread titled after its first message
    pub fn new(first_message: &str) -> Self {
        Self {
            id: new_id(),
            title: derive_title(first_message),
            messages: Vec::new(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Prior turns for re-seeding a generation context.
    ///
    /// An in-flight placeholder is not a turn yet and is left out.
    pub fn prior_turns(&self) -> Vec<Turn> {
        self.messages
            .iter()
            .filter(|m| !m.is_streaming)
            .map(ChatMessage::to_turn)
            .collect()
    }

    /// Copy of the thread without any in-flight placeholder, for persisting.
    pub fn settled(&self) -> Thread {
        Thread {
            messages: self
                .messages
                .iter()
                .filter(|m| !m.is_streaming)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    pub(crate) fn message_mut(&mut self, id: &str) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    pub fn summary(&self) -> ThreadSummary {
        ThreadSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            message_count: self.messages.len(),
        }
    }
}

/// What the thread list shows for a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: String,
    pub title: String,
    pub created_at: i64,
    pub message_count: usize,
}

impl ThreadSummary {
    /// Format the created_at timestamp for display
    pub fn created_at_display(&self) -> String {
        use chrono::{Local, TimeZone};
        Local
            .timestamp_millis_opt(self.created_at)
            .single()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Title for a thread: the message itself, cut to [`TITLE_MAX_CHARS`]
/// characters with "..." appended when longer.
pub fn derive_title(text: &str) -> String {
    let text = text.trim();
    let mut chars = text.chars();
    let truncated: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
