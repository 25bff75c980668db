//! Engine state and the events observers receive

use serde::{Deserialize, Serialize};

use crate::thread::{ChatMessage, ThreadSummary};

/// Lifecycle of a send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Ready to accept a send
    #[default]
    Idle,
    /// Prompt dispatched, no fragment received yet
    Sending,
    /// At least one fragment has arrived
    Streaming,
}

impl EngineState {
    pub fn is_idle(&self) -> bool {
        matches!(self, EngineState::Idle)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::Sending => "sending",
            EngineState::Streaming => "streaming",
        }
    }
}

/// Events emitted by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The engine moved to a new state
    StateChanged { state: EngineState },

    /// A thread was created or deleted
    ThreadsChanged { threads: Vec<ThreadSummary> },

    /// Another thread (or none) became active
    ActiveThreadChanged { thread_id: Option<String> },

    /// A message was appended to a thread
    MessageAppended {
        thread_id: String,
        message: ChatMessage,
    },

    /// The streaming placeholder grew by one fragment
    MessageUpdated {
        thread_id: String,
        message: ChatMessage,
        fragment: String,
    },

    /// The placeholder stopped streaming
    MessageFinalized {
        thread_id: String,
        message: ChatMessage,
    },
}
