//! Streaming event types and utilities

use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Why the provider stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of response
    #[default]
    Stop,
    /// Maximum tokens reached
    Length,
    /// Blocked by a safety or recitation filter
    Filtered,
    /// Anything the provider reports that we do not model
    Other,
}

impl FinishReason {
    /// Map a Gemini `finishReason` string
    pub fn from_gemini(reason: &str) -> Self {
        match reason {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::Length,
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
                FinishReason::Filtered
            }
            _ => FinishReason::Other,
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input: u32,
    pub output: u32,
}

/// Events emitted while a reply streams in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// The provider accepted the request
    Start { model: String },
    /// A piece of reply text
    TextDelta { delta: String },
    /// Reply completed successfully
    Done {
        finish_reason: FinishReason,
        usage: Usage,
    },
    /// Error occurred; no further events follow
    Error { message: String },
}

/// A stream of generation events
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Accumulates a reply from streaming events
#[derive(Debug, Default)]
pub struct ReplyBuilder {
    text: String,
    finish_reason: Option<FinishReason>,
    usage: Usage,
    error: Option<String>,
}

impl ReplyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the reply
    pub fn process_event(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::TextDelta { delta } => self.text.push_str(delta),
            StreamEvent::Done {
                finish_reason,
                usage,
            } => {
                self.finish_reason = Some(*finish_reason);
                self.usage = *usage;
            }
            StreamEvent::Error { message } => self.error = Some(message.clone()),
            StreamEvent::Start { .. } => {}
        }
    }

    /// Text accumulated so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// True once a `Done` event has been seen and no error occurred
    pub fn is_complete(&self) -> bool {
        self.finish_reason.is_some() && self.error.is_none()
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    /// Consume the builder, returning the full reply text
    pub fn into_text(self) -> String {
        self.text
    }
}
