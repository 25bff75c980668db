//! Core types for generation requests

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default Gemini model used when nothing else is configured.
pub const DEFAULT_MODEL_ID: &str = "gemini-2.5-flash";

/// Base URL of the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Who authored a turn.
///
/// Serialized as `"user"` / `"model"` to match the provider's wire names;
/// `"assistant"` is accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "model", alias = "assistant")]
    Assistant,
}

impl Role {
    /// Role name as sent to the provider
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "model",
        }
    }
}

/// One prior turn of a conversation: who said it and what was said.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// Model definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Model identifier (e.g., "gemini-2.5-flash")
    pub id: String,
    /// Base URL for API calls
    pub base_url: String,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Maximum output tokens
    pub max_output_tokens: Option<u32>,
    /// Additional headers for API calls
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Model {
    /// A Gemini model on the public endpoint with default sampling settings.
    pub fn gemini(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_output_tokens: None,
            headers: HashMap::new(),
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Point the model at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::gemini(DEFAULT_MODEL_ID)
    }
}

/// Context for a generation request
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// System instruction
    pub system_prompt: Option<String>,
    /// Conversation turns, oldest first
    pub turns: Vec<Turn>,
}

impl Context {
    /// Create a new context with a system prompt
    pub fn with_system(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(system_prompt.into()),
            turns: vec![],
        }
    }

    /// Add a turn to the context
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }
}
