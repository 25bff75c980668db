//! sheba-ai: streaming text-generation provider layer
//!
//! This crate turns an ordered list of conversation turns into a stream of
//! generation events. The only concrete provider is Google's Generative
//! Language API (Gemini).

pub mod error;
pub mod providers;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use providers::LlmProvider;
pub use stream::{EventStream, ReplyBuilder, StreamEvent};
pub use types::*;
