//! sheba-chat: conversation engine with persistent threads
//!
//! This crate owns the multi-thread chat state: it creates and selects
//! threads, drives one streaming reply at a time through a [`Generator`],
//! reconciles the streamed fragments into the transcript, and keeps a
//! [`ThreadStore`] snapshot in sync.

pub mod engine;
pub mod error;
pub mod events;
pub mod generator;
pub mod persona;
pub mod store;
pub mod thread;

pub use engine::{ChatEngine, EngineConfig, Intent, SendOutcome};
pub use error::{Error, Result};
pub use events::{EngineEvent, EngineState};
pub use generator::{FragmentStream, Generator, ProviderGenerator, RetryConfig};
pub use store::{JsonFileStore, MemoryStore, ThreadStore};
pub use thread::{ChatMessage, Thread, ThreadSummary};
