//! Provider implementations

pub mod google;

use crate::{Context, Error, EventStream, Model, Result};
use async_trait::async_trait;

/// Trait for streaming text-generation providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Open a reply stream for the given context.
    ///
    /// Errors returned here happen before any text was produced; failures
    /// after that arrive in-band as a terminal `StreamEvent::Error`.
    async fn stream(&self, model: &Model, context: &Context) -> Result<EventStream>;
}

/// Get an API key from a provided value or the first set environment variable
pub fn get_api_key(provided: Option<&str>, env_vars: &[&str]) -> Result<String> {
    if let Some(key) = provided.filter(|k| !k.trim().is_empty()) {
        return Ok(key.to_string());
    }

    env_vars
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .ok_or(Error::InvalidApiKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provided_key_wins() {
        let key = get_api_key(Some("abc"), &["SHEBA_TEST_UNSET_KEY_VAR"]).unwrap();
        assert_eq!(key, "abc");
    }

    #[test]
    fn test_blank_key_is_missing() {
        let err = get_api_key(Some("   "), &["SHEBA_TEST_UNSET_KEY_VAR"]).unwrap_err();
        assert!(matches!(err, Error::InvalidApiKey));
    }
}
