//! Generation client adapter: prior turns in, reply fragments out.

use std::{pin::Pin, sync::Arc, time::Duration};

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use sheba_ai::{
    Context, EventStream, LlmProvider, Model, ReplyBuilder, StreamEvent, Turn,
    providers::google::{API_KEY_ENV_VARS, GoogleProvider},
};
use tokio_stream::Stream;

use crate::{error::Result, persona::DEFAULT_FAILURE_NOTICE};

/// A lazy, finite sequence of reply text fragments
pub type FragmentStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// The two operations the conversation engine needs from a text generator.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Replace the conversation context with `prior_turns`.
    ///
    /// A reply still streaming from the old context is not recorded in the
    /// new one.
    fn initialize(&self, prior_turns: Vec<Turn>);

    /// Stream a reply to a new user turn.
    ///
    /// Failures after the stream is returned arrive as a single final
    /// error-text fragment. An `Err` means nothing could be generated at all.
    async fn stream_reply(&self, prompt: &str) -> Result<FragmentStream>;
}

/// Retry configuration for opening a reply stream
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Calculate delay for a given attempt (0-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_secs =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
    }
}

type ProviderFactory = Arc<dyn Fn() -> sheba_ai::Result<Arc<dyn LlmProvider>> + Send + Sync>;

/// Chat history kept by the adapter between sends.
#[derive(Default)]
struct ChatHistory {
    turns: Vec<Turn>,
    /// Bumped on every `initialize`; replies started under an older epoch
    /// are dropped instead of recorded.
    epoch: u64,
}

/// [`Generator`] backed by an [`LlmProvider`].
///
/// Behaves like a provider-side chat session: each completed exchange is
/// appended to the history that the next send carries.
pub struct ProviderGenerator {
    factory: ProviderFactory,
    provider: Mutex<Option<Arc<dyn LlmProvider>>>,
    model: Model,
    system_prompt: Option<String>,
    failure_notice: String,
    retry_config: RetryConfig,
    history: Arc<Mutex<ChatHistory>>,
}

impl ProviderGenerator {
    /// Wrap an already constructed provider
    pub fn new(provider: Arc<dyn LlmProvider>, model: Model) -> Self {
        let ready = Arc::clone(&provider);
        let factory: ProviderFactory =
            Arc::new(move || -> sheba_ai::Result<Arc<dyn LlmProvider>> { Ok(Arc::clone(&ready)) });
        Self::with_factory(factory, model)
    }

    /// Gemini generator. The API key is resolved on first send, falling back
    /// to `GOOGLE_API_KEY` / `GEMINI_API_KEY`, so a missing key shows up as a
    /// failed reply rather than a startup error.
    pub fn google(api_key: Option<String>, model: Model) -> Self {
        let factory: ProviderFactory = Arc::new(move || -> sheba_ai::Result<Arc<dyn LlmProvider>> {
            let key = sheba_ai::providers::get_api_key(api_key.as_deref(), API_KEY_ENV_VARS)?;
            Ok(Arc::new(GoogleProvider::new(key)))
        });
        Self::with_factory(factory, model)
    }

    fn with_factory(factory: ProviderFactory, model: Model) -> Self {
        Self {
            factory,
            provider: Mutex::new(None),
            model,
            system_prompt: None,
            failure_notice: DEFAULT_FAILURE_NOTICE.to_string(),
            retry_config: RetryConfig::default(),
            history: Arc::new(Mutex::new(ChatHistory::default())),
        }
    }

    /// Set the system instruction sent with every request
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the text yielded when a reply fails
    pub fn with_failure_notice(mut self, notice: impl Into<String>) -> Self {
        self.failure_notice = notice.into();
        self
    }

    /// Set retry configuration
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Turns the next send will carry as context
    pub fn history(&self) -> Vec<Turn> {
        self.history.lock().turns.clone()
    }

    fn connect(&self) -> sheba_ai::Result<Arc<dyn LlmProvider>> {
        let mut slot = self.provider.lock();
        if let Some(provider) = slot.as_ref() {
            return Ok(Arc::clone(provider));
        }
        let provider = (self.factory)()?;
        *slot = Some(Arc::clone(&provider));
        Ok(provider)
    }

    async fn open_with_retry(&self, context: &Context) -> Result<EventStream> {
        let mut attempt = 0u32;
        loop {
            let opened = match self.connect() {
                Ok(provider) => provider.stream(&self.model, context).await,
                Err(e) => Err(e),
            };

            match opened {
                Ok(events) => return Ok(events),
                Err(e) => {
                    if attempt < self.retry_config.max_retries && e.is_retryable() {
                        let delay = self.retry_config.delay_for_attempt(attempt);
                        tracing::warn!(
                            "Request failed (attempt {}/{}): {}. Retrying in {:?}...",
                            attempt + 1,
                            self.retry_config.max_retries + 1,
                            e,
                            delay
                        );
                        attempt += 1;
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }
}

#[async_trait]
impl Generator for ProviderGenerator {
    fn initialize(&self, prior_turns: Vec<Turn>) {
        let mut history = self.history.lock();
        history.turns = prior_turns;
        history.epoch += 1;
    }

    async fn stream_reply(&self, prompt: &str) -> Result<FragmentStream> {
        let (turns, epoch) = {
            let history = self.history.lock();
            (history.turns.clone(), history.epoch)
        };

        let mut context = Context {
            system_prompt: self.system_prompt.clone(),
            turns,
        };
        context.push(Turn::user(prompt));

        let mut events = self.open_with_retry(&context).await?;

        let history = Arc::clone(&self.history);
        let notice = self.failure_notice.clone();
        let prompt = prompt.to_string();

        Ok(Box::pin(stream! {
            let mut builder = ReplyBuilder::new();

            while let Some(event) = events.next().await {
                builder.process_event(&event);
                match event {
                    StreamEvent::TextDelta { delta } => yield delta,
                    StreamEvent::Done { .. } => break,
                    StreamEvent::Error { message } => {
                        tracing::warn!("Reply stream failed: {}", message);
                        yield failure_fragment(&notice, builder.text());
                        return;
                    }
                    StreamEvent::Start { .. } => {}
                }
            }

            if !builder.is_complete() {
                tracing::warn!("Reply stream ended without completing");
                yield failure_fragment(&notice, builder.text());
                return;
            }

            let usage = builder.usage();
            tracing::debug!(
                finish_reason = ?builder.finish_reason(),
                input_tokens = usage.input,
                output_tokens = usage.output,
                "reply complete"
            );

            let mut history = history.lock();
            if history.epoch == epoch {
                history.turns.push(Turn::user(prompt));
                history.turns.push(Turn::assistant(builder.into_text()));
            } else {
                tracing::debug!("Context was re-initialized mid-reply; not recording exchange");
            }
        }))
    }
}

/// The error fragment, separated from any partial reply already shown.
fn failure_fragment(notice: &str, partial: &str) -> String {
    if partial.is_empty() || partial.ends_with('\n') {
        notice.to_string()
    } else {
        format!("\n\n{}", notice)
    }
}
