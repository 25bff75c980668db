//! Google Generative AI (Gemini) API provider

use crate::{
    error::{Error, Result},
    providers::LlmProvider,
    stream::{EventStream, FinishReason, StreamEvent, Usage},
    types::{Context, Model, Turn},
};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

/// Environment variables checked for an API key, in order.
pub const API_KEY_ENV_VARS: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Google Generative AI client
pub struct GoogleProvider {
    client: reqwest::Client,
    api_key: String,
}

impl GoogleProvider {
    /// Create a new Google provider with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    fn headers(&self, model: &Model) -> Result<reqwest::header::HeaderMap> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let key = reqwest::header::HeaderValue::from_str(&self.api_key)
            .map_err(|_| Error::InvalidApiKey)?;
        headers.insert("x-goog-api-key", key);

        // Add model-specific headers
        for (key, value) in &model.headers {
            if let (Ok(name), Ok(val)) = (
                key.parse::<reqwest::header::HeaderName>(),
                value.parse::<reqwest::header::HeaderValue>(),
            ) {
                headers.insert(name, val);
            }
        }
        Ok(headers)
    }
}

#[async_trait]
impl LlmProvider for GoogleProvider {
    async fn stream(&self, model: &Model, context: &Context) -> Result<EventStream> {
        let request = build_request(model, context);
        let url = stream_url(model);
        tracing::debug!(model = %model.id, turns = request.contents.len(), "opening Gemini stream");

        let request_builder = self
            .client
            .post(&url)
            .headers(self.headers(model)?)
            .json(&request);

        let mut event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        wait_for_open(&mut event_source).await?;

        Ok(Box::pin(create_stream(event_source, model.id.clone())))
    }
}

fn stream_url(model: &Model) -> String {
    format!(
        "{}/models/{}:streamGenerateContent?alt=sse",
        model.base_url.trim_end_matches('/'),
        model.id
    )
}

fn build_request(model: &Model, context: &Context) -> GeminiRequest {
    let contents = context.turns.iter().filter_map(convert_turn).collect();

    let system_instruction = context
        .system_prompt
        .as_ref()
        .filter(|prompt| !prompt.trim().is_empty())
        .map(|prompt| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: prompt.clone(),
            }],
        });

    let generation_config = if model.temperature.is_some() || model.max_output_tokens.is_some() {
        Some(GeminiGenerationConfig {
            temperature: model.temperature,
            max_output_tokens: model.max_output_tokens,
        })
    } else {
        None
    };

    GeminiRequest {
        contents,
        system_instruction,
        generation_config,
    }
}

fn convert_turn(turn: &Turn) -> Option<GeminiContent> {
    if turn.text.trim().is_empty() {
        return None;
    }
    Some(GeminiContent {
        role: Some(turn.role.as_str().to_string()),
        parts: vec![GeminiPart {
            text: turn.text.clone(),
        }],
    })
}

/// Drive the event source until the server accepts the request.
///
/// Connection and status failures surface here as typed errors so callers
/// can decide whether to retry.
async fn wait_for_open(event_source: &mut EventSource) -> Result<()> {
    match event_source.next().await {
        Some(Ok(Event::Open)) => Ok(()),
        Some(Ok(Event::Message(msg))) => {
            event_source.close();
            Err(Error::UnexpectedResponse(format!(
                "event before stream opened: {}",
                msg.event
            )))
        }
        Some(Err(e)) => {
            event_source.close();
            Err(open_error(e).await)
        }
        None => Err(Error::Sse("event stream closed before opening".to_string())),
    }
}

async fn open_error(error: reqwest_eventsource::Error) -> Error {
    match error {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let body = response.text().await.unwrap_or_default();
            Error::from_status(status.as_u16(), &body, retry_after)
        }
        reqwest_eventsource::Error::Transport(e) => Error::Http(e),
        other => Error::Sse(other.to_string()),
    }
}

fn create_stream(
    mut event_source: EventSource,
    model_id: String,
) -> impl futures::Stream<Item = StreamEvent> {
    stream! {
        let mut finish_reason: Option<FinishReason> = None;
        let mut usage = Usage::default();

        yield StreamEvent::Start { model: model_id };

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data.is_empty() || msg.data == "[DONE]" {
                        continue;
                    }

                    match parse_chunk(&msg.data) {
                        Ok(chunk) => {
                            for delta in chunk.deltas {
                                yield StreamEvent::TextDelta { delta };
                            }
                            if chunk.finish_reason.is_some() {
                                finish_reason = chunk.finish_reason;
                            }
                            if let Some(chunk_usage) = chunk.usage {
                                usage = chunk_usage;
                            }
                        }
                        Err(message) => {
                            event_source.close();
                            yield StreamEvent::Error { message };
                            return;
                        }
                    }
                }
                // The server closes the connection after the last chunk.
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(e) => {
                    event_source.close();
                    yield StreamEvent::Error {
                        message: format!("SSE error: {}", e),
                    };
                    return;
                }
            }
        }

        event_source.close();
        yield StreamEvent::Done {
            finish_reason: finish_reason.unwrap_or_default(),
            usage,
        };
    }
}

/// The useful contents of one SSE payload
#[derive(Debug, Default, PartialEq)]
struct ParsedChunk {
    deltas: Vec<String>,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
}

fn parse_chunk(data: &str) -> std::result::Result<ParsedChunk, String> {
    if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(data) {
        return Err(error_response.error.message);
    }

    let response: GeminiStreamResponse =
        serde_json::from_str(data).map_err(|e| format!("Failed to parse chunk: {}", e))?;

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(format!("Prompt blocked: {}", reason));
    }

    let mut chunk = ParsedChunk::default();
    for candidate in &response.candidates {
        if let Some(ref content) = candidate.content {
            for part in &content.parts {
                if part.thought.unwrap_or(false) {
                    continue;
                }
                if let Some(text) = part.text.as_ref().filter(|t| !t.is_empty()) {
                    chunk.deltas.push(text.clone());
                }
            }
        }
        if let Some(ref reason) = candidate.finish_reason {
            chunk.finish_reason = Some(FinishReason::from_gemini(reason));
        }
    }

    chunk.usage = response.usage_metadata.map(|u| Usage {
        input: u.prompt_token_count.unwrap_or(0),
        output: u.candidates_token_count.unwrap_or(0),
    });

    Ok(chunk)
}

// Request types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

// Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
