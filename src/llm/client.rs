// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Generative-language API client
//!
//! Implements single-shot and streaming calls against the Gemini HTTP
//! backend, plus model discovery. Streaming responses arrive as
//! newline-delimited `data: <json>` frames; partial trailing lines are
//! buffered across reads and unparsable frames are logged and skipped.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::Stream;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use crate::error::{ApiError, Result, RostrumError};
use crate::llm::retry::{with_retry, CallOutcome, RetryConfig};

/// Default API base URL
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Token counts reported by the backend for one call.
///
/// Absent metadata defaults to zero, never null, to keep accounting additive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens consumed
    pub prompt: u32,
    /// Completion (candidate) tokens produced
    pub completion: u32,
    /// Total tokens billed
    pub total: u32,
}

/// One prior turn of conversational history, as the wire wants it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// True for a user turn, false for a model turn
    pub from_user: bool,
    /// Turn text
    pub text: String,
}

impl HistoryEntry {
    /// A user-side history entry
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            from_user: true,
            text: text.into(),
        }
    }

    /// A model-side history entry
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            from_user: false,
            text: text.into(),
        }
    }
}

/// Inline image payload attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// MIME type, e.g. "image/jpeg"
    pub mime_type: String,
    /// Base64-encoded image bytes
    pub data: String,
}

/// A single model invocation
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Model identifier
    pub model: String,

    /// Per-role system instruction
    pub system_instruction: Option<String>,

    /// Ordered prior-turn history
    pub history: Vec<HistoryEntry>,

    /// New prompt text
    pub prompt: String,

    /// Optional inline image sent alongside the prompt
    pub image: Option<InlineImage>,

    /// Hint that the response must be a JSON document
    pub json_response: bool,
}

impl GenerateRequest {
    /// Create a new request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            history: vec![],
            prompt: prompt.into(),
            image: None,
            json_response: false,
        }
    }

    /// Set the system instruction
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_instruction = Some(system.into());
        self
    }

    /// Set the prior-turn history
    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }

    /// Attach an inline image
    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Request a structured JSON response
    pub fn with_json_response(mut self) -> Self {
        self.json_response = true;
        self
    }
}

/// Reply from a non-streaming call
#[derive(Debug, Clone)]
pub struct GenerateReply {
    /// Full response text
    pub text: String,
    /// Token usage for this call
    pub usage: TokenUsage,
}

/// A generation-capable model visible to the supplied credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSummary {
    /// Model resource name, e.g. "models/gemini-2.5-flash"
    pub name: String,
    /// Human-readable name
    pub display_name: String,
    /// Model description
    pub description: String,
}

/// Stream of incremental text fragments from a streaming call
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Client abstraction over the generative-language backend
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Single-shot completion with usage metadata
    async fn generate(
        &self,
        request: &GenerateRequest,
        credential: &str,
        cancel: &CancellationToken,
    ) -> Result<CallOutcome<GenerateReply>>;

    /// Streaming completion yielding text fragments as they are produced
    async fn generate_stream(
        &self,
        request: &GenerateRequest,
        credential: &str,
        cancel: &CancellationToken,
    ) -> Result<CallOutcome<TextStream>>;

    /// List models that advertise content-generation support
    async fn list_models(&self, credential: &str) -> Result<Vec<ModelSummary>>;
}

/// Gemini HTTP client
pub struct GeminiClient {
    http: Client,
    base_url: String,
    retry: RetryConfig,
}

impl GeminiClient {
    /// Create a new client against the production endpoint
    pub fn new(retry: RetryConfig) -> Self {
        Self::with_base_url(retry, GEMINI_API_BASE)
    }

    /// Create a client with a custom base URL
    pub fn with_base_url(retry: RetryConfig, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            retry,
        }
    }

    fn generate_url(&self, model: &str, credential: &str, streaming: bool) -> String {
        if streaming {
            format!(
                "{}/models/{}:streamGenerateContent?alt=sse&key={}",
                self.base_url, model, credential
            )
        } else {
            format!(
                "{}/models/{}:generateContent?key={}",
                self.base_url, model, credential
            )
        }
    }

    /// Issue one POST and map a non-success status to a definitive rejection
    async fn post_once(&self, url: &str, body: &WireRequest) -> Result<reqwest::Response> {
        let response = self.http.post(url).json(body).send().await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RostrumError::Api(ApiError::Server { status, body }));
        }
        Ok(response)
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(
        &self,
        request: &GenerateRequest,
        credential: &str,
        cancel: &CancellationToken,
    ) -> Result<CallOutcome<GenerateReply>> {
        let url = self.generate_url(&request.model, credential, false);
        let body = build_wire_request(request);

        let outcome = with_retry(
            || async {
                let response = self.post_once(&url, &body).await?;
                let api: WireResponse = response
                    .json()
                    .await
                    .map_err(|e| RostrumError::Api(ApiError::InvalidResponse(e.to_string())))?;
                reply_from_response(api)
            },
            &self.retry,
            cancel,
            "generate",
        )
        .await?;

        Ok(outcome)
    }

    async fn generate_stream(
        &self,
        request: &GenerateRequest,
        credential: &str,
        cancel: &CancellationToken,
    ) -> Result<CallOutcome<TextStream>> {
        let url = self.generate_url(&request.model, credential, true);
        let body = build_wire_request(request);

        // Retry covers connection establishment; once the stream is open,
        // mid-stream errors surface as stream items.
        let outcome = with_retry(
            || async { self.post_once(&url, &body).await },
            &self.retry,
            cancel,
            "generate_stream",
        )
        .await?;

        let response = match outcome {
            CallOutcome::Completed(response) => response,
            CallOutcome::Cancelled => return Ok(CallOutcome::Cancelled),
        };

        let cancel = cancel.clone();
        let stream = try_stream! {
            let mut decoder = FrameDecoder::new();
            let mut bytes = response.bytes_stream();
            loop {
                let chunk = tokio::select! {
                    _ = cancel.cancelled() => break,
                    chunk = bytes.next() => chunk,
                };
                let Some(chunk) = chunk else { break };
                let chunk =
                    chunk.map_err(|e| RostrumError::Api(ApiError::Stream(e.to_string())))?;
                for payload in decoder.push(&String::from_utf8_lossy(&chunk)) {
                    if let Some(text) = decode_frame(&payload) {
                        yield text;
                    }
                }
            }
        };

        Ok(CallOutcome::Completed(Box::pin(stream)))
    }

    async fn list_models(&self, credential: &str) -> Result<Vec<ModelSummary>> {
        let url = format!("{}/models?key={}", self.base_url, credential);
        let response = self.http.get(&url).send().await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RostrumError::Api(ApiError::Server { status, body }));
        }

        let listing: WireModelList = response
            .json()
            .await
            .map_err(|e| RostrumError::Api(ApiError::InvalidResponse(e.to_string())))?;

        Ok(listing
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == "generateContent")
            })
            .map(|m| ModelSummary {
                name: m.name,
                display_name: m.display_name,
                description: m.description,
            })
            .collect())
    }
}

/// Buffers raw chunks and emits the payload of every completed `data:` line.
///
/// A partial trailing line stays in the buffer until a later chunk
/// completes it.
struct FrameDecoder {
    buffer: String,
}

impl FrameDecoder {
    fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(payload) = line.strip_prefix("data: ") {
                payloads.push(payload.to_string());
            }
        }
        payloads
    }
}

/// Extract the text fragment from one frame payload, if it has one.
///
/// Frames without usable text (keep-alives, metadata-only deltas) return
/// `None`; so do unparsable frames, which are logged and never abort the
/// stream.
fn decode_frame(payload: &str) -> Option<String> {
    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("skipping unparsable stream frame: {}", e);
            return None;
        }
    };

    let parts = value
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn build_wire_request(request: &GenerateRequest) -> WireRequest {
    let mut contents: Vec<WireContent> = request
        .history
        .iter()
        .map(|entry| WireContent {
            role: if entry.from_user { "user" } else { "model" }.to_string(),
            parts: vec![WirePart {
                text: Some(entry.text.clone()),
                inline_data: None,
            }],
        })
        .collect();

    let mut parts = vec![WirePart {
        text: Some(request.prompt.clone()),
        inline_data: None,
    }];
    if let Some(image) = &request.image {
        parts.push(WirePart {
            text: None,
            inline_data: Some(WireInlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            }),
        });
    }
    contents.push(WireContent {
        role: "user".to_string(),
        parts,
    });

    WireRequest {
        contents,
        system_instruction: request.system_instruction.as_ref().map(|text| {
            WireSystemInstruction {
                parts: vec![WirePart {
                    text: Some(text.clone()),
                    inline_data: None,
                }],
            }
        }),
        generation_config: request.json_response.then(|| WireGenerationConfig {
            response_mime_type: "application/json".to_string(),
        }),
    }
}

fn reply_from_response(api: WireResponse) -> Result<GenerateReply> {
    let candidate = api
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| RostrumError::Api(ApiError::InvalidResponse("no candidates".into())))?;

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    let usage = api
        .usage_metadata
        .map(|u| TokenUsage {
            prompt: u.prompt_token_count,
            completion: u.candidates_token_count,
            total: u.total_token_count,
        })
        .unwrap_or_default();

    Ok(GenerateReply { text, usage })
}

// Gemini API wire types

#[derive(Debug, Serialize)]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireSystemInstruction>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct WireContent {
    role: String,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<WireInlineData>,
}

#[derive(Debug, Serialize)]
struct WireInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct WireSystemInstruction {
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
struct WireGenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<WireUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<WireContentOut>,
}

#[derive(Debug, Deserialize)]
struct WireContentOut {
    #[serde(default)]
    parts: Vec<WirePartOut>,
}

#[derive(Debug, Deserialize)]
struct WirePartOut {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct WireModelList {
    #[serde(default)]
    models: Vec<WireModel>,
}

#[derive(Debug, Deserialize)]
struct WireModel {
    #[serde(default)]
    name: String,
    #[serde(rename = "displayName", default)]
    display_name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "supportedGenerationMethods", default)]
    supported_generation_methods: Vec<String>,
}
