//! Gemini Flash analysis — streaming SSE via Google AI API.
//!
//! - API key in the `key` query param, not a header
//! - SSE events are `data: {...}` lines without an `event:` prefix
//! - Text fragments in `candidates[0].content.parts[*].text`
//! - Token usage in `usageMetadata` of the final event
//!
//! The request runs on a spawned task that feeds a [`ChunkStream`]; the
//! caller gets the stream back immediately.

use super::prompts::{SYSTEM_INSTRUCTION, USER_PROMPT};
use super::streaming;
use super::types::{AnalysisError, ChunkSender, ChunkStream, StreamEvent};
use super::Analyzer;
use crate::config::{self, ModelSettings};
use crate::encoded::{self, EncodedImage};
use base64::Engine;

/// Where the API key comes from.
#[derive(Debug, Clone)]
pub enum Credential {
    /// Read `GEMINI_API_KEY` / `API_KEY` on every call.
    Environment,
    Fixed(String),
}

pub struct GeminiAnalyzer {
    client: reqwest::Client,
    settings: ModelSettings,
    credential: Credential,
}

impl GeminiAnalyzer {
    /// Settings and credential both taken from the environment.
    pub fn from_env() -> Self {
        Self::new(ModelSettings::from_env(), Credential::Environment)
    }

    pub fn new(settings: ModelSettings, credential: Credential) -> Self {
        Self::with_client(reqwest::Client::new(), settings, credential)
    }

    /// Use a preconfigured HTTP client (proxies, TLS roots, ...).
    pub fn with_client(
        client: reqwest::Client,
        settings: ModelSettings,
        credential: Credential,
    ) -> Self {
        Self {
            client,
            settings,
            credential,
        }
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    fn api_key(&self) -> Option<String> {
        match &self.credential {
            Credential::Environment => config::api_key(),
            Credential::Fixed(key) if !key.trim().is_empty() => Some(key.clone()),
            Credential::Fixed(_) => None,
        }
    }
}

impl Analyzer for GeminiAnalyzer {
    fn analyze(&self, image: EncodedImage) -> Result<ChunkStream, AnalysisError> {
        let api_key = self.api_key().ok_or_else(|| {
            log::warn!("[LLM] No GEMINI_API_KEY set — refusing to analyze");
            AnalysisError::MissingApiKey
        })?;

        let (mime_type, payload) = prepare_image(&image)?;
        let body = build_request_body(&mime_type, payload, self.settings.temperature);

        log::info!("[LLM] Provider: gemini (streaming)");
        log::info!("[LLM] Model: {}", self.settings.model);
        log::info!("[LLM] Image: {} ({} base64 bytes)", mime_type, payload.len());

        let request = self
            .client
            .post(self.settings.stream_url())
            .query(&[("key", api_key.as_str())])
            .header("content-type", "application/json")
            .json(&body);

        let (tx, stream) = ChunkStream::channel();
        tokio::spawn(async move {
            tokio::select! {
                _ = tx.closed() => {
                    log::info!("[LLM] Consumer went away — abandoning stream");
                }
                _ = pump_response(request, &tx) => {}
            }
        });

        Ok(stream)
    }
}

/// Validate the payload and return `(mime type, raw base64)`.
///
/// The header is stripped, the base64 decoded, and the bytes sniffed; the
/// sniffed type is what gets sent, since uploads can lie about theirs.
pub fn prepare_image(image: &EncodedImage) -> Result<(String, &str), AnalysisError> {
    let (declared, payload) = encoded::strip_header(image.as_data_uri());
    let declared = declared.ok_or_else(|| {
        AnalysisError::MalformedImage(format!("unsupported type {}", image.mime_type()))
    })?;

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| AnalysisError::MalformedImage(format!("bad base64: {}", e)))?;

    let sniffed = encoded::sniff_mime(&bytes).ok_or_else(|| {
        AnalysisError::MalformedImage("content is not a PNG, JPEG or WebP image".to_string())
    })?;
    if sniffed != declared {
        log::warn!("[LLM] Image declared {} but contains {}", declared, sniffed);
    }

    Ok((sniffed.to_string(), payload))
}

/// JSON body for `streamGenerateContent`.
pub fn build_request_body(mime_type: &str, base64_data: &str, temperature: f32) -> serde_json::Value {
    serde_json::json!({
        "contents": [
            {
                "role": "user",
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": mime_type,
                            "data": base64_data
                        }
                    },
                    {
                        "text": USER_PROMPT
                    }
                ]
            }
        ],
        "systemInstruction": {
            "parts": [
                {
                    "text": SYSTEM_INSTRUCTION
                }
            ]
        },
        "generationConfig": {
            "temperature": temperature
        }
    })
}

/// Send the request and forward every text fragment into `tx`.
///
/// Returns once the stream ends, fails, or the consumer drops its end.
async fn pump_response(request: reqwest::RequestBuilder, tx: &ChunkSender) {
    let start = std::time::Instant::now();

    let mut response = match request.send().await {
        Ok(resp) => resp,
        Err(e) => {
            log::error!("[LLM] HTTP request failed: {}", e);
            let _ = tx.send(Err(AnalysisError::Http(e.to_string()))).await;
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        log::error!("[LLM] Gemini API returned {}: {}", status, body);
        let _ = tx
            .send(Err(AnalysisError::Api {
                status: status.as_u16(),
                body,
            }))
            .await;
        return;
    }

    log::info!("[LLM] TTFB: {}ms", start.elapsed().as_millis());

    let mut pending = Vec::new();
    let mut sse_buffer = String::new();
    let mut state = StreamState::default();

    loop {
        let events = match response.chunk().await {
            Ok(Some(chunk)) => {
                pending.extend_from_slice(&chunk);
                streaming::push_utf8(&mut pending, &mut sse_buffer);
                streaming::parse_data_only_sse_events(&mut sse_buffer)
            }
            Ok(None) => {
                let events = streaming::flush_sse_events(&mut sse_buffer);
                if let Err(e) = state.forward(&events, tx, start).await {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
                break;
            }
            Err(e) => {
                log::error!("[LLM] Stream error: {}", e);
                let _ = tx.send(Err(AnalysisError::Stream(e.to_string()))).await;
                return;
            }
        };

        match state.forward(&events, tx, start).await {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
        }
    }

    log::info!(
        "[LLM] Stream complete: {}ms, {} fragments, {} chars",
        start.elapsed().as_millis(),
        state.fragments,
        state.chars
    );
    if state.input_tokens > 0 || state.output_tokens > 0 {
        log::info!("[LLM] Input tokens: {}", state.input_tokens);
        log::info!("[LLM] Output tokens: {}", state.output_tokens);
    }
}

#[derive(Default)]
struct StreamState {
    fragments: usize,
    chars: usize,
    input_tokens: u64,
    output_tokens: u64,
}

impl StreamState {
    /// Forward decoded events. `Ok(false)` means the consumer is gone.
    async fn forward(
        &mut self,
        events: &[String],
        tx: &ChunkSender,
        start: std::time::Instant,
    ) -> Result<bool, AnalysisError> {
        for data in events {
            let event: StreamEvent = serde_json::from_str(data).map_err(|e| {
                log::error!("[LLM] Unparseable event: {}", data);
                AnalysisError::MalformedResponse(e.to_string())
            })?;

            if let Some(err) = &event.error {
                let message = err.message.clone().unwrap_or_default();
                log::error!(
                    "[LLM] Error event: {:?} {:?} {}",
                    err.code, err.status, message
                );
                return Err(AnalysisError::MalformedResponse(message));
            }

            if let Some(usage) = &event.usage_metadata {
                self.input_tokens = usage.prompt_token_count;
                self.output_tokens = usage.candidates_token_count;
            }

            let text = event.text();
            if !text.is_empty() {
                if self.fragments == 0 {
                    log::info!("[LLM] TTFT: {}ms", start.elapsed().as_millis());
                }
                self.fragments += 1;
                self.chars += text.chars().count();
                if tx.send(Ok(text)).await.is_err() {
                    return Ok(false);
                }
            } else if let Some(reason) = event.blocked_reason() {
                log::warn!("[LLM] Response blocked: {}", reason);
                return Err(AnalysisError::MalformedResponse(format!(
                    "response blocked ({})",
                    reason
                )));
            }
        }
        Ok(true)
    }
}
