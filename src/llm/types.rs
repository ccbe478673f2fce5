//! Analysis types — errors, the chunk stream, and Gemini stream payloads.

use serde::Deserialize;
use tokio::sync::mpsc;

/// How many undelivered chunks the producer may run ahead of the consumer.
const CHUNK_BUFFER: usize = 32;

/// Finish reasons that mean the model refused to answer.
const BLOCKED_FINISH_REASONS: [&str; 6] = [
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "IMAGE_SAFETY",
];

/// Why an analysis could not start or did not finish.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("API key is missing")]
    MissingApiKey,
    #[error("image payload is not usable: {0}")]
    MalformedImage(String),
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("stream interrupted: {0}")]
    Stream(String),
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

pub type ChunkResult = Result<String, AnalysisError>;

/// Producer half of a [`ChunkStream`].
pub type ChunkSender = mpsc::Sender<ChunkResult>;

/// Single-pass, in-order sequence of text fragments from the model.
///
/// Ends with `None` on completion, or with exactly one `Err` on failure;
/// nothing is yielded after either. Dropping the stream closes the channel,
/// which the producer treats as cancellation.
#[derive(Debug)]
pub struct ChunkStream {
    rx: mpsc::Receiver<ChunkResult>,
    finished: bool,
}

impl ChunkStream {
    pub fn channel() -> (ChunkSender, ChunkStream) {
        let (tx, rx) = mpsc::channel(CHUNK_BUFFER);
        (tx, Self { rx, finished: false })
    }

    /// A stream that replays a fixed script. Useful for offline analyzers.
    pub fn from_results<I>(results: I) -> ChunkStream
    where
        I: IntoIterator<Item = ChunkResult>,
    {
        let results: Vec<ChunkResult> = results.into_iter().collect();
        let (tx, rx) = mpsc::channel(results.len().max(1));
        for item in results {
            // Capacity covers every item, so this cannot fill up.
            let _ = tx.try_send(item);
        }
        Self { rx, finished: false }
    }

    /// Next fragment, the terminal error, or `None` once exhausted.
    pub async fn next(&mut self) -> Option<ChunkResult> {
        if self.finished {
            return None;
        }
        match self.rx.recv().await {
            Some(Ok(chunk)) => Some(Ok(chunk)),
            Some(Err(e)) => {
                self.finished = true;
                self.rx.close();
                Some(Err(e))
            }
            None => {
                self.finished = true;
                None
            }
        }
    }

    /// Consume the whole stream into one string.
    pub async fn collect_text(mut self) -> Result<String, AnalysisError> {
        let mut text = String::new();
        while let Some(chunk) = self.next().await {
            text.push_str(&chunk?);
        }
        Ok(text)
    }
}

// ── Gemini streamGenerateContent payloads ──────────────────────────

/// One `data:` event of a Gemini SSE stream.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Part {
    pub text: Option<String>,
    /// Set on reasoning summaries, which are not part of the answer.
    #[serde(default)]
    pub thought: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    pub code: Option<u16>,
    pub message: Option<String>,
    pub status: Option<String>,
}

impl StreamEvent {
    /// Answer text carried by this event (first candidate only).
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| !p.thought)
                    .filter_map(|p| p.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates.first()?.finish_reason.as_deref()
    }

    /// Reason the request was refused, if it was.
    pub fn blocked_reason(&self) -> Option<&str> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Some(reason);
        }
        self.finish_reason()
            .filter(|r| BLOCKED_FINISH_REASONS.contains(r))
    }
}
