//! LLM domain — streaming drawing analysis.
//!
//! Public API for the analysis adapter.
//! External code should only use the items exported here.
//!
//! Providers:
//!   - Google Gemini Flash (gemini.rs)
//!
//! Shared:
//!   - streaming.rs — SSE parsing + UTF-8 reassembly
//!   - types.rs     — errors, chunk stream, wire payloads

mod gemini;
pub mod prompts;
pub mod streaming;
pub mod types;

pub use gemini::{build_request_body, prepare_image, Credential, GeminiAnalyzer};
pub use types::{AnalysisError, ChunkResult, ChunkSender, ChunkStream};

use crate::encoded::EncodedImage;

/// Something that turns an image into a stream of interpretation text.
///
/// Failures detectable up front (no credential, unusable image) are
/// returned directly, before any network traffic. Everything later arrives
/// as the stream's terminal `Err`. Must be called from within a tokio
/// runtime, since implementations spawn their producer.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, image: EncodedImage) -> Result<ChunkStream, AnalysisError>;
}
