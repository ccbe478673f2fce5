//! MindScape — House-Tree-Person drawing reflection.
//!
//! The user draws (or uploads) a house, a tree and a person; the image is
//! sent to Gemini and the interpretation streams back into the view.
//! No presentation lives here, only the domains the front-end drives.
//!
//! Domains:
//!   - canvas/    — freehand drawing surface, pointer mapping, PNG export
//!   - encoded.rs — data-URI image payloads (drawing export + uploads)
//!   - llm/       — streaming analysis adapter
//!   - state/     — screen state machine + published view snapshots
//!
//! Entry points:
//!   - commands.rs — one function per user action
//!   - pipeline.rs — drives a single analysis session

pub mod canvas;
pub mod commands;
pub mod config;
pub mod encoded;
pub mod llm;
pub mod pipeline;
pub mod state;

pub use canvas::{DrawingSurface, Point, PointerInput};
pub use encoded::EncodedImage;
pub use llm::{AnalysisError, Analyzer, ChunkStream, GeminiAnalyzer};
pub use state::{AppScreen, SharedApp, ViewState};

/// Load `.env` files and start logging. Call once before anything else.
pub fn init() {
    config::init();
    if !config::has_api_key() {
        log::warn!("No GEMINI_API_KEY configured — every analysis will fail");
    }
}
