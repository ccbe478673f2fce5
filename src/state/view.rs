//! Screens and the render snapshot handed to the front-end.

use crate::encoded::EncodedImage;
use serde::Serialize;

/// Exactly one screen is active at a time.
///
/// There is no uploading screen: an upload goes straight to `Analyzing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppScreen {
    #[default]
    Home,
    Drawing,
    Analyzing,
    Result,
    Error,
}

impl AppScreen {
    /// Screens from which a new analysis may be started.
    pub fn accepts_submission(self) -> bool {
        matches!(self, AppScreen::Home | AppScreen::Drawing)
    }
}

/// Everything a renderer needs, published after every state change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub screen: AppScreen,
    pub image: Option<EncodedImage>,
    pub analysis_text: String,
    pub is_streaming: bool,
    pub error: Option<String>,
    /// Inline message on the current screen (e.g. a failed drawing export).
    pub notice: Option<String>,
    /// Logical edge of the square drawing surface, when one is mounted.
    pub canvas_size: Option<u32>,
}
