//! The application state machine.
//!
//! Home → Drawing → Analyzing → Result | Error, with reset back to Home
//! from anywhere. Pure and synchronous: the pipeline feeds it adapter
//! events, tagged with the session they belong to, and anything tagged
//! with a session that is no longer current is dropped.

use super::view::{AppScreen, ViewState};
use crate::canvas::{self, DrawingSurface};
use crate::encoded::EncodedImage;
use crate::llm::AnalysisError;
use serde::Serialize;

/// Shown on the error screen, whatever went wrong.
pub const ANALYSIS_FAILED_MESSAGE: &str = "Unable to analyze the image. Please try again.";
/// Shown inline on the drawing screen when the surface cannot be exported.
pub const EXPORT_FAILED_NOTICE: &str = "Your drawing could not be captured. Please try again.";

/// Viewport assumed until the host reports one (a 300 unit canvas).
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 332;

/// Identifies one analysis request. Strictly increasing per `App`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SessionId(u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One in-flight or finished analysis.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    pub id: SessionId,
    pub image: EncodedImage,
    /// Grows by appending chunks, in arrival order.
    pub text: String,
    pub complete: bool,
    pub error: Option<AnalysisError>,
}

impl AnalysisSession {
    fn is_open(&self) -> bool {
        !self.complete && self.error.is_none()
    }
}

#[derive(Debug)]
pub struct App {
    screen: AppScreen,
    surface: Option<DrawingSurface>,
    session: Option<AnalysisSession>,
    error: Option<String>,
    notice: Option<String>,
    last_session: u64,
    viewport_width: u32,
    device_pixel_ratio: f32,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            screen: AppScreen::Home,
            surface: None,
            session: None,
            error: None,
            notice: None,
            last_session: 0,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            device_pixel_ratio: 1.0,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn screen(&self) -> AppScreen {
        self.screen
    }

    pub fn session(&self) -> Option<&AnalysisSession> {
        self.session.as_ref()
    }

    pub fn current_session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    pub fn analysis_text(&self) -> &str {
        self.session.as_ref().map_or("", |s| s.text.as_str())
    }

    pub fn image(&self) -> Option<&EncodedImage> {
        self.session.as_ref().map(|s| &s.image)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// True while a session is open and still receiving text.
    pub fn is_streaming(&self) -> bool {
        self.session.as_ref().is_some_and(AnalysisSession::is_open)
    }

    pub fn surface(&self) -> Option<&DrawingSurface> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut DrawingSurface> {
        self.surface.as_mut()
    }

    pub fn canvas_size(&self) -> u32 {
        canvas::canvas_size_for_viewport(self.viewport_width)
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            screen: self.screen,
            image: self.image().cloned(),
            analysis_text: self.analysis_text().to_string(),
            is_streaming: self.is_streaming(),
            error: self.error.clone(),
            notice: self.notice.clone(),
            canvas_size: self.surface.as_ref().map(|s| s.size().0),
        }
    }

    // ── User actions ────────────────────────────────────────────────

    /// Home → Drawing. Mounts a fresh white surface.
    pub fn start_drawing(&mut self) -> bool {
        if self.screen != AppScreen::Home {
            return false;
        }
        let size = self.canvas_size();
        self.surface = Some(DrawingSurface::with_size(size, size, self.device_pixel_ratio));
        self.notice = None;
        self.screen = AppScreen::Drawing;
        log::info!("[STATE] Home → Drawing ({}x{})", size, size);
        true
    }

    /// Viewport changed. A mounted surface is resized (and so blanked) only
    /// when its size or pixel ratio actually changes.
    pub fn set_viewport(&mut self, width: u32, device_pixel_ratio: f32) {
        let scale = canvas::normalize_scale(device_pixel_ratio);
        self.viewport_width = width;
        self.device_pixel_ratio = scale;
        let size = self.canvas_size();
        if let Some(surface) = self.surface.as_mut() {
            if surface.size() != (size, size) || surface.scale() != scale {
                surface.resize(size, size, scale);
            }
        }
    }

    /// Repaint the mounted surface white.
    pub fn clear_canvas(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.reset();
        }
        self.notice = None;
    }

    /// Current contents of the mounted surface as a PNG.
    pub fn export_drawing(&self) -> Result<EncodedImage, canvas::CanvasError> {
        self.surface
            .as_ref()
            .ok_or(canvas::CanvasError::NotReady)?
            .export_image()
    }

    /// Drawing → Analyzing with the exported surface.
    ///
    /// On export failure the screen stays on Drawing with an inline notice.
    pub fn submit_drawing(&mut self) -> Option<(SessionId, EncodedImage)> {
        if self.screen != AppScreen::Drawing {
            return None;
        }
        match self.export_drawing() {
            Ok(image) => {
                let id = self.begin_analysis(image.clone())?;
                Some((id, image))
            }
            Err(e) => {
                log::warn!("[STATE] Drawing export failed: {}", e);
                self.notice = Some(EXPORT_FAILED_NOTICE.to_string());
                None
            }
        }
    }

    /// Home → Analyzing with an uploaded image.
    pub fn upload(&mut self, image: EncodedImage) -> Option<SessionId> {
        if self.screen != AppScreen::Home {
            return None;
        }
        self.begin_analysis(image)
    }

    /// Any screen → Home. Forgets the image, text, error and surface.
    pub fn reset(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.reset();
        }
        self.surface = None;
        if let Some(session) = self.session.take() {
            if session.is_open() {
                log::info!("[STATE] Abandoning in-flight session {}", session.id);
            }
        }
        self.error = None;
        self.notice = None;
        self.screen = AppScreen::Home;
        log::info!("[STATE] Reset → Home");
    }

    // ── Adapter events ──────────────────────────────────────────────

    /// Open a new session and move to Analyzing.
    ///
    /// Only allowed from Home or Drawing, so a second submission cannot race
    /// the first.
    pub fn begin_analysis(&mut self, image: EncodedImage) -> Option<SessionId> {
        if !self.screen.accepts_submission() {
            log::warn!("[STATE] Ignoring submission while on {:?}", self.screen);
            return None;
        }
        self.last_session += 1;
        let id = SessionId(self.last_session);
        self.session = Some(AnalysisSession {
            id,
            image,
            text: String::new(),
            complete: false,
            error: None,
        });
        self.surface = None;
        self.error = None;
        self.notice = None;
        log::info!("[STATE] {:?} → Analyzing (session {})", self.screen, id);
        self.screen = AppScreen::Analyzing;
        Some(id)
    }

    /// Append a chunk. Returns false when the session is stale or closed.
    pub fn apply_chunk(&mut self, id: SessionId, chunk: &str) -> bool {
        let Some(session) = self.open_session_mut(id) else {
            return false;
        };
        session.text.push_str(chunk);
        if self.screen == AppScreen::Analyzing {
            log::info!("[STATE] Analyzing → Result (session {})", id);
            self.screen = AppScreen::Result;
        }
        true
    }

    /// The stream was exhausted.
    pub fn finish(&mut self, id: SessionId) -> bool {
        let Some(session) = self.open_session_mut(id) else {
            return false;
        };
        session.complete = true;
        log::info!(
            "[STATE] Session {} complete ({} chars)",
            id,
            session.text.chars().count()
        );
        // A stream that completed without a single chunk still lands on Result.
        self.screen = AppScreen::Result;
        true
    }

    /// The stream failed. Partial text is kept; the user sees the fixed message.
    pub fn fail(&mut self, id: SessionId, error: AnalysisError) -> bool {
        let Some(session) = self.open_session_mut(id) else {
            log::debug!("[STATE] Dropping failure for stale session {}: {}", id, error);
            return false;
        };
        log::error!("[STATE] Session {} failed: {}", id, error);
        session.error = Some(error);
        self.error = Some(ANALYSIS_FAILED_MESSAGE.to_string());
        self.screen = AppScreen::Error;
        true
    }

    fn open_session_mut(&mut self, id: SessionId) -> Option<&mut AnalysisSession> {
        match self.session.as_mut() {
            Some(session) if session.id == id && session.is_open() => Some(session),
            _ => {
                log::debug!("[STATE] Event for stale session {}", id);
                None
            }
        }
    }
}
