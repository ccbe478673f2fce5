//! User-action handlers.
//!
//! Thin wrappers the front-end calls: each one does a single thing to the
//! shared state. The two that start an analysis move the screen first and
//! only then spawn the pipeline task.
//!
//! The multi-step analysis itself lives in pipeline.rs.

use crate::canvas::PointerInput;
use crate::encoded::EncodedImage;
use crate::llm::Analyzer;
use crate::pipeline;
use crate::state::{SessionId, SharedApp};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A started analysis: its session and the task driving it.
#[derive(Debug)]
pub struct AnalysisTask {
    pub session: SessionId,
    pub handle: JoinHandle<()>,
}

/// "Draw Here": Home → Drawing.
pub fn start_drawing(app: &SharedApp) -> bool {
    app.update(|a| a.start_drawing())
}

/// "Upload Art": read the file and start analyzing it right away.
///
/// Must be called from within a tokio runtime.
pub fn upload_file(
    app: &SharedApp,
    analyzer: &Arc<dyn Analyzer>,
    bytes: &[u8],
    declared_mime: Option<&str>,
) -> Option<AnalysisTask> {
    let image = EncodedImage::from_upload(bytes, declared_mime);
    log::info!(
        "[UPLOAD] Read {} bytes as {}",
        bytes.len(),
        image.mime_type()
    );

    let session = app.update(|a| a.upload(image.clone()))?;
    Some(spawn_analysis(app, analyzer, session, image))
}

/// "Analyze Artwork": export the drawing and start analyzing it.
///
/// Stays on the drawing screen (with a notice) if the export fails.
/// Must be called from within a tokio runtime.
pub fn submit_drawing(app: &SharedApp, analyzer: &Arc<dyn Analyzer>) -> Option<AnalysisTask> {
    let (session, image) = app.update(|a| a.submit_drawing())?;
    Some(spawn_analysis(app, analyzer, session, image))
}

/// Back button / logo click.
pub fn reset(app: &SharedApp) {
    app.update(|a| a.reset());
}

/// "Clear" on the drawing screen.
pub fn clear_canvas(app: &SharedApp) {
    app.update(|a| a.clear_canvas());
}

/// Window resized or moved to a display with another pixel density.
pub fn resize_viewport(app: &SharedApp, width: u32, device_pixel_ratio: f32) {
    app.update(|a| a.set_viewport(width, device_pixel_ratio));
}

/// Where the drawing surface's top-left corner sits on screen.
pub fn set_canvas_origin(app: &SharedApp, left: f32, top: f32) {
    app.update_quiet(|a| {
        if let Some(surface) = a.surface_mut() {
            surface.set_screen_origin(left, top);
        }
    });
}

pub fn pointer_down(app: &SharedApp, input: &PointerInput) {
    app.update_quiet(|a| {
        if let Some(surface) = a.surface_mut() {
            surface.pointer_down(input);
        }
    });
}

pub fn pointer_move(app: &SharedApp, input: &PointerInput) {
    app.update_quiet(|a| {
        if let Some(surface) = a.surface_mut() {
            surface.pointer_move(input);
        }
    });
}

pub fn pointer_up(app: &SharedApp) {
    app.update_quiet(|a| {
        if let Some(surface) = a.surface_mut() {
            surface.pointer_up();
        }
    });
}

pub fn pointer_leave(app: &SharedApp) {
    app.update_quiet(|a| {
        if let Some(surface) = a.surface_mut() {
            surface.pointer_leave();
        }
    });
}

fn spawn_analysis(
    app: &SharedApp,
    analyzer: &Arc<dyn Analyzer>,
    session: SessionId,
    image: EncodedImage,
) -> AnalysisTask {
    let handle = tokio::spawn(pipeline::run_analysis(
        app.clone(),
        Arc::clone(analyzer),
        session,
        image,
    ));
    AnalysisTask { session, handle }
}
