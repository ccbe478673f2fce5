//! Analysis pipeline: image → adapter → chunks → state machine.
//!
//! The screen has already moved to Analyzing before this runs (see
//! `App::begin_analysis`). Every event is tagged with the session id, so
//! once the user resets, whatever is still in flight is discarded and the
//! stream is dropped, which cancels the producer.

use crate::encoded::EncodedImage;
use crate::llm::Analyzer;
use crate::state::{SessionId, SharedApp};
use std::sync::Arc;

/// Drive one analysis session to completion, failure, or abandonment.
pub async fn run_analysis(
    app: SharedApp,
    analyzer: Arc<dyn Analyzer>,
    session: SessionId,
    image: EncodedImage,
) {
    let pipeline_start = std::time::Instant::now();
    log::info!(
        "[PIPELINE] Session {}: analyzing {} ({} bytes)",
        session,
        image.mime_type(),
        image.len()
    );

    let mut stream = match analyzer.analyze(image) {
        Ok(stream) => stream,
        Err(e) => {
            log::error!("[PIPELINE] Session {}: could not start: {}", session, e);
            app.update(|a| a.fail(session, e));
            return;
        }
    };

    let mut chunks = 0usize;
    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                chunks += 1;
                if !app.update(|a| a.apply_chunk(session, &chunk)) {
                    log::info!(
                        "[PIPELINE] Session {}: no longer current — dropping stream",
                        session
                    );
                    return;
                }
            }
            Err(e) => {
                log::error!(
                    "[PIPELINE] Session {}: failed after {} chunks: {}",
                    session, chunks, e
                );
                app.update(|a| a.fail(session, e));
                return;
            }
        }
    }

    app.update(|a| a.finish(session));
    log::info!(
        "[PIPELINE] Session {}: {} chunks in {}ms",
        session,
        chunks,
        pipeline_start.elapsed().as_millis()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{AnalysisError, ChunkStream};
    use crate::state::{AppScreen, ANALYSIS_FAILED_MESSAGE};

    struct Scripted(Vec<Result<String, AnalysisError>>);

    impl Analyzer for Scripted {
        fn analyze(&self, _image: EncodedImage) -> Result<ChunkStream, AnalysisError> {
            Ok(ChunkStream::from_results(self.0.clone()))
        }
    }

    struct Refusing;

    impl Analyzer for Refusing {
        fn analyze(&self, _image: EncodedImage) -> Result<ChunkStream, AnalysisError> {
            Err(AnalysisError::MissingApiKey)
        }
    }

    fn image() -> EncodedImage {
        EncodedImage::from_data_uri("data:image/png;base64,iVBORw0KGgo=").unwrap()
    }

    fn start(app: &SharedApp) -> SessionId {
        app.update(|a| a.upload(image())).unwrap()
    }

    #[tokio::test]
    async fn chunks_accumulate_into_result() {
        let app = SharedApp::default();
        let id = start(&app);
        let analyzer = Arc::new(Scripted(
            ["Gen", "eral ", "Impression..."]
                .iter()
                .map(|s| Ok(s.to_string()))
                .collect(),
        ));

        run_analysis(app.clone(), analyzer, id, image()).await;

        let view = app.view();
        assert_eq!(view.screen, AppScreen::Result);
        assert_eq!(view.analysis_text, "General Impression...");
        assert!(!view.is_streaming);
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_partial_text() {
        let app = SharedApp::default();
        let id = start(&app);
        let analyzer = Arc::new(Scripted(vec![
            Ok("General ".to_string()),
            Err(AnalysisError::Stream("reset by peer".into())),
        ]));

        run_analysis(app.clone(), analyzer, id, image()).await;

        let view = app.view();
        assert_eq!(view.screen, AppScreen::Error);
        assert_eq!(view.error.as_deref(), Some(ANALYSIS_FAILED_MESSAGE));
        assert_eq!(view.analysis_text, "General ");
    }

    #[tokio::test]
    async fn refusal_goes_straight_to_error() {
        let app = SharedApp::default();
        let id = start(&app);

        run_analysis(app.clone(), Arc::new(Refusing), id, image()).await;

        assert_eq!(app.view().screen, AppScreen::Error);
        assert_eq!(app.view().analysis_text, "");
    }

    #[tokio::test]
    async fn abandoned_session_does_not_touch_fresh_state() {
        let app = SharedApp::default();
        let stale = start(&app);
        app.update(|a| a.reset());

        let analyzer = Arc::new(Scripted(vec![Ok("late".to_string())]));
        run_analysis(app.clone(), analyzer, stale, image()).await;

        let view = app.view();
        assert_eq!(view.screen, AppScreen::Home);
        assert_eq!(view.analysis_text, "");
        assert!(view.error.is_none());
    }
}
