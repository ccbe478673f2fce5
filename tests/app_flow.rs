//! End-to-end user flows: commands → state machine → adapter → fake Gemini.

mod gemini_helpers;

use gemini_helpers::{final_event, text_event, MockGemini, Reply, TEST_KEY};
use mindscape_lib::commands;
use mindscape_lib::llm::Analyzer;
use mindscape_lib::state::{ANALYSIS_FAILED_MESSAGE, EXPORT_FAILED_NOTICE};
use mindscape_lib::{AppScreen, PointerInput, SharedApp};
use std::sync::Arc;

fn analyzer_for(mock: &MockGemini, key: &str) -> Arc<dyn Analyzer> {
    Arc::new(mock.analyzer(key))
}

/// Trace a closed triangle with mouse events, offset like a real page.
fn draw_closed_shape(app: &SharedApp) {
    commands::set_canvas_origin(app, 16.0, 96.0);
    commands::pointer_down(app, &PointerInput::mouse(66.0, 296.0));
    commands::pointer_move(app, &PointerInput::mouse(166.0, 146.0));
    commands::pointer_move(app, &PointerInput::mouse(266.0, 296.0));
    commands::pointer_move(app, &PointerInput::mouse(66.0, 296.0));
    commands::pointer_up(app);
}

#[tokio::test]
async fn draw_submit_stream_result() {
    let mock = MockGemini::start(Reply::Events(vec![
        text_event("**General Impression**: "),
        text_event("calm and "),
        final_event("grounded."),
    ]))
    .await;
    let analyzer = analyzer_for(&mock, TEST_KEY);
    let app = SharedApp::default();
    let mut views = app.subscribe();

    assert!(commands::start_drawing(&app));
    assert_eq!(app.view().screen, AppScreen::Drawing);
    draw_closed_shape(&app);

    let task = commands::submit_drawing(&app, &analyzer).expect("analysis should start");
    // The transition happens before any network traffic.
    assert_eq!(app.view().screen, AppScreen::Analyzing);
    assert!(views.has_changed().unwrap());

    task.handle.await.unwrap();

    let view = app.view();
    assert_eq!(view.screen, AppScreen::Result);
    assert_eq!(view.analysis_text, "**General Impression**: calm and grounded.");
    assert!(!view.is_streaming);
    assert!(view.error.is_none());
    assert!(view.image.unwrap().as_data_uri().starts_with("data:image/png;base64,"));

    let request = mock.request().await;
    assert_eq!(request.body["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/png");
    assert_eq!(views.borrow_and_update().screen, AppScreen::Result);
}

#[tokio::test]
async fn second_submit_is_ignored_while_analyzing() {
    let mock = MockGemini::start(Reply::Events(vec![final_event("done")])).await;
    let analyzer = analyzer_for(&mock, TEST_KEY);
    let app = SharedApp::default();

    commands::start_drawing(&app);
    let first = commands::submit_drawing(&app, &analyzer).unwrap();
    assert!(commands::submit_drawing(&app, &analyzer).is_none());
    assert!(commands::upload_file(&app, &analyzer, b"\x89PNG\r\n\x1a\n", None).is_none());

    first.handle.await.unwrap();
    assert_eq!(app.view().analysis_text, "done");
}

#[tokio::test]
async fn missing_key_goes_straight_to_error() {
    let mock = MockGemini::start(Reply::Events(vec![final_event("unused")])).await;
    let analyzer = analyzer_for(&mock, "");
    let app = SharedApp::default();

    commands::start_drawing(&app);
    draw_closed_shape(&app);
    let task = commands::submit_drawing(&app, &analyzer).unwrap();
    task.handle.await.unwrap();

    let view = app.view();
    assert_eq!(view.screen, AppScreen::Error);
    assert_eq!(view.error.as_deref(), Some(ANALYSIS_FAILED_MESSAGE));
    assert!(mock.was_never_called().await);
}

#[tokio::test]
async fn disguised_upload_ends_on_error() {
    let mock = MockGemini::start(Reply::Events(vec![final_event("unused")])).await;
    let analyzer = analyzer_for(&mock, TEST_KEY);
    let app = SharedApp::default();

    let task = commands::upload_file(
        &app,
        &analyzer,
        b"Quarterly report, definitely not a picture",
        Some("image/jpeg"),
    )
    .unwrap();
    task.handle.await.unwrap();

    let view = app.view();
    assert_eq!(view.screen, AppScreen::Error);
    assert_eq!(view.error.as_deref(), Some(ANALYSIS_FAILED_MESSAGE));
    assert!(mock.was_never_called().await);
}

#[tokio::test]
async fn empty_upload_ends_on_error() {
    let mock = MockGemini::start(Reply::Events(vec![final_event("unused")])).await;
    let analyzer = analyzer_for(&mock, TEST_KEY);
    let app = SharedApp::default();

    let task = commands::upload_file(&app, &analyzer, &[], Some("image/png")).unwrap();
    assert_eq!(app.view().screen, AppScreen::Analyzing);
    task.handle.await.unwrap();

    let view = app.view();
    assert_eq!(view.screen, AppScreen::Error);
    assert_eq!(view.error.as_deref(), Some(ANALYSIS_FAILED_MESSAGE));
    assert!(mock.was_never_called().await);
}

#[tokio::test]
async fn failed_export_shows_notice_and_stays_on_drawing() {
    let mock = MockGemini::start(Reply::Events(vec![])).await;
    let analyzer = analyzer_for(&mock, TEST_KEY);
    let app = SharedApp::default();

    commands::start_drawing(&app);
    // A zero-width viewport leaves the surface without a buffer.
    app.update(|a| {
        if let Some(surface) = a.surface_mut() {
            surface.resize(0, 0, 1.0);
        }
    });

    assert!(commands::submit_drawing(&app, &analyzer).is_none());
    let view = app.view();
    assert_eq!(view.screen, AppScreen::Drawing);
    assert_eq!(view.notice.as_deref(), Some(EXPORT_FAILED_NOTICE));
}

#[tokio::test]
async fn dropped_connection_shows_error_but_keeps_text() {
    let mock = MockGemini::start(Reply::Truncated(vec![text_event("The House ")])).await;
    let analyzer = analyzer_for(&mock, TEST_KEY);
    let app = SharedApp::default();

    let png = {
        let surface = mindscape_lib::DrawingSurface::with_size(32, 32, 1.0);
        surface.export_image().unwrap()
    };
    let bytes = {
        use base64::Engine;
        let (_, payload) = mindscape_lib::encoded::strip_header(png.as_data_uri());
        base64::engine::general_purpose::STANDARD.decode(payload).unwrap()
    };

    let task = commands::upload_file(&app, &analyzer, &bytes, None).unwrap();
    task.handle.await.unwrap();

    let view = app.view();
    assert_eq!(view.screen, AppScreen::Error);
    assert_eq!(view.analysis_text, "The House ");
}

#[tokio::test]
async fn reset_mid_stream_discards_late_chunks() {
    let mock = MockGemini::start(Reply::Events(vec![
        text_event("one "),
        text_event("two "),
        text_event("three "),
        final_event("four"),
    ]))
    .await;
    let analyzer = analyzer_for(&mock, TEST_KEY);
    let app = SharedApp::default();
    let mut views = app.subscribe();

    commands::start_drawing(&app);
    draw_closed_shape(&app);
    let task = commands::submit_drawing(&app, &analyzer).unwrap();

    // Wait for the first chunk to land, then walk away.
    loop {
        views.changed().await.unwrap();
        if !views.borrow_and_update().analysis_text.is_empty() {
            break;
        }
    }
    commands::reset(&app);
    task.handle.await.unwrap();

    let view = app.view();
    assert_eq!(view.screen, AppScreen::Home);
    assert_eq!(view.analysis_text, "");
    assert!(view.image.is_none());
    assert!(view.error.is_none());
}

#[tokio::test]
async fn clear_and_resize_keep_the_drawing_screen() {
    let app = SharedApp::default();
    commands::start_drawing(&app);
    draw_closed_shape(&app);

    commands::clear_canvas(&app);
    let blank = app.read(|a| a.surface().unwrap().export_image().unwrap());
    let fresh = mindscape_lib::DrawingSurface::with_size(300, 300, 1.0)
        .export_image()
        .unwrap();
    assert_eq!(blank, fresh);

    commands::resize_viewport(&app, 1024, 2.0);
    let view = app.view();
    assert_eq!(view.screen, AppScreen::Drawing);
    assert_eq!(view.canvas_size, Some(500));
}
