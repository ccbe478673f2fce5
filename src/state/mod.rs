//! Application state domain — public API.
//!
//! `App` is the synchronous state machine; `SharedApp` is the thread-safe
//! handle the commands and the analysis pipeline share, which publishes a
//! fresh `ViewState` to subscribers after every change.

mod machine;
mod view;

pub use machine::{
    AnalysisSession, App, SessionId, ANALYSIS_FAILED_MESSAGE, DEFAULT_VIEWPORT_WIDTH,
    EXPORT_FAILED_NOTICE,
};
pub use view::{AppScreen, ViewState};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Cloneable handle to the one `App` instance.
#[derive(Clone)]
pub struct SharedApp {
    app: Arc<Mutex<App>>,
    view_tx: Arc<watch::Sender<ViewState>>,
}

impl Default for SharedApp {
    fn default() -> Self {
        Self::new(App::new())
    }
}

impl SharedApp {
    pub fn new(app: App) -> Self {
        let (view_tx, _) = watch::channel(app.view());
        Self {
            app: Arc::new(Mutex::new(app)),
            view_tx: Arc::new(view_tx),
        }
    }

    /// Receive a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view_tx.subscribe()
    }

    /// Current snapshot.
    pub fn view(&self) -> ViewState {
        self.lock().view()
    }

    /// Mutate the app and publish the resulting view.
    pub fn update<R>(&self, f: impl FnOnce(&mut App) -> R) -> R {
        let mut guard = self.lock();
        let result = f(&mut guard);
        let view = guard.view();
        drop(guard);
        self.view_tx.send_replace(view);
        result
    }

    /// Read without publishing.
    pub fn read<R>(&self, f: impl FnOnce(&App) -> R) -> R {
        f(&self.lock())
    }

    /// Mutate without publishing. For high-frequency input that does not
    /// change what the view shows (strokes are on the surface, not the view).
    pub fn update_quiet<R>(&self, f: impl FnOnce(&mut App) -> R) -> R {
        f(&mut self.lock())
    }

    /// Poisoning is ignored; `reset` always brings the app back to Home.
    fn lock(&self) -> MutexGuard<'_, App> {
        self.app.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_are_published() {
        let shared = SharedApp::default();
        let mut rx = shared.subscribe();
        assert_eq!(rx.borrow_and_update().screen, AppScreen::Home);

        shared.update(|app| app.start_drawing());
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().screen, AppScreen::Drawing);
    }

    #[test]
    fn quiet_updates_are_not_published() {
        let shared = SharedApp::default();
        shared.update(|app| app.start_drawing());
        let mut rx = shared.subscribe();
        rx.borrow_and_update();

        shared.update_quiet(|app| {
            if let Some(surface) = app.surface_mut() {
                surface.begin_stroke(crate::canvas::Point::new(1.0, 1.0));
            }
        });
        assert!(!rx.has_changed().unwrap());
        assert!(shared.read(|app| app.surface().unwrap().is_tracing()));
    }
}
