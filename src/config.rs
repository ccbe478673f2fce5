//! Process-wide configuration — `.env` loading, credential lookup, model settings.
//!
//! The credential is read from the environment at call time, never cached,
//! so an analysis attempt always sees the current configuration.

/// Primary env var holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Legacy env var name, checked when `GEMINI_API_KEY` is unset.
pub const FALLBACK_API_KEY_ENV: &str = "API_KEY";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Balanced creativity and accuracy. Not overridable.
pub const TEMPERATURE: f32 = 0.7;

/// Load `.env.local` → `.env` from the project root.
///
/// The first file found wins. Missing files are fine; parse failures are
/// reported on stderr because the logger is not up yet.
pub fn load_env() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));

    for env_file in [".env.local", ".env"] {
        let path = root.join(env_file);
        if path.exists() {
            match dotenvy::from_path(&path) {
                Ok(_) => eprintln!("[STARTUP] Loaded {}", path.display()),
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
            break;
        }
    }
}

/// Load the environment and start the logger. Safe to call more than once.
pub fn init() {
    load_env();
    let _ = env_logger::try_init();
    log::info!("MindScape starting up");
}

/// Current API key, if one is configured. Empty values count as missing.
pub fn api_key() -> Option<String> {
    [API_KEY_ENV, FALLBACK_API_KEY_ENV]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|key| !key.trim().is_empty())
}

pub fn has_api_key() -> bool {
    api_key().is_some()
}

/// Which model to call and where.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: TEMPERATURE,
        }
    }
}

impl ModelSettings {
    /// Defaults with `GEMINI_MODEL` / `GEMINI_API_BASE` overrides applied.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            if !model.trim().is_empty() {
                log::info!("[LLM] Model override: {}", model);
                settings.model = model;
            }
        }
        if let Ok(base) = std::env::var("GEMINI_API_BASE") {
            if !base.trim().is_empty() {
                settings.base_url = base;
            }
        }
        settings
    }

    /// Streaming endpoint for the configured model (key is appended by the caller).
    pub fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}
