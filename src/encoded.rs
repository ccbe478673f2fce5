//! Encoded images — the self-describing payload handed to the analyzer.
//!
//! Both the drawing export and the upload path produce a data URI
//! (`data:<mime>;base64,<payload>`), the same shape a browser canvas or
//! file reader would hand over. Once built it is never mutated.

use base64::Engine;
use regex::Regex;
use std::sync::{Arc, OnceLock};

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ImageError {
    #[error("not a data URI")]
    NotDataUri,
    #[error("data URI is not base64 encoded")]
    NotBase64,
    #[error("empty image payload")]
    Empty,
}

/// An immutable, self-describing image payload. Clones share the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    data_uri: Arc<str>,
}

impl EncodedImage {
    /// Wrap PNG bytes (the drawing surface export path).
    pub fn from_png_bytes(png: &[u8]) -> Self {
        Self::from_bytes(png, "image/png")
    }

    /// Read an uploaded file into a data URI.
    ///
    /// The declared type wins; otherwise the bytes are sniffed. Anything
    /// unrecognised is tagged `application/octet-stream`, which the analyzer
    /// later rejects. An empty file still yields a (payload-less) data URI.
    pub fn from_upload(bytes: &[u8], declared_mime: Option<&str>) -> Self {
        let mime = match declared_mime.map(str::trim).filter(|m| !m.is_empty()) {
            Some(m) => m.to_ascii_lowercase(),
            None => sniff_mime(bytes).unwrap_or(OCTET_STREAM).to_string(),
        };
        Self::from_bytes(bytes, &mime)
    }

    /// Accept an existing data URI after checking its framing.
    pub fn from_data_uri(uri: &str) -> Result<Self, ImageError> {
        let rest = uri.strip_prefix("data:").ok_or(ImageError::NotDataUri)?;
        let (header, payload) = rest.split_once(',').ok_or(ImageError::NotDataUri)?;
        if !header.ends_with(";base64") {
            return Err(ImageError::NotBase64);
        }
        if payload.is_empty() {
            return Err(ImageError::Empty);
        }
        Ok(Self {
            data_uri: Arc::from(uri),
        })
    }

    fn from_bytes(bytes: &[u8], mime: &str) -> Self {
        let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self {
            data_uri: Arc::from(format!("data:{};base64,{}", mime, payload)),
        }
    }

    pub fn mime_type(&self) -> &str {
        self.data_uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split([';', ',']).next())
            .unwrap_or(OCTET_STREAM)
    }

    pub fn as_data_uri(&self) -> &str {
        &self.data_uri
    }

    /// Length of the data URI in bytes.
    pub fn len(&self) -> usize {
        self.data_uri.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data_uri.is_empty()
    }
}

impl serde::Serialize for EncodedImage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.data_uri)
    }
}

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^data:image/(png|jpeg|jpg|webp);base64,").expect("static regex")
    })
}

/// Strip a recognised image data-URI header.
///
/// Returns the mime type named in the header (when one was stripped) and the
/// remaining raw base64 payload. Unrecognised headers are left in place.
pub fn strip_header(data_uri: &str) -> (Option<String>, &str) {
    match header_pattern().captures(data_uri) {
        Some(caps) => {
            let subtype = match &caps[1] {
                "jpg" => "jpeg",
                other => other,
            };
            let whole = caps.get(0).map_or(0, |m| m.end());
            (Some(format!("image/{}", subtype)), &data_uri[whole..])
        }
        None => (None, data_uri),
    }
}

/// Mime type for raster formats the analyzer accepts, from magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        image::ImageFormat::Png => Some("image/png"),
        image::ImageFormat::Jpeg => Some("image/jpeg"),
        image::ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}
