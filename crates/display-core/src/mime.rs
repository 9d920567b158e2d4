//! MIME bundles: alternative representations of one piece of content.

use std::collections::BTreeMap;

use serde_json::Value;

/// `text/plain` content.
pub const TEXT_PLAIN: &str = "text/plain";
/// `text/html` content.
pub const TEXT_HTML: &str = "text/html";
/// `text/markdown` content.
pub const TEXT_MARKDOWN: &str = "text/markdown";
/// `text/latex` content.
pub const TEXT_LATEX: &str = "text/latex";
/// `image/png` content (base64 payload).
pub const IMAGE_PNG: &str = "image/png";
/// `image/jpeg` content (base64 payload).
pub const IMAGE_JPEG: &str = "image/jpeg";
/// `image/svg+xml` content (textual payload).
pub const IMAGE_SVG: &str = "image/svg+xml";
/// Widget view placeholder: rendered out-of-document by an external viewer,
/// so its output cannot be tagged as a region.
pub const WIDGET_VIEW: &str = "application/vnd.jupyter.widget-view+json";

/// Default preference order for hosts that can display graphics: richer
/// types first, plain text last.
pub const RICH_PREFERENCE: &[&str] = &[
    WIDGET_VIEW,
    TEXT_HTML,
    TEXT_MARKDOWN,
    TEXT_LATEX,
    IMAGE_SVG,
    IMAGE_PNG,
    IMAGE_JPEG,
    TEXT_PLAIN,
];

/// Shorter preference order for hosts without graphics support.
pub const PLAIN_PREFERENCE: &[&str] = &[TEXT_MARKDOWN, TEXT_LATEX, TEXT_PLAIN];

/// A keyed collection of alternative representations of one logical piece of
/// content, one entry per MIME type, plus optional per-type metadata.
///
/// Bundles are read-only once handed to the core; the builder methods exist
/// for hosts and tests assembling one.
#[derive(Debug, Clone, Default)]
pub struct MimeBundle {
    data: BTreeMap<String, String>,
    metadata: BTreeMap<String, Value>,
}

impl MimeBundle {
    /// Create an empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a representation for `mime`.
    pub fn with(mut self, mime: &str, content: impl Into<String>) -> Self {
        self.data.insert(mime.to_string(), content.into());
        self
    }

    /// Attach per-type metadata for `mime` (e.g. image width/height).
    pub fn with_metadata(mut self, mime: &str, metadata: Value) -> Self {
        self.metadata.insert(mime.to_string(), metadata);
        self
    }

    /// The raw content registered for `mime`, if present.
    pub fn get(&self, mime: &str) -> Option<&str> {
        self.data.get(mime).map(String::as_str)
    }

    /// The metadata registered for `mime`, if present.
    pub fn metadata(&self, mime: &str) -> Option<&Value> {
        self.metadata.get(mime)
    }

    /// All MIME types present in the bundle's data map, in sorted order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Check whether the bundle holds no representations.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
