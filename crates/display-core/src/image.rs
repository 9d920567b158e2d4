//! Inline image rendering.
//!
//! Images are not document text: the strategy inserts a short placeholder
//! run and anchors an [`ImageSpec`] over it through the document's image
//! layer, the same way virtual content is anchored to offsets elsewhere in
//! the workspace. The host's renderer draws the image over the placeholder.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;

use crate::document::Document;
use crate::error::RenderError;
use crate::registry::RenderStrategy;

/// Fixed vertical anchoring for inline images, in percent of the image
/// height above the baseline. Centering keeps inline images visually aligned
/// with the surrounding text instead of sitting on the baseline.
pub const IMAGE_ASCENT_PERCENT: u8 = 50;

/// Placeholder text inserted under an image overlay.
pub const IMAGE_PLACEHOLDER: &str = "[image]";

/// Decoded image payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageData {
    /// Decoded raster bytes (png, jpeg).
    Bytes(Vec<u8>),
    /// Vector source text (svg).
    Svg(String),
    /// An unresolved reference (e.g. an `<img src>` URL).
    Uri(String),
}

/// How the host should composite an image that needs an opaque backdrop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Matting {
    /// Draw directly over the document background.
    #[default]
    None,
    /// Matte onto an opaque background first (images with transparency that
    /// assume a light backdrop).
    Background,
}

/// An image anchored over a document span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    /// Image format tag (the originating MIME type or `"uri"`).
    pub format: String,
    /// The payload.
    pub data: ImageData,
    /// Requested display width in pixels, when the host supplied one.
    pub width: Option<u32>,
    /// Requested display height in pixels.
    pub height: Option<u32>,
    /// Compositing mode.
    pub matting: Matting,
    /// Vertical anchoring in percent above the baseline.
    pub ascent_percent: u8,
}

impl ImageSpec {
    /// Create a spec with the fixed centering ascent and no size hints.
    pub fn new(format: &str, data: ImageData) -> Self {
        Self {
            format: format.to_string(),
            data,
            width: None,
            height: None,
            matting: Matting::None,
            ascent_percent: IMAGE_ASCENT_PERCENT,
        }
    }
}

fn u32_field(metadata: Option<&Value>, key: &str) -> Option<u32> {
    metadata?.get(key)?.as_u64().map(|v| v as u32)
}

fn bool_field(metadata: Option<&Value>, key: &str) -> bool {
    metadata
        .and_then(|m| m.get(key))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Strategy for one raster or vector image MIME type.
///
/// Raster payloads (`image/png`, `image/jpeg`) arrive base64-encoded and are
/// decoded here; a decode failure is a [`RenderError`] the registry
/// propagates. SVG payloads stay textual.
pub struct ImageStrategy {
    mime: String,
    base64: bool,
}

impl ImageStrategy {
    /// Strategy for a base64-encoded raster type.
    pub fn raster(mime: &str) -> Self {
        Self {
            mime: mime.to_string(),
            base64: true,
        }
    }

    /// Strategy for a textual vector type.
    pub fn svg(mime: &str) -> Self {
        Self {
            mime: mime.to_string(),
            base64: false,
        }
    }
}

impl RenderStrategy for ImageStrategy {
    fn render(
        &mut self,
        doc: &mut Document,
        content: &str,
        metadata: Option<&Value>,
    ) -> Result<bool, RenderError> {
        let data = if self.base64 {
            // Payloads commonly carry embedded newlines.
            let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            ImageData::Bytes(BASE64.decode(compact.as_bytes())?)
        } else {
            ImageData::Svg(content.to_string())
        };

        let mut spec = ImageSpec::new(&self.mime, data);
        spec.width = u32_field(metadata, "width");
        spec.height = u32_field(metadata, "height");
        if bool_field(metadata, "needs_background") || bool_field(metadata, "needsBackground") {
            spec.matting = Matting::Background;
        }

        let begin = doc.point();
        doc.insert_at_point(IMAGE_PLACEHOLDER);
        doc.set_image(begin, doc.point(), spec);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mime::IMAGE_PNG;
    use serde_json::json;

    #[test]
    fn test_raster_decodes_base64_and_reads_metadata() {
        let mut doc = Document::new();
        let mut strategy = ImageStrategy::raster(IMAGE_PNG);

        let handled = strategy
            .render(
                &mut doc,
                "aGVs\nbG8=",
                Some(&json!({"width": 320, "needs_background": true})),
            )
            .unwrap();
        assert!(handled);
        assert_eq!(doc.text(), IMAGE_PLACEHOLDER);

        let spec = doc.image_at(0).unwrap();
        assert_eq!(spec.data, ImageData::Bytes(b"hello".to_vec()));
        assert_eq!(spec.width, Some(320));
        assert_eq!(spec.height, None);
        assert_eq!(spec.matting, Matting::Background);
        assert_eq!(spec.ascent_percent, IMAGE_ASCENT_PERCENT);
    }

    #[test]
    fn test_invalid_base64_is_fatal() {
        let mut doc = Document::new();
        let mut strategy = ImageStrategy::raster(IMAGE_PNG);

        let err = strategy.render(&mut doc, "!!!not-base64!!!", None);
        assert!(matches!(err, Err(RenderError::InvalidBase64(_))));
        // Nothing was inserted before the failure.
        assert!(doc.is_empty());
    }

    #[test]
    fn test_svg_stays_textual() {
        let mut doc = Document::new();
        let mut strategy = ImageStrategy::svg(crate::mime::IMAGE_SVG);

        strategy.render(&mut doc, "<svg/>", None).unwrap();
        let spec = doc.image_at(0).unwrap();
        assert_eq!(spec.data, ImageData::Svg("<svg/>".to_string()));
    }
}
