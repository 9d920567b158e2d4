//! LaTeX rendering through an external image pipeline.

use display_core::{
    Document, Face, ImageData, ImageSpec, Markup, RenderError, RenderStrategy, mime,
};
use serde_json::Value;

use crate::convert::Converter;

/// A command producing image bytes from TeX source on stdin.
#[derive(Debug, Clone)]
pub struct LatexPipeline {
    converter: Converter,
    /// MIME tag of the produced image (`image/png` by default).
    format: String,
}

impl LatexPipeline {
    /// Pipeline producing `image/png`.
    pub fn new(converter: Converter) -> Self {
        Self {
            converter,
            format: mime::IMAGE_PNG.to_string(),
        }
    }

    /// Override the produced image format tag.
    pub fn with_format(mut self, format: &str) -> Self {
        self.format = format.to_string();
        self
    }

    /// Check whether the pipeline's command can run (for gated registration).
    pub fn available(&self) -> bool {
        self.converter.available()
    }

    fn run(&self, tex: &str) -> Result<ImageSpec, RenderError> {
        let bytes = self
            .converter
            .convert(mime::TEXT_LATEX, &self.format, tex.as_bytes())
            .map_err(|e| RenderError::Conversion(e.to_string()))?;
        Ok(ImageSpec::new(&self.format, ImageData::Bytes(bytes)))
    }
}

/// `text/latex` strategy.
///
/// The TeX source is inserted into the document either way. With a pipeline,
/// the source is marked invisible and the produced image is anchored over it
/// (the raw TeX stays underneath for copy and export); without one, the
/// source stays visible with a math face.
pub struct LatexStrategy {
    pipeline: Option<LatexPipeline>,
}

impl LatexStrategy {
    /// Textual fallback: visible TeX with a math face.
    pub fn plain() -> Self {
        Self { pipeline: None }
    }

    /// Render through an external image pipeline.
    pub fn with_pipeline(pipeline: LatexPipeline) -> Self {
        Self {
            pipeline: Some(pipeline),
        }
    }
}

impl RenderStrategy for LatexStrategy {
    fn render(
        &mut self,
        doc: &mut Document,
        content: &str,
        _metadata: Option<&Value>,
    ) -> Result<bool, RenderError> {
        let begin = doc.point();
        doc.insert_at_point(content);
        let end = doc.point();
        doc.prepend_face(begin, end, Face::markup(Markup::Math));

        if let Some(pipeline) = &self.pipeline {
            let spec = pipeline.run(content)?;
            doc.set_invisible(begin, end);
            doc.set_image(begin, end, spec);
        }
        Ok(true)
    }
}
