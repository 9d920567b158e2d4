//! Error taxonomy for rendering and display-region operations.
//!
//! "No renderable type" is deliberately *not* an error at insertion: the
//! registry returns `None`, warns through `log`, and leaves the document
//! untouched. An in-place update is the exception — it would have to destroy
//! old content to render nothing, so there it fails.

use thiserror::Error;

/// A renderer strategy failed on malformed or undecodable content.
///
/// The registry propagates these uncaught; whatever a strategy inserted
/// before failing stays in the document (no rollback — the host decides on
/// recovery, e.g. falling back to raw text).
#[derive(Debug, Error)]
pub enum RenderError {
    /// Markup failed to parse (strict XML mode, unbalanced tags, ...).
    #[error("malformed markup: {0}")]
    MalformedMarkup(String),

    /// A base64 image payload failed to decode.
    #[error("invalid base64 image payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// An external conversion pipeline failed.
    #[error("external conversion failed: {0}")]
    Conversion(String),

    /// A strategy-specific failure that fits no other variant.
    #[error("render failed: {0}")]
    Other(String),
}

/// Failures of display lookup and in-place update.
#[derive(Debug, Error)]
pub enum DisplayError {
    /// The raw display id was never seen by this session.
    #[error("unknown display id: {0:?}")]
    UnknownDisplayId(String),

    /// The id is known but no live occurrence exists in the document.
    #[error("no display found matching id: {0:?}")]
    DisplayNotFound(String),

    /// An update bundle offered no renderable type; every occurrence is left
    /// as it was.
    #[error("no renderable type to update display: {0:?}")]
    NoRenderableType(String),

    /// Re-rendering the replacement content failed.
    #[error(transparent)]
    Render(#[from] RenderError),
}
