#![warn(missing_docs)]
//! Display Core - Headless Rich-Output Document Kernel
//!
//! # Overview
//!
//! `display-core` is a headless kernel for rendering streams of MIME-typed
//! output (HTML, images, ANSI-colored text, markdown, LaTeX) into one mutable
//! rich-text document. It does not draw anything: the document is a rope of
//! text plus attribute layers (faces, visibility, images, links), and the
//! upper layer provides the actual view.
//!
//! # Core Features
//!
//! - **Type-dispatched rendering**: pluggable strategies per MIME type,
//!   tried in the host's preference order
//! - **Named displays**: output tagged with a logical identity, navigable
//!   and updatable in place across every occurrence
//! - **Render-once updates**: replacement content renders once and is copied
//!   byte-for-byte to further occurrences
//! - **Terminal semantics**: control-code normalization and SGR color
//!   decoding that survive arbitrary chunk boundaries
//! - **Change Notifications**: bells, update flashes and unrenderable
//!   bundles reach the host through subscribed callbacks
//!
//! # Quick Start
//!
//! ```rust
//! use display_core::{DisplaySession, MimeBundle, mime};
//!
//! let mut session = DisplaySession::with_builtin_strategies();
//!
//! // Render a named display: the richest renderable type wins.
//! let bundle = MimeBundle::new()
//!     .with(mime::TEXT_PLAIN, "1/3")
//!     .with(mime::TEXT_HTML, "<b>1/3</b>");
//! session.insert_display("progress", &bundle, mime::RICH_PREFERENCE).unwrap();
//!
//! // Later output replaces every occurrence in place.
//! let bundle = MimeBundle::new().with(mime::TEXT_PLAIN, "2/3");
//! session.update_display("progress", &bundle, mime::RICH_PREFERENCE).unwrap();
//!
//! assert_eq!(session.document().text(), "2/3");
//! ```
//!
//! # Module Description
//!
//! - [`document`] - the rope-backed document and its attribute layers
//! - [`attrs`] - interval attribute layers and position markers
//! - [`registry`] - MIME-dispatched rendering strategies
//! - [`region`] - display identity interning and region tagging
//! - [`navigate`] - region bounds and occurrence scanning
//! - [`update`] - atomic multi-occurrence update-in-place
//! - [`ansi`] - control-code normalization and SGR decoding
//! - [`session`] - the host-facing facade
//! - via `display-core-markdown` - `text/markdown` rendering (optional integration)
//! - via `display-core-convert` - external converter pipelines and `text/latex` (optional integration)

pub mod ansi;
pub mod attrs;
pub mod document;
pub mod error;
pub mod face;
pub mod html;
pub mod image;
pub mod mime;
pub mod navigate;
pub mod region;
pub mod registry;
pub mod session;
pub mod update;

pub use ansi::{AnsiContext, ControlOutcome, apply_ansi, normalize_controls};
pub use attrs::{AttrLayer, AttrSpan, MarkerSet};
pub use document::{DocEvent, Document, OwnedSpan};
pub use error::{DisplayError, RenderError};
pub use face::{Color, Face, FaceStack, Markup};
pub use html::HtmlStrategy;
pub use image::{IMAGE_ASCENT_PERCENT, ImageData, ImageSpec, ImageStrategy, Matting};
pub use mime::{MimeBundle, PLAIN_PREFERENCE, RICH_PREFERENCE};
pub use region::{DisplayInterner, DisplayToken, tag_region};
pub use registry::{PlainTextStrategy, RenderStrategy, RendererRegistry};
pub use session::{DisplayCallback, DisplayEvent, DisplaySession, LinkHandler};
pub use update::update_display;
