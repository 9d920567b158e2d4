#![warn(missing_docs)]
//! External conversion pipelines for `display-core`.
//!
//! Some content types cannot be rendered in-process: LaTeX needs a TeX
//! engine, exotic image formats need a transcoder. This crate wraps such
//! external commands as [`Converter`] pipelines (stdin in, stdout out) with
//! synchronous, blocking-handle, polling and callback completion modes, and
//! ships the [`LatexStrategy`] that anchors pipeline-produced images over
//! hidden TeX source.
//!
//! Conversions run on worker threads; document mutation stays on the host's
//! single logical thread, so a strategy using a pipeline synchronously (as
//! [`LatexStrategy`] does) simply blocks the render call.

pub mod convert;
pub mod latex;

pub use convert::{ConvertError, ConvertHandle, Converter};
pub use latex::{LatexPipeline, LatexStrategy};
