//! Presentation faces applied to document ranges.
//!
//! A face is a bundle of presentation hints (colors, weight, slant, ...).
//! The document stores an ordered [`FaceStack`] per range; earlier entries
//! take precedence, and decoders *prepend* so existing styling survives.

/// A terminal-style color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    /// One of the 8 base colors (0-7) or their bright variants (8-15).
    Base(u8),
    /// An xterm 256-palette index.
    Indexed(u8),
}

/// Named markup faces produced by the built-in strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Markup {
    /// Heading at the given level (1-6).
    Header(u8),
    /// Emphasis (italic markup).
    Emphasis,
    /// Strong emphasis (bold markup).
    Strong,
    /// Inline or block code.
    Code,
    /// Hyperlink text.
    Link,
    /// Struck-through text.
    Strikethrough,
    /// Inline math passed through verbatim.
    Math,
    /// Transient highlight applied to a freshly updated display region.
    UpdateFlash,
}

/// A single face: presentation attributes for a document range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Face {
    /// Foreground color.
    pub fg: Option<Color>,
    /// Background color.
    pub bg: Option<Color>,
    /// Bold weight.
    pub bold: bool,
    /// Italic slant.
    pub italic: bool,
    /// Underline.
    pub underline: bool,
    /// Reverse video.
    pub inverse: bool,
    /// A named markup face, when the range came from a markup renderer.
    pub markup: Option<Markup>,
}

impl Face {
    /// A face carrying only a named markup role.
    pub fn markup(markup: Markup) -> Self {
        Self {
            markup: Some(markup),
            ..Self::default()
        }
    }

    /// Check whether the face carries no hints at all.
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// An ordered stack of faces covering one range; index 0 wins on conflicts.
pub type FaceStack = Vec<Face>;

/// Prepend `face` to an existing stack, returning the combined stack.
pub fn prepend(face: Face, existing: Option<&FaceStack>) -> FaceStack {
    let mut stack = Vec::with_capacity(1 + existing.map_or(0, |s| s.len()));
    stack.push(face);
    if let Some(existing) = existing {
        stack.extend(existing.iter().copied());
    }
    stack
}
