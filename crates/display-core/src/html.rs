//! Built-in HTML rendering strategy.
//!
//! A deliberately small tag-stream renderer: scripts are stripped, a handful
//! of phrase/block elements map to faces and line breaks, entities are
//! decoded, `<img>` becomes an anchored image placeholder, and everything
//! else renders as its text content. Content that begins with an XML
//! declaration is parsed strictly: unbalanced tags are a fatal
//! [`RenderError`] for the host to handle (no fallback here).

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::document::Document;
use crate::error::RenderError;
use crate::face::{Face, Markup};
use crate::image::{ImageData, ImageSpec};
use crate::registry::RenderStrategy;

fn comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("static comment pattern"))
}

fn script_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("static pattern"))
}

fn open_script_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script\b[^>]*>.*\z").expect("static pattern"))
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("static tag pattern"))
}

fn attr_regex(name: &str) -> Regex {
    // Attribute values: double-quoted, single-quoted, or bare.
    Regex::new(&format!(
        r#"(?i)\b{name}\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#
    ))
    .expect("static attribute pattern")
}

fn href_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| attr_regex("href"))
}

fn src_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| attr_regex("src"))
}

fn alt_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| attr_regex("alt"))
}

fn attr_value<'t>(re: &Regex, tag: &'t str) -> Option<&'t str> {
    let caps = re.captures(tag)?;
    caps.get(1).or(caps.get(2)).or(caps.get(3)).map(|m| m.as_str())
}

/// Remove `<script>` elements entirely. A script with no closing tag
/// swallows everything to the end of the input.
fn strip_scripts(content: &str) -> String {
    let closed = script_regex().replace_all(content, "");
    open_script_regex().replace(&closed, "").into_owned()
}

/// Decode the common named entities plus numeric references.
fn decode_entities(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"&(#x?[0-9a-fA-F]+|[a-zA-Z]+);").expect("static"));

    re.replace_all(text, |caps: &regex::Captures<'_>| {
        let body = &caps[1];
        match body {
            "amp" => "&".to_string(),
            "lt" => "<".to_string(),
            "gt" => ">".to_string(),
            "quot" => "\"".to_string(),
            "apos" => "'".to_string(),
            "nbsp" => "\u{a0}".to_string(),
            _ if body.starts_with('#') => {
                let digits = &body[1..];
                let code = if let Some(hex) = digits.strip_prefix(['x', 'X']) {
                    u32::from_str_radix(hex, 16).ok()
                } else {
                    digits.parse::<u32>().ok()
                };
                code.and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_else(|| caps[0].to_string())
            }
            // Unknown named entity: leave it alone.
            _ => caps[0].to_string(),
        }
    })
    .into_owned()
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

fn element_face(name: &str) -> Option<Face> {
    let mut face = Face::default();
    match name {
        "b" | "strong" => {
            face.bold = true;
            face.markup = Some(Markup::Strong);
        }
        "i" | "em" => {
            face.italic = true;
            face.markup = Some(Markup::Emphasis);
        }
        "u" => face.underline = true,
        "s" | "del" | "strike" => face.markup = Some(Markup::Strikethrough),
        "code" | "tt" | "kbd" | "samp" | "pre" => face.markup = Some(Markup::Code),
        "a" => face.markup = Some(Markup::Link),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            face.bold = true;
            face.markup = Some(Markup::Header(name.as_bytes()[1] - b'0'));
        }
        _ => return None,
    }
    Some(face)
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "li"
            | "ul"
            | "ol"
            | "table"
            | "tr"
            | "pre"
            | "blockquote"
    )
}

struct Renderer<'a> {
    doc: &'a mut Document,
    strict: bool,
    /// Open elements (strict mode balance checking + face scoping).
    open: Vec<(String, bool)>, // (name, pushed_face)
    faces: Vec<Face>,
    link: Vec<String>,
    pre_depth: usize,
}

impl Renderer<'_> {
    fn at_line_start(&self) -> bool {
        let p = self.doc.point();
        p == 0 || self.doc.char_at(p - 1) == Some('\n')
    }

    fn break_line(&mut self) {
        if !self.at_line_start() {
            self.doc.insert_at_point("\n");
        }
    }

    fn emit_text(&mut self, raw: &str) {
        let decoded = decode_entities(raw);
        let text = if self.pre_depth > 0 {
            decoded
        } else {
            if decoded.trim().is_empty() {
                return;
            }
            // Outside <pre>, whitespace runs collapse to one space.
            let mut out = String::with_capacity(decoded.len());
            let mut in_space = false;
            for c in decoded.chars() {
                if c.is_whitespace() {
                    if !in_space {
                        out.push(' ');
                    }
                    in_space = true;
                } else {
                    out.push(c);
                    in_space = false;
                }
            }
            if self.at_line_start() {
                out.trim_start().to_string()
            } else {
                out
            }
        };
        if text.is_empty() {
            return;
        }

        let begin = self.doc.point();
        self.doc.insert_at_point(&text);
        let end = self.doc.point();
        if !self.faces.is_empty() {
            self.doc.set_faces(begin, end, self.faces.clone());
        }
        if let Some(target) = self.link.last() {
            self.doc.set_link(begin, end, target.clone());
        }
    }

    fn open_tag(&mut self, name: &str, tag: &str, self_closing: bool) -> Result<(), RenderError> {
        if is_block(name) {
            self.break_line();
        }
        match name {
            "br" => self.doc.insert_at_point("\n"),
            "li" => self.doc.insert_at_point("- "),
            "img" => {
                let src = attr_value(src_regex(), tag).unwrap_or("");
                let alt = attr_value(alt_regex(), tag).unwrap_or("[image]");
                let begin = self.doc.point();
                self.doc.insert_at_point(if alt.is_empty() { "[image]" } else { alt });
                self.doc.set_image(
                    begin,
                    self.doc.point(),
                    ImageSpec::new("uri", ImageData::Uri(src.to_string())),
                );
            }
            _ => {}
        }

        let mut pushed_face = false;
        if !self_closing && !VOID_ELEMENTS.contains(&name) {
            if let Some(face) = element_face(name) {
                self.faces.push(face);
                pushed_face = true;
            }
            if name == "a"
                && let Some(href) = attr_value(href_regex(), tag)
            {
                self.link.push(href.to_string());
            }
            if name == "pre" {
                self.pre_depth += 1;
            }
            self.open.push((name.to_string(), pushed_face));
        }
        Ok(())
    }

    fn close_tag(&mut self, name: &str) -> Result<(), RenderError> {
        if VOID_ELEMENTS.contains(&name) {
            return Ok(());
        }
        match self.open.iter().rposition(|(n, _)| n == name) {
            Some(idx) => {
                if self.strict && idx != self.open.len() - 1 {
                    return Err(RenderError::MalformedMarkup(format!(
                        "mismatched closing tag </{name}>"
                    )));
                }
                // Lenient mode drops anything left open above the match.
                while self.open.len() > idx {
                    let (popped, pushed_face) = self
                        .open
                        .pop()
                        .unwrap_or_else(|| (String::new(), false));
                    if pushed_face {
                        self.faces.pop();
                    }
                    if popped == "a" {
                        self.link.pop();
                    }
                    if popped == "pre" {
                        self.pre_depth = self.pre_depth.saturating_sub(1);
                    }
                }
            }
            None if self.strict => {
                return Err(RenderError::MalformedMarkup(format!(
                    "closing tag </{name}> without opener"
                )));
            }
            None => {}
        }
        if is_block(name) {
            self.break_line();
        }
        Ok(())
    }
}

/// Built-in `text/html` strategy.
#[derive(Debug, Default)]
pub struct HtmlStrategy;

impl HtmlStrategy {
    /// Create the strategy.
    pub fn new() -> Self {
        Self
    }
}

impl RenderStrategy for HtmlStrategy {
    fn render(
        &mut self,
        doc: &mut Document,
        content: &str,
        _metadata: Option<&Value>,
    ) -> Result<bool, RenderError> {
        // An XML declaration selects strict parsing.
        let strict = content.trim_start().starts_with("<?xml");
        let source = comment_regex().replace_all(content, "");
        let source = strip_scripts(&source);

        let mut renderer = Renderer {
            doc,
            strict,
            open: Vec::new(),
            faces: Vec::new(),
            link: Vec::new(),
            pre_depth: 0,
        };

        let mut last = 0usize;
        for m in tag_regex().find_iter(&source) {
            if m.start() > last {
                renderer.emit_text(&source[last..m.start()]);
            }
            last = m.end();

            let tag = m.as_str();
            let inner = tag[1..tag.len() - 1].trim();
            if inner.starts_with('?') || inner.starts_with('!') || inner.is_empty() {
                continue;
            }
            if let Some(rest) = inner.strip_prefix('/') {
                let name = rest
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .to_ascii_lowercase();
                renderer.close_tag(&name)?;
            } else {
                let self_closing = inner.ends_with('/');
                let name = inner
                    .split_whitespace()
                    .next()
                    .unwrap_or("")
                    .trim_end_matches('/')
                    .to_ascii_lowercase();
                renderer.open_tag(&name, tag, self_closing)?;
            }
        }
        if last < source.len() {
            renderer.emit_text(&source[last..]);
        }

        if strict && !renderer.open.is_empty() {
            let (unclosed, _) = &renderer.open[renderer.open.len() - 1];
            return Err(RenderError::MalformedMarkup(format!(
                "unclosed element <{unclosed}>"
            )));
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(content: &str) -> Document {
        let mut doc = Document::new();
        HtmlStrategy::new().render(&mut doc, content, None).unwrap();
        doc
    }

    #[test]
    fn test_phrase_styling() {
        let doc = render("plain <b>bold</b> and <em>italic</em>");
        assert_eq!(doc.text(), "plain bold and italic");

        assert_eq!(doc.faces_at(0), None);
        let bold = doc.faces_at(6).unwrap();
        assert!(bold[0].bold);
        let italic = doc.faces_at(15).unwrap();
        assert!(italic[0].italic);
    }

    #[test]
    fn test_nested_faces() {
        let doc = render("<b>all <i>both</i></b>");
        let both = doc.faces_at(4).unwrap();
        assert_eq!(both.len(), 2);
        assert!(both[0].bold);
        assert!(both[1].italic);
    }

    #[test]
    fn test_script_stripped_entirely() {
        let doc = render("before<script>alert('x')</script>after");
        assert_eq!(doc.text(), "beforeafter");
    }

    #[test]
    fn test_unclosed_script_swallows_rest() {
        let doc = render("keep<script type=\"text/javascript\">var x = 1; gone");
        assert_eq!(doc.text(), "keep");
    }

    #[test]
    fn test_entities_decoded() {
        let doc = render("1 &lt; 2 &amp;&amp; a &#65; &#x42;");
        assert_eq!(doc.text(), "1 < 2 && a A B");
    }

    #[test]
    fn test_links_recorded() {
        let doc = render("<a href=\"https://example.com\">here</a>");
        assert_eq!(doc.text(), "here");
        assert_eq!(doc.link_at(0), Some("https://example.com"));
        assert_eq!(doc.faces_at(0).unwrap()[0].markup, Some(Markup::Link));
    }

    #[test]
    fn test_headers_and_blocks_break_lines() {
        let doc = render("<h1>Title</h1><p>body</p>");
        assert_eq!(doc.text(), "Title\nbody\n");
        assert_eq!(doc.faces_at(0).unwrap()[0].markup, Some(Markup::Header(1)));
    }

    #[test]
    fn test_img_placeholder_with_spec() {
        let doc = render("<img src=\"plot.png\" alt=\"a plot\">");
        assert_eq!(doc.text(), "a plot");
        let spec = doc.image_at(0).unwrap();
        assert_eq!(spec.data, ImageData::Uri("plot.png".to_string()));
    }

    #[test]
    fn test_lenient_tolerates_unbalanced() {
        let doc = render("<b>unclosed");
        assert_eq!(doc.text(), "unclosed");
    }

    #[test]
    fn test_strict_xml_rejects_unbalanced() {
        let mut doc = Document::new();
        let err = HtmlStrategy::new().render(
            &mut doc,
            "<?xml version=\"1.0\"?><root><b>oops</root>",
            None,
        );
        assert!(matches!(err, Err(RenderError::MalformedMarkup(_))));
    }

    #[test]
    fn test_strict_xml_accepts_balanced() {
        let mut doc = Document::new();
        HtmlStrategy::new()
            .render(&mut doc, "<?xml version=\"1.0\"?><root><b>ok</b></root>", None)
            .unwrap();
        assert_eq!(doc.text(), "ok");
    }

    #[test]
    fn test_pre_preserves_whitespace() {
        let doc = render("<pre>a  b\n c</pre>");
        assert_eq!(doc.text(), "a  b\n c\n");
        assert_eq!(doc.faces_at(0).unwrap()[0].markup, Some(Markup::Code));
    }
}
