//! Incremental tag-stack markup serializer.
//!
//! Output is emitted as tags open and close rather than assembled from a
//! document tree. Each open element is a frame on a stack; a frame starts
//! OPEN (attributes may still be written) and moves to BODY the first time
//! text or a child element arrives, at which point its `>` is written
//! exactly once.

use std::fmt;

use thiserror::Error;

use crate::Entity;

const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Misuse of the serializer. These abort the current request; they are not
/// recoverable by the caller.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MarkupError {
    /// `attr` was called after the current tag's body started, or with no
    /// open tag at all.
    #[error("attribute written outside an open tag")]
    AttributeOutsideTag,

    /// `end` was called with nothing on the frame stack.
    #[error("end() called with no open tag")]
    EndOutsideTag,
}

/// One currently-open element.
#[derive(Debug)]
pub(crate) struct Frame {
    tag: String,
    body: bool,
    no_mini: bool,
}

/// Streaming markup writer.
///
/// ```rust,ignore
/// let mut m = MarkupWriter::new();
/// m.div().attr("id", "a")?.write("x").end()?;
/// assert_eq!(m.buffered(), r#"<div id="a">x</div>"#);
/// ```
#[derive(Debug)]
pub struct MarkupWriter {
    buf: String,
    stack: Vec<Frame>,
    content_type: String,
}

impl Default for MarkupWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupWriter {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            stack: Vec::new(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    /// Number of currently-open frames.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Everything emitted so far. Open tags are still unterminated here.
    pub fn buffered(&self) -> &str {
        &self.buf
    }

    /// Replace the content type reported by [`MarkupWriter::entity`].
    pub fn set_content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
        self.content_type = content_type.into();
        self
    }

    /// Force the current frame into BODY, writing its `>` if it has not
    /// been written yet. No-op when no frame is open or the body already
    /// started.
    pub(crate) fn start_body(&mut self) {
        if let Some(top) = self.stack.last_mut() {
            if !top.body {
                top.body = true;
                self.buf.push('>');
            }
        }
    }

    fn push_frame(&mut self, tag: &str, no_mini: bool) {
        self.start_body();
        self.stack.push(Frame {
            tag: tag.to_string(),
            body: false,
            no_mini,
        });
        self.buf.push('<');
        self.buf.push_str(tag);
    }

    /// Open a tag that may self-close (`<br/>`) when it ends empty.
    pub fn begin(&mut self, tag: &str) -> &mut Self {
        self.push_frame(tag, false);
        self
    }

    /// Open a container tag that must always emit a paired close, even
    /// when empty: `<script></script>`, never `<script/>`.
    pub fn begin_container(&mut self, tag: &str) -> &mut Self {
        self.push_frame(tag, true);
        self
    }

    /// Write an attribute on the current tag. Only legal while the tag is
    /// still OPEN.
    pub fn attr(&mut self, name: &str, value: impl fmt::Display) -> Result<&mut Self, MarkupError> {
        match self.stack.last() {
            Some(top) if !top.body => {}
            _ => return Err(MarkupError::AttributeOutsideTag),
        }
        self.buf.push_str(&format!(" {}=\"{}\"", name, value));
        Ok(self)
    }

    /// Append text, forcing the current tag into BODY.
    pub fn write(&mut self, text: &str) -> &mut Self {
        self.start_body();
        self.buf.push_str(text);
        self
    }

    /// Append a single character, forcing the current tag into BODY.
    pub fn write_char(&mut self, c: char) -> &mut Self {
        self.start_body();
        self.buf.push(c);
        self
    }

    /// Append any displayable value, forcing the current tag into BODY.
    pub fn write_display(&mut self, value: impl fmt::Display) -> &mut Self {
        self.start_body();
        self.buf.push_str(&format!("{}", value));
        self
    }

    /// Copy a reader's UTF-8 contents into the body, forcing the current
    /// tag into BODY. Used to embed pre-rendered fragments into a page.
    pub fn copy(&mut self, reader: &mut dyn std::io::Read) -> Result<&mut Self, std::io::Error> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.start_body();
        self.buf.push_str(&text);
        Ok(self)
    }

    /// Close the current tag and pop its frame.
    ///
    /// A frame whose body never started self-closes (`/>`) unless it was
    /// opened with [`MarkupWriter::begin_container`].
    pub fn end(&mut self) -> Result<&mut Self, MarkupError> {
        let mut frame = self.stack.pop().ok_or(MarkupError::EndOutsideTag)?;
        if frame.no_mini && !frame.body {
            frame.body = true;
            self.buf.push('>');
        }
        if frame.body {
            self.buf.push_str("</");
            self.buf.push_str(&frame.tag);
            self.buf.push('>');
        } else {
            self.buf.push_str("/>");
        }
        Ok(self)
    }

    /// Close every remaining open tag, innermost first.
    pub fn end_all(&mut self) -> &mut Self {
        while self.end().is_ok() {}
        self
    }

    /// Close everything and materialize the accumulated output.
    ///
    /// Repeated calls are harmless: there are no frames left to close and
    /// the buffer is unchanged.
    pub fn entity(&mut self) -> Entity {
        self.end_all();
        Entity::new(self.buf.clone().into_bytes(), self.content_type.clone())
    }

    pub(crate) fn take_stack(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.stack)
    }

    pub(crate) fn restore_stack(&mut self, stack: Vec<Frame>) {
        debug_assert!(self.stack.is_empty(), "nested frames must be closed first");
        self.stack = stack;
    }

    // --- HTML vocabulary ---

    pub fn div(&mut self) -> &mut Self {
        self.begin_container("div")
    }

    pub fn span(&mut self) -> &mut Self {
        self.begin_container("span")
    }

    pub fn p(&mut self) -> &mut Self {
        self.begin_container("p")
    }

    pub fn h1(&mut self) -> &mut Self {
        self.begin_container("h1")
    }

    pub fn h2(&mut self) -> &mut Self {
        self.begin_container("h2")
    }

    pub fn h3(&mut self) -> &mut Self {
        self.begin_container("h3")
    }

    pub fn h4(&mut self) -> &mut Self {
        self.begin_container("h4")
    }

    pub fn h5(&mut self) -> &mut Self {
        self.begin_container("h5")
    }

    pub fn h6(&mut self) -> &mut Self {
        self.begin_container("h6")
    }

    pub fn table(&mut self) -> &mut Self {
        self.begin_container("table")
    }

    pub fn tr(&mut self) -> &mut Self {
        self.begin_container("tr")
    }

    pub fn th(&mut self) -> &mut Self {
        self.begin_container("th")
    }

    pub fn td(&mut self) -> &mut Self {
        self.begin_container("td")
    }

    pub fn input(&mut self) -> &mut Self {
        self.begin_container("input")
    }

    pub fn script(&mut self) -> &mut Self {
        self.begin_container("script")
    }

    /// `<script src="..."></script>`
    pub fn script_src(&mut self, src: &str) -> Result<&mut Self, MarkupError> {
        self.script().attr("src", src)?.end()
    }

    pub fn a(&mut self) -> &mut Self {
        self.begin_container("a")
    }

    /// Open an anchor with its `href` set.
    pub fn a_href(&mut self, href: &str) -> Result<&mut Self, MarkupError> {
        self.a().attr("href", href)
    }

    /// A complete `<a href="...">text</a>`.
    pub fn link_to(&mut self, href: &str, text: &str) -> Result<&mut Self, MarkupError> {
        self.a_href(href)?.write(text).end()
    }

    /// `<br/>`
    pub fn br(&mut self) -> Result<&mut Self, MarkupError> {
        self.begin("br").end()
    }

    /// `<link rel="stylesheet" href="..."/>`
    pub fn link_stylesheet(&mut self, href: &str) -> Result<&mut Self, MarkupError> {
        self.begin("link")
            .attr("rel", "stylesheet")?
            .attr("href", href)?
            .end()
    }

    /// Shorthand for `attr("id", ..)`.
    pub fn id(&mut self, value: impl fmt::Display) -> Result<&mut Self, MarkupError> {
        self.attr("id", value)
    }

    /// Shorthand for `attr("class", ..)`.
    pub fn class_attr(&mut self, value: impl fmt::Display) -> Result<&mut Self, MarkupError> {
        self.attr("class", value)
    }

    /// Shorthand for `attr("style", ..)`.
    pub fn style_attr(&mut self, value: impl fmt::Display) -> Result<&mut Self, MarkupError> {
        self.attr("style", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Tag Shape Tests ===

    #[test]
    fn test_div_with_attr_and_text() {
        let mut m = MarkupWriter::new();
        m.div().id("a").unwrap().write("x").end().unwrap();
        assert_eq!(m.buffered(), r#"<div id="a">x</div>"#);
    }

    #[test]
    fn test_empty_container_never_self_closes() {
        let mut m = MarkupWriter::new();
        m.script().end().unwrap();
        assert_eq!(m.buffered(), "<script></script>");
    }

    #[test]
    fn test_empty_plain_tag_self_closes() {
        let mut m = MarkupWriter::new();
        m.begin("br").end().unwrap();
        assert_eq!(m.buffered(), "<br/>");
    }

    #[test]
    fn test_nested_children_close_parent_bracket_once() {
        let mut m = MarkupWriter::new();
        m.div();
        m.span().write("s").end().unwrap();
        m.span().write("t").end().unwrap();
        m.end().unwrap();
        assert_eq!(m.buffered(), "<div><span>s</span><span>t</span></div>");
    }

    #[test]
    fn test_attr_then_child() {
        let mut m = MarkupWriter::new();
        m.div().class_attr("row").unwrap();
        m.p().write("body").end().unwrap();
        m.end().unwrap();
        assert_eq!(m.buffered(), r#"<div class="row"><p>body</p></div>"#);
    }

    #[test]
    fn test_numeric_attr_and_write_display() {
        let mut m = MarkupWriter::new();
        m.begin_container("td")
            .attr("colspan", 2)
            .unwrap()
            .write_display(40 + 2)
            .end()
            .unwrap();
        assert_eq!(m.buffered(), r#"<td colspan="2">42</td>"#);
    }

    #[test]
    fn test_link_stylesheet_minifies() {
        let mut m = MarkupWriter::new();
        m.link_stylesheet("/main.css").unwrap();
        assert_eq!(
            m.buffered(),
            r#"<link rel="stylesheet" href="/main.css"/>"#
        );
    }

    #[test]
    fn test_link_to() {
        let mut m = MarkupWriter::new();
        m.link_to("/next", "Next").unwrap();
        assert_eq!(m.buffered(), r#"<a href="/next">Next</a>"#);
    }

    // === Misuse Tests ===

    #[test]
    fn test_attr_after_body_is_error() {
        let mut m = MarkupWriter::new();
        m.div().write("x");
        assert_eq!(
            m.attr("id", "late").unwrap_err(),
            MarkupError::AttributeOutsideTag
        );
    }

    #[test]
    fn test_attr_with_no_tag_is_error() {
        let mut m = MarkupWriter::new();
        assert_eq!(
            m.attr("id", "a").unwrap_err(),
            MarkupError::AttributeOutsideTag
        );
    }

    #[test]
    fn test_end_with_empty_stack_is_error() {
        let mut m = MarkupWriter::new();
        assert_eq!(m.end().unwrap_err(), MarkupError::EndOutsideTag);
    }

    // === Drain Tests ===

    #[test]
    fn test_end_all_closes_everything() {
        let mut m = MarkupWriter::new();
        m.div();
        m.table();
        m.tr();
        m.end_all();
        assert_eq!(m.depth(), 0);
        assert_eq!(m.buffered(), "<div><table><tr></tr></table></div>");
    }

    #[test]
    fn test_entity_drains_and_is_repeatable() {
        let mut m = MarkupWriter::new();
        m.h1().write("Title");

        let first = m.entity();
        assert_eq!(first.text_lossy(), "<h1>Title</h1>");
        assert_eq!(first.content_type(), "text/html; charset=utf-8");

        let second = m.entity();
        assert_eq!(second, first);
    }

    #[test]
    fn test_entity_respects_content_type() {
        let mut m = MarkupWriter::new();
        m.set_content_type("application/xml");
        m.begin_container("root").end().unwrap();
        assert_eq!(m.entity().content_type(), "application/xml");
    }

    #[test]
    fn test_write_outside_any_tag() {
        let mut m = MarkupWriter::new();
        m.write("plain");
        m.br().unwrap();
        assert_eq!(m.buffered(), "plain<br/>");
    }

    #[test]
    fn test_copy_embeds_fragment() {
        let mut m = MarkupWriter::new();
        let mut fragment = "<em>served as-is</em>".as_bytes();
        m.div();
        m.copy(&mut fragment).unwrap();
        m.end().unwrap();
        assert_eq!(m.buffered(), "<div><em>served as-is</em></div>");
    }
}
