//! In-memory XML tree and the read-only traversal helpers used by every
//! other module.
//!
//! Absent structure is always reported as `None`; nothing in here fails once
//! the document has been parsed.

use std::borrow::Cow;
use std::collections::BTreeSet;

use log::debug;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::core_api::{CoreError, CoreErrorCode};

/// Attribute carrying the serialized .NET type of an element.
pub const TYPE_ATTR: &str = "xsi:type";
/// Attribute marking an element as an explicit null.
pub const NIL_ATTR: &str = "xsi:nil";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// A coordinate pair read from an `{X, Y}` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coord {
    Int(i64, i64),
    Raw(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn parse_str(xml: &str) -> Result<Self, CoreError> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                parse_error(format!(
                    "malformed XML at byte {}: {e}",
                    reader.buffer_position()
                ))
            })?;
            match event {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| parse_error("closing tag without an open element"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let value = text.unescape().map_err(|e| {
                        parse_error(format!(
                            "bad text content at byte {}: {e}",
                            reader.buffer_position()
                        ))
                    })?;
                    push_text(&mut stack, value);
                }
                Event::CData(data) => {
                    let bytes = data.into_inner();
                    push_text(&mut stack, String::from_utf8_lossy(&bytes));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(parse_error(format!(
                "unexpected end of document inside <{}>",
                open.tag
            )));
        }
        let root = root.ok_or_else(|| parse_error("document has no root element"))?;
        Ok(Self { root })
    }

    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        let xml = std::str::from_utf8(bytes)
            .map_err(|e| parse_error(format!("save file is not valid UTF-8: {e}")))?;
        Self::parse_str(xml)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }
}

fn parse_error(message: impl Into<String>) -> CoreError {
    CoreError::new(CoreErrorCode::Parse, message)
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, CoreError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| parse_error(format!("bad attribute on <{tag}>: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| parse_error(format!("bad value for {key} on <{tag}>: {e}")))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        tag,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), CoreError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(parse_error(format!(
            "second root element <{}>",
            element.tag
        )));
    }
    *root = Some(element);
    Ok(())
}

// Adjacent text runs (text next to CDATA) are merged so a text-only element
// always has exactly one child.
fn push_text(stack: &mut [Element], value: Cow<'_, str>) {
    let Some(parent) = stack.last_mut() else {
        return;
    };
    if let Some(Node::Text(existing)) = parent.children.last_mut() {
        existing.push_str(&value);
    } else {
        parent.children.push(Node::Text(value.into_owned()));
    }
}

fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('/') {
        Some((head, tail)) => (head, Some(tail)),
        None => (path, None),
    }
}

impl Element {
    pub fn has_tag(&self, tag: &str, ignore_case: bool) -> bool {
        self.tag == tag || (ignore_case && self.tag.eq_ignore_ascii_case(tag))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn type_attr(&self) -> Option<&str> {
        self.attribute(TYPE_ATTR)
    }

    /// True for `<Foo xsi:nil="true" />`: a recorded null, as opposed to a
    /// missing element.
    pub fn is_nil(&self) -> bool {
        self.children.is_empty() && self.attribute(NIL_ATTR) == Some("true")
    }

    /// Element children in document order; text is skipped.
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    pub fn child(&self, tag: &str, ignore_case: bool) -> Option<&Element> {
        let found = self
            .children()
            .find(|child| child.has_tag(tag, ignore_case));
        if found.is_none() {
            debug!("no child <{tag}> under <{}>", self.tag);
        }
        found
    }

    pub fn has_child(&self, tag: &str, ignore_case: bool) -> bool {
        self.children().any(|child| child.has_tag(tag, ignore_case))
    }

    /// Text of a node whose only child is text.
    pub fn text(&self) -> Option<&str> {
        match self.children.as_slice() {
            [Node::Text(text)] => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_text_node(&self) -> bool {
        self.text().is_some()
    }

    /// Follows `a/b/c` through immediate children only.
    pub fn descend(&self, path: &str, ignore_case: bool) -> Option<&Element> {
        let (head, tail) = split_path(path);
        let child = self.child(head, ignore_case)?;
        match tail {
            Some(tail) => child.descend(tail, ignore_case),
            None => Some(child),
        }
    }

    /// Like [`Element::descend`], but each segment is searched at any depth
    /// below the previous match and every match is yielded.
    pub fn descend_all<'a>(
        &'a self,
        path: &'a str,
        ignore_case: bool,
    ) -> Box<dyn Iterator<Item = &'a Element> + 'a> {
        let (head, tail) = split_path(path);
        let found = FindAll::new(self, head, ignore_case);
        match tail {
            Some(tail) => Box::new(found.flat_map(move |element| {
                element.descend_all(tail, ignore_case)
            })),
            None => Box::new(found),
        }
    }

    pub fn is_coord_node(&self) -> bool {
        let tags: BTreeSet<&str> = self.children().map(|child| child.tag.as_str()).collect();
        tags.len() == 2 && tags.contains("X") && tags.contains("Y")
    }

    pub fn coord(&self) -> Option<Coord> {
        let x = self.child("X", false)?.text()?;
        let y = self.child("Y", false)?.text()?;
        match (x.parse::<i64>(), y.parse::<i64>()) {
            (Ok(x), Ok(y)) => Some(Coord::Int(x, y)),
            _ => Some(Coord::Raw(x.to_string(), y.to_string())),
        }
    }
}

/// Depth-first search for a tag that does not look inside a match.
pub struct FindAll<'a> {
    stack: Vec<std::slice::Iter<'a, Node>>,
    tag: &'a str,
    ignore_case: bool,
}

impl<'a> FindAll<'a> {
    pub fn new(root: &'a Element, tag: &'a str, ignore_case: bool) -> Self {
        Self {
            stack: vec![root.children.iter()],
            tag,
            ignore_case,
        }
    }
}

impl<'a> Iterator for FindAll<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(top) = self.stack.last_mut() {
            match top.next() {
                None => {
                    self.stack.pop();
                }
                Some(Node::Text(_)) => {}
                Some(Node::Element(element)) => {
                    if element.has_tag(self.tag, self.ignore_case) {
                        return Some(element);
                    }
                    self.stack.push(element.children.iter());
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Document {
        Document::parse_str(xml).expect("fixture xml should parse")
    }

    #[test]
    fn text_requires_a_single_text_child() {
        let doc = parse("<a><b>hello</b><c><d>1</d></c><e/></a>");
        let root = doc.root();
        assert_eq!(root.child("b", false).and_then(Element::text), Some("hello"));
        assert_eq!(root.child("c", false).and_then(Element::text), None);
        assert_eq!(root.child("e", false).and_then(Element::text), None);
        assert!(!root.is_text_node());
    }

    #[test]
    fn child_lookup_only_folds_case_on_request() {
        let doc = parse("<a><Name>Stone</Name></a>");
        let root = doc.root();
        assert!(root.child("name", false).is_none());
        assert_eq!(
            root.child("name", true).and_then(Element::text),
            Some("Stone")
        );
        assert!(root.has_child("NAME", true));
        assert!(!root.has_child("NAME", false));
    }

    #[test]
    fn descend_follows_immediate_children_only() {
        let doc = parse("<r><a><b><c>1</c></b></a><x><a><b>deep</b></a></x></r>");
        let root = doc.root();
        assert_eq!(root.descend("a/b/c", false).and_then(Element::text), Some("1"));
        assert!(root.descend("b/c", false).is_none());
        assert!(root.descend("a/missing", false).is_none());
    }

    #[test]
    fn descend_all_searches_every_level_in_document_order() {
        let doc = parse(
            "<r><a><b>1</b></a><x><y><a><z><b>2</b></z></a></y></x><a><b>3</b><b>4</b></a></r>",
        );
        let texts: Vec<&str> = doc
            .root()
            .descend_all("a/b", false)
            .filter_map(Element::text)
            .collect();
        assert_eq!(texts, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn descend_all_does_not_search_inside_a_match() {
        let doc = parse("<r><a><a>inner</a></a></r>");
        assert_eq!(doc.root().descend_all("a", false).count(), 1);
    }

    #[test]
    fn coord_nodes_parse_to_integers_when_possible() {
        let doc = parse(
            "<r><p><X>3</X><Y>-4</Y></p><q><X>1.5</X><Y>2</Y></q><s><X>1</X><Y>2</Y><Z>3</Z></s></r>",
        );
        let root = doc.root();
        let p = root.child("p", false).expect("p");
        let q = root.child("q", false).expect("q");
        let s = root.child("s", false).expect("s");
        assert!(p.is_coord_node());
        assert_eq!(p.coord(), Some(Coord::Int(3, -4)));
        assert_eq!(
            q.coord(),
            Some(Coord::Raw("1.5".to_string(), "2".to_string()))
        );
        assert!(!s.is_coord_node());
        assert_eq!(root.coord(), None);
    }

    #[test]
    fn nil_elements_are_distinguished_from_empty_ones() {
        let doc = parse(
            r#"<r xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><a xsi:nil="true" /><b /></r>"#,
        );
        let root = doc.root();
        assert!(root.child("a", false).expect("a").is_nil());
        assert!(!root.child("b", false).expect("b").is_nil());
    }

    #[test]
    fn entities_and_byte_order_mark_are_handled() {
        let doc = parse("\u{feff}<?xml version=\"1.0\"?><r><n>Farmer &amp; Co</n></r>");
        assert_eq!(
            doc.root().child("n", false).and_then(Element::text),
            Some("Farmer & Co")
        );
    }

    #[test]
    fn malformed_documents_are_parse_errors() {
        let err = Document::parse_str("<a><b></a>").expect_err("mismatched tags");
        assert_eq!(err.code, CoreErrorCode::Parse);
        let err = Document::parse_str("<a><b>").expect_err("unclosed");
        assert_eq!(err.code, CoreErrorCode::Parse);
        let err = Document::parse_str("").expect_err("empty");
        assert_eq!(err.code, CoreErrorCode::Parse);
    }
}
