//! Minimal element tree built from quick-xml events.
//!
//! nmap puts nearly everything worth keeping in attributes, so text content
//! is validated but not retained.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use scanvault_core::{Result, VaultError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Attribute values in document order.
    pub fn attr_values(&self) -> impl Iterator<Item = &str> {
        self.attrs.iter().map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follows the first matching child at each step of `path`.
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }
}

fn malformed(reader: &Reader<&[u8]>, what: impl std::fmt::Display) -> VaultError {
    VaultError::MalformedDocument(format!("{} at byte {}", what, reader.buffer_position()))
}

/// XML `Name` production: letter, `_` or `:` first, then also digits,
/// `-` and `.`. Non-ASCII characters are accepted in either position.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else { return false };
    let start = |c: char| c.is_alphabetic() || c == '_' || c == ':' || !c.is_ascii();
    start(first) && chars.all(|c| start(c) || c.is_ascii_digit() || c == '-' || c == '.')
}

fn element_from(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Result<Element> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| malformed(reader, e))?
        .to_string();
    if !is_xml_name(&name) {
        return Err(malformed(reader, format_args!("invalid element name {name:?}")));
    }
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| malformed(reader, e))?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(|e| malformed(reader, e))?.to_string();
        if !is_xml_name(&key) {
            return Err(malformed(reader, format_args!("invalid attribute name {key:?}")));
        }
        let value = attr.unescape_value().map_err(|e| malformed(reader, e))?.into_owned();
        attrs.push((key, value));
    }
    Ok(Element { name, attrs, children: Vec::new() })
}

/// Parses a complete document and returns its root element.
pub fn parse(bytes: &[u8]) -> Result<Element> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf).map_err(|e| malformed(&reader, e))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if stack.is_empty() && root.is_some() {
                    return Err(malformed(&reader, "content after root element"));
                }
                let el = element_from(&reader, e)?;
                if matches!(event, Event::Start(_)) {
                    stack.push(el);
                } else if let Some(parent) = stack.last_mut() {
                    parent.children.push(el);
                } else {
                    root = Some(el);
                }
            }
            Event::End(_) => {
                let el = stack.pop().ok_or_else(|| malformed(&reader, "unmatched end tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(el),
                    None => root = Some(el),
                }
            }
            Event::Text(ref t) => {
                t.unescape().map_err(|e| malformed(&reader, e))?;
                if stack.is_empty() && !t.iter().all(u8::is_ascii_whitespace) {
                    return Err(malformed(&reader, "text outside root element"));
                }
            }
            Event::CData(_) if stack.is_empty() => {
                return Err(malformed(&reader, "text outside root element"));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(malformed(&reader, format_args!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| VaultError::MalformedDocument("no root element".into()))
}
