use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// Errors raised while decoding or encoding a statement document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed XML: {0}")]
    Parse(#[from] quick_xml::Error),

    #[error("malformed XML attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("input is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("failed to serialize XML: {0}")]
    Serialize(#[from] std::io::Error),

    #[error("document has no root element")]
    MissingRoot,

    #[error("unexpected closing tag")]
    UnbalancedTag,
}

/// One element of the statement tree: local name, attributes in document
/// order, optional text content and ordered child elements.
///
/// The schema namespace is not tracked per element; it is a single
/// document-wide declaration owned by [`XmlDocument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Text content with surrounding whitespace stripped; `None` when the
    /// element has no text or only whitespace.
    pub fn text_trimmed(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    /// Index of the first direct child with the given local name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.children.iter().position(|child| child.name == name)
    }

    /// Walk a chain of first-matching children.
    pub fn path(&self, names: &[&str]) -> Option<&Element> {
        let mut current = self;
        for name in names {
            current = current.child(name)?;
        }
        Some(current)
    }

    pub fn path_mut(&mut self, names: &[&str]) -> Option<&mut Element> {
        let mut current = self;
        for name in names {
            current = current.child_mut(name)?;
        }
        Some(current)
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn insert_child(&mut self, index: usize, child: Element) {
        self.children.insert(index, child);
    }

    /// First direct child with the given name, appended when absent.
    pub fn child_or_append(&mut self, name: &str) -> &mut Element {
        let index = match self.position(name) {
            Some(index) => index,
            None => {
                self.push_child(Element::new(name));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// First descendant with the given local name, in document order.
    pub fn descendant(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.descendant(name) {
                return Some(found);
            }
        }
        None
    }

    pub fn descendant_mut(&mut self, name: &str) -> Option<&mut Element> {
        for child in &mut self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.descendant_mut(name) {
                return Some(found);
            }
        }
        None
    }

    /// Apply `f` to every descendant with the given local name, document
    /// order.
    pub fn for_each_named<F: FnMut(&Element)>(&self, name: &str, f: &mut F) {
        for child in &self.children {
            if child.name == name {
                f(child);
            }
            child.for_each_named(name, f);
        }
    }

    pub fn for_each_named_mut<F: FnMut(&mut Element)>(&mut self, name: &str, f: &mut F) {
        for child in &mut self.children {
            if child.name == name {
                f(child);
            }
            child.for_each_named_mut(name, f);
        }
    }

    /// Apply `f` to this element and every descendant, pre-order.
    pub fn for_each_mut<F: FnMut(&mut Element)>(&mut self, f: &mut F) {
        f(self);
        for child in &mut self.children {
            child.for_each_mut(f);
        }
    }

    /// Remove every descendant with the given local name, at any depth.
    /// Returns the number of removed elements.
    pub fn remove_named(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children.retain(|child| child.name != name);
        let mut removed = before - self.children.len();
        for child in &mut self.children {
            removed += child.remove_named(name);
        }
        removed
    }

    /// Remove attributes whose local name (ignoring any prefix) matches.
    pub fn remove_attribute_local(&mut self, local_name: &str) {
        self.attributes
            .retain(|(key, _)| key.rsplit(':').next() != Some(local_name));
    }
}

/// A parsed statement document: the default namespace declared on the root
/// plus the element tree. Mutated in place by the pipeline stages and
/// serialized once at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub namespace: String,
    pub root: Element,
}

impl XmlDocument {
    /// Parse a complete XML document. Element names are stored without
    /// their namespace prefix; the default namespace of the root is lifted
    /// into [`XmlDocument::namespace`]. Whitespace-only text is dropped.
    pub fn parse(input: &[u8]) -> Result<Self, DocumentError> {
        let text = std::str::from_utf8(input)?;
        let mut reader = Reader::from_str(text);

        let mut namespace = String::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let is_root = stack.is_empty() && root.is_none();
                    let element = element_from_start(&start, is_root, &mut namespace)?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let is_root = stack.is_empty() && root.is_none();
                    let element = element_from_start(&start, is_root, &mut namespace)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let content = text.unescape()?;
                        if !content.trim().is_empty() {
                            parent
                                .text
                                .get_or_insert_with(String::new)
                                .push_str(&content);
                        }
                    }
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or(DocumentError::UnbalancedTag)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let root = root.ok_or(DocumentError::MissingRoot)?;
        Ok(Self { namespace, root })
    }

    /// Serialize the document with an XML declaration and two-space
    /// indentation. The namespace is emitted as the default `xmlns` on the
    /// root element.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        write_element(&mut writer, &self.root, Some(&self.namespace))?;
        Ok(writer.into_inner())
    }
}

fn element_from_start(
    start: &BytesStart<'_>,
    is_root: bool,
    namespace: &mut String,
) -> Result<Element, DocumentError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let prefix = start
        .name()
        .prefix()
        .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned());
    let namespace_key = match &prefix {
        Some(prefix) => format!("xmlns:{prefix}"),
        None => "xmlns".to_string(),
    };

    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        if is_root && key == namespace_key {
            *namespace = value;
            continue;
        }
        attributes.push((key, value));
    }

    Ok(Element {
        name,
        attributes,
        text: None,
        children: Vec::new(),
    })
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &Element,
    namespace: Option<&str>,
) -> Result<(), DocumentError> {
    let mut start = BytesStart::new(element.name.as_str());
    if let Some(namespace) = namespace.filter(|ns| !ns.is_empty()) {
        start.push_attribute(("xmlns", namespace));
    }
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let text = element.text.as_deref().filter(|text| !text.is_empty());
    if text.is_none() && element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &element.children {
        write_element(writer, child, None)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Document xmlns="urn:iso:std:iso:20022:tech:xsd:camt.053.001.10">
  <BkToCstmrStmt>
    <GrpHdr>
      <MsgId>MSG-1</MsgId>
    </GrpHdr>
    <Stmt>
      <Ntry>
        <Amt Ccy="CHF">100.00</Amt>
      </Ntry>
    </Stmt>
  </BkToCstmrStmt>
</Document>"#;

    #[test]
    fn test_parse_extracts_namespace_and_tree() {
        let document = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(
            document.namespace,
            "urn:iso:std:iso:20022:tech:xsd:camt.053.001.10"
        );
        assert_eq!(document.root.name, "Document");
        let amt = document
            .root
            .path(&["BkToCstmrStmt", "Stmt", "Ntry", "Amt"])
            .unwrap();
        assert_eq!(amt.text_trimmed(), Some("100.00"));
        assert_eq!(
            amt.attributes,
            vec![("Ccy".to_string(), "CHF".to_string())]
        );
    }

    #[test]
    fn test_parse_rejects_non_xml() {
        assert!(XmlDocument::parse(b"plain text").is_err());
        assert!(XmlDocument::parse(b"").is_err());
    }

    #[test]
    fn test_parse_rejects_unclosed_document() {
        assert!(XmlDocument::parse(b"<Document xmlns=\"u\"><Unclosed></Document>").is_err());
    }

    #[test]
    fn test_serialize_round_trip_is_stable() {
        let document = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        let first = document.to_bytes().unwrap();
        let reparsed = XmlDocument::parse(&first).unwrap();
        assert_eq!(reparsed, document);
        let second = reparsed.to_bytes().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_text_escaping_round_trip() {
        let xml = r#"<Document xmlns="u"><Info>R&amp;D &lt;x&gt;</Info></Document>"#;
        let document = XmlDocument::parse(xml.as_bytes()).unwrap();
        let info = document.root.child("Info").unwrap();
        assert_eq!(info.text_trimmed(), Some("R&D <x>"));
        let bytes = document.to_bytes().unwrap();
        let output = String::from_utf8(bytes).unwrap();
        assert!(output.contains("R&amp;D &lt;x&gt;"));
    }

    #[test]
    fn test_remove_named_is_recursive() {
        let xml = r#"<Document xmlns="u">
            <A><AdrTp><Cd>ADDR</Cd></AdrTp></A>
            <B><C><AdrTp/></C></B>
        </Document>"#;
        let mut document = XmlDocument::parse(xml.as_bytes()).unwrap();
        let removed = document.root.remove_named("AdrTp");
        assert_eq!(removed, 2);
        assert!(document.root.descendant("AdrTp").is_none());
    }

    #[test]
    fn test_child_or_append() {
        let mut element = Element::new("Ntry");
        assert!(element.child("BkTxCd").is_none());
        element.child_or_append("BkTxCd").push_child(Element::new("Prtry"));
        assert_eq!(element.children.len(), 1);
        element.child_or_append("BkTxCd");
        assert_eq!(element.children.len(), 1);
        assert!(element.path(&["BkTxCd", "Prtry"]).is_some());
    }

    #[test]
    fn test_descendant_finds_first_in_document_order() {
        let xml = r#"<Document xmlns="u">
            <A><Target><Id>first</Id></Target></A>
            <Target><Id>second</Id></Target>
        </Document>"#;
        let document = XmlDocument::parse(xml.as_bytes()).unwrap();
        let target = document.root.descendant("Target").unwrap();
        assert_eq!(
            target.child("Id").and_then(Element::text_trimmed),
            Some("first")
        );
    }

    #[test]
    fn test_remove_attribute_local_ignores_prefix() {
        let xml = r#"<Document xmlns="u" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="u here.xsd"><A/></Document>"#;
        let mut document = XmlDocument::parse(xml.as_bytes()).unwrap();
        document.root.remove_attribute_local("schemaLocation");
        assert!(document
            .root
            .attributes
            .iter()
            .all(|(key, _)| !key.ends_with("schemaLocation")));
        // the xsi prefix declaration itself is untouched
        assert!(document
            .root
            .attributes
            .iter()
            .any(|(key, _)| key == "xmlns:xsi"));
    }
}
