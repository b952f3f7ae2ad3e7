//! XML parser that builds [`XmlDocument`] trees.

use crate::{Error, Result, Span, XmlAttribute, XmlChild, XmlDocument, XmlElement};
use quick_xml::Reader;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};

/// Parse XML from a string.
///
/// # Example
///
/// ```rust
/// use citeproc_xml::parse;
///
/// let xml = parse("<root><child/></root>").unwrap();
/// assert_eq!(xml.root.name, "root");
/// ```
///
/// # Errors
///
/// Returns an error if the XML is malformed.
pub fn parse(content: &str) -> Result<XmlDocument> {
    XmlParser::new(content).parse()
}

struct XmlParser<'a> {
    source: &'a str,
    reader: Reader<&'a [u8]>,

    /// Stack of elements being built.
    stack: Vec<BuildNode>,
}

/// A node being constructed during parsing.
struct BuildNode {
    name: String,
    prefix: Option<String>,
    attributes: Vec<XmlAttribute>,

    /// Byte offset of the `<` that opened this element.
    start_offset: usize,

    children: Vec<XmlChild>,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            source,
            reader,
            stack: Vec::new(),
        }
    }

    fn parse(&mut self) -> Result<XmlDocument> {
        let mut root: Option<XmlElement> = None;

        loop {
            let event_start = self.reader.buffer_position() as usize;

            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    self.handle_start(&e, event_start)?;
                }
                Ok(Event::End(e)) => {
                    let element = self.handle_end(&e)?;
                    self.attach(element, &mut root)?;
                }
                Ok(Event::Empty(e)) => {
                    let element = self.handle_empty(&e, event_start)?;
                    self.attach(element, &mut root)?;
                }
                Ok(Event::Text(e)) => {
                    self.handle_text(&e, event_start)?;
                }
                Ok(Event::CData(e)) => {
                    self.handle_cdata(&e, event_start);
                }
                Ok(Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Syntax {
                        message: e.to_string(),
                        position: self.reader.error_position(),
                    });
                }
            }
        }

        if let Some(node) = self.stack.last() {
            return Err(Error::UnclosedElement {
                name: node.name.clone(),
                span: Span::new(node.start_offset, self.source.len()),
            });
        }

        let root = root.ok_or(Error::EmptyDocument)?;
        Ok(XmlDocument {
            root,
            span: Span::new(0, self.source.len()),
        })
    }

    /// Hand a finished element to its parent, or make it the root.
    fn attach(&mut self, element: XmlElement, root: &mut Option<XmlElement>) -> Result<()> {
        match self.stack.last_mut() {
            Some(parent) => {
                parent.children.push(XmlChild::Element(element));
                Ok(())
            }
            None if root.is_some() => Err(Error::MultipleRoots { span: element.span }),
            None => {
                *root = Some(element);
                Ok(())
            }
        }
    }

    fn handle_start(&mut self, e: &BytesStart<'_>, event_start: usize) -> Result<()> {
        let (name, prefix) = split_name(e.name().as_ref());
        let attributes = self.parse_attributes(e, event_start)?;

        self.stack.push(BuildNode {
            name,
            prefix,
            attributes,
            start_offset: event_start,
            children: Vec::new(),
        });
        Ok(())
    }

    fn handle_end(&mut self, e: &BytesEnd<'_>) -> Result<XmlElement> {
        let (end_name, _) = split_name(e.name().as_ref());
        let end_offset = self.reader.buffer_position() as usize;

        let node = self.stack.pop().ok_or_else(|| Error::Syntax {
            message: format!("unexpected closing tag </{}>", end_name),
            position: end_offset as u64,
        })?;

        if node.name != end_name {
            return Err(Error::MismatchedEndTag {
                expected: node.name,
                found: end_name,
                span: Span::new(node.start_offset, end_offset),
            });
        }

        Ok(XmlElement {
            name: node.name,
            prefix: node.prefix,
            attributes: node.attributes,
            children: node.children,
            span: Span::new(node.start_offset, end_offset),
        })
    }

    fn handle_empty(&mut self, e: &BytesStart<'_>, event_start: usize) -> Result<XmlElement> {
        let (name, prefix) = split_name(e.name().as_ref());
        let attributes = self.parse_attributes(e, event_start)?;
        let end_offset = self.reader.buffer_position() as usize;

        Ok(XmlElement {
            name,
            prefix,
            attributes,
            children: Vec::new(),
            span: Span::new(event_start, end_offset),
        })
    }

    fn handle_text(&mut self, e: &BytesText<'_>, event_start: usize) -> Result<()> {
        let text = e.unescape().map_err(|err| Error::Syntax {
            message: format!("invalid text content: {}", err),
            position: event_start as u64,
        })?;
        let end_offset = self.reader.buffer_position() as usize;

        // Indentation between elements carries no meaning in CSL documents.
        if text.trim().is_empty() && text.contains('\n') {
            return Ok(());
        }

        if let Some(node) = self.stack.last_mut() {
            node.children.push(XmlChild::Text {
                content: text.into_owned(),
                span: Span::new(event_start, end_offset),
            });
        }
        Ok(())
    }

    fn handle_cdata(&mut self, e: &BytesCData<'_>, event_start: usize) {
        let text = String::from_utf8_lossy(e).into_owned();
        let end_offset = self.reader.buffer_position() as usize;

        if let Some(node) = self.stack.last_mut() {
            node.children.push(XmlChild::Text {
                content: text,
                span: Span::new(event_start, end_offset),
            });
        }
    }

    fn parse_attributes(&self, e: &BytesStart<'_>, tag_start: usize) -> Result<Vec<XmlAttribute>> {
        let mut attributes = Vec::new();

        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|err| Error::Syntax {
                message: format!("invalid attribute: {}", err),
                position: tag_start as u64,
            })?;
            let (name, prefix) = split_name(attr.key.as_ref());

            let value = attr.unescape_value().map_err(|err| Error::Syntax {
                message: format!("invalid attribute value: {}", err),
                position: tag_start as u64,
            })?;

            attributes.push(XmlAttribute {
                name,
                prefix,
                value: value.into_owned(),
            });
        }

        Ok(attributes)
    }
}

/// Split `prefix:local` into `(local, Some(prefix))`.
fn split_name(raw: &[u8]) -> (String, Option<String>) {
    let full_name = String::from_utf8_lossy(raw).to_string();
    match full_name.split_once(':') {
        Some((prefix, local)) => (local.to_string(), Some(prefix.to_string())),
        None => (full_name, None),
    }
}
