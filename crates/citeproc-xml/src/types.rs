//! Core types for span-tracked XML trees.

/// A half-open byte range into the parsed document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// 1-based line number of the span start within `source`.
    pub fn line_in(&self, source: &str) -> usize {
        let end = self.start.min(source.len());
        source.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
    }
}

/// A parsed XML document.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    pub root: XmlElement,
    pub span: Span,
}

/// An XML element with its attributes and children.
#[derive(Debug, Clone)]
pub struct XmlElement {
    /// The local name of the element (without namespace prefix).
    pub name: String,

    /// Namespace prefix, if any (e.g., "csl" in `<csl:text>`).
    pub prefix: Option<String>,

    pub attributes: Vec<XmlAttribute>,

    /// Child elements and text, in document order.
    pub children: Vec<XmlChild>,

    /// From the `<` of the start tag to the `>` of the end tag.
    pub span: Span,
}

/// An XML attribute.
#[derive(Debug, Clone)]
pub struct XmlAttribute {
    /// The local name of the attribute (without namespace prefix).
    pub name: String,

    pub prefix: Option<String>,

    /// The attribute value (after unescaping XML entities).
    pub value: String,
}

/// A single child of an element.
#[derive(Debug, Clone)]
pub enum XmlChild {
    Element(XmlElement),
    Text { content: String, span: Span },
}

impl XmlElement {
    /// Get an attribute value by local name.
    ///
    /// Prefixed attributes (such as `xml:lang`) are only matched by
    /// [`XmlElement::get_prefixed_attribute`].
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.prefix.is_none())
            .map(|a| a.value.as_str())
    }

    pub fn get_prefixed_attribute(&self, prefix: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.prefix.as_deref() == Some(prefix))
            .map(|a| a.value.as_str())
    }

    /// Concatenated text content of this element, if it has any.
    pub fn text(&self) -> Option<String> {
        let mut text = String::new();
        let mut found = false;
        for child in &self.children {
            if let XmlChild::Text { content, .. } = child {
                text.push_str(content);
                found = true;
            }
        }
        found.then_some(text)
    }

    /// Get child elements by name.
    pub fn get_children(&self, name: &str) -> Vec<&XmlElement> {
        self.elements().filter(|e| e.name == name).collect()
    }

    pub fn get_child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// Iterate child elements, ignoring text.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlChild::Element(e) => Some(e),
            XmlChild::Text { .. } => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(name: &str, attributes: Vec<XmlAttribute>, children: Vec<XmlChild>) -> XmlElement {
        XmlElement {
            name: name.to_string(),
            prefix: None,
            attributes,
            children,
            span: Span::default(),
        }
    }

    #[test]
    fn test_prefixed_attribute_is_not_plain() {
        let el = element(
            "locale",
            vec![XmlAttribute {
                name: "lang".to_string(),
                prefix: Some("xml".to_string()),
                value: "de-DE".to_string(),
            }],
            vec![],
        );
        assert_eq!(el.get_attribute("lang"), None);
        assert_eq!(el.get_prefixed_attribute("xml", "lang"), Some("de-DE"));
    }

    #[test]
    fn test_children_and_text() {
        let child = element("single", vec![], vec![]);
        let parent = element(
            "term",
            vec![],
            vec![
                XmlChild::Element(child),
                XmlChild::Text {
                    content: "editor".to_string(),
                    span: Span::default(),
                },
            ],
        );
        assert_eq!(parent.get_children("single").len(), 1);
        assert!(parent.get_child("multiple").is_none());
        assert_eq!(parent.text().as_deref(), Some("editor"));
    }

    #[test]
    fn test_span_line() {
        let src = "<a>\n<b/>\n</a>";
        assert_eq!(Span::new(4, 8).line_in(src), 2);
    }
}
