//! Span-tracked XML parsing for CSL documents.
//!
//! This crate wraps [`quick-xml`] to provide a small tree of [`XmlElement`]s
//! where each element and attribute remembers the byte range it came from.
//! Both the style loader and the locale parser build on it.
//!
//! # Example
//!
//! ```rust
//! use citeproc_xml::parse;
//!
//! let xml = parse(r#"<style version="1.0">
//!   <macro name="author">
//!     <text variable="author"/>
//!   </macro>
//! </style>"#).unwrap();
//!
//! assert_eq!(xml.root.name, "style");
//! assert_eq!(xml.root.get_attribute("version"), Some("1.0"));
//!
//! let macros = xml.root.get_children("macro");
//! assert_eq!(macros.len(), 1);
//! assert_eq!(macros[0].get_attribute("name"), Some("author"));
//! ```

pub mod error;
pub mod parser;
pub mod types;

pub use error::{Error, Result};
pub use parser::parse;
pub use types::{Span, XmlAttribute, XmlChild, XmlDocument, XmlElement};
