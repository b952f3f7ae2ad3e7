//! Citation and bibliography rendering with CSL styles.
//!
//! This crate takes:
//! - A CSL 1.0 style, loaded by [`citeproc_style`]
//! - Bibliographic [`Item`]s in CSL-JSON format
//! - Optionally, the [`CitationItem`]s of one or more citations
//!
//! And produces HTML fragments: a `csl-bib-body` block for a bibliography,
//! or the text of each citation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                             citeproc                                │
//! │   Processor ─► layout ─► render (text, group, choose, macro)        │
//! │                  │          ├─► names  ├─► date  ├─► number         │
//! │                  ▼          └─► label  └─► constraint               │
//! │                 sort          (all read a RenderContext value)      │
//! └───────────────────────────┬─────────────────────────────────────────┘
//!                             │
//!                             ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          citeproc-style                             │
//! │           XML → Style, Layout, Element, Macro, Locale              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use citeproc::{Processor, RenderMode};
//! use serde_json::json;
//!
//! let csl = r#"<?xml version="1.0" encoding="utf-8"?>
//! <style xmlns="http://purl.org/net/xbiblio/csl" class="in-text" version="1.0">
//!   <citation>
//!     <layout prefix="(" suffix=")">
//!       <group delimiter=" ">
//!         <names variable="author"><name form="short"/></names>
//!         <date variable="issued"><date-part name="year"/></date>
//!       </group>
//!     </layout>
//!   </citation>
//! </style>"#;
//!
//! let mut processor = Processor::new(csl).unwrap();
//! let items = json!([{
//!     "id": "doe2020",
//!     "author": [{"family": "Doe", "given": "Jane"}],
//!     "issued": {"date-parts": [[2020]]}
//! }]);
//! let rendered = processor
//!     .render(&items, RenderMode::Citation, None, false)
//!     .unwrap();
//! assert_eq!(rendered.into_text(), "(Doe 2020)");
//! ```

pub mod constraint;
pub mod context;
pub mod date;
pub mod error;
pub mod label;
pub mod layout;
pub mod locale;
pub mod locale_parser;
pub mod names;
pub mod number;
pub mod output;
pub mod processor;
pub mod reference;
pub mod render;
pub mod sort;

#[cfg(test)]
mod test_support;

pub use context::{CitationItem, CitationItems, RenderMode};
pub use error::{Error, Result};
pub use locale::{LocaleStore, Locales};
pub use processor::{Processor, Rendered, parse_citation_items, parse_items};
pub use reference::{DateParts, DateVariable, Item, Name};
