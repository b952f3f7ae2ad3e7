//! CSL (Citation Style Language) style loading.
//!
//! This crate turns a CSL 1.0 style document into an immutable tree of typed
//! nodes. Every attribute is resolved at load time, so the renderer never
//! looks at raw XML. It builds on [`citeproc_xml`] for parsing with byte
//! spans.
//!
//! # Overview
//!
//! The main types are:
//! - [`Style`]: A complete parsed CSL style
//! - [`Element`]: A rendering element (text, names, date, etc.)
//! - [`Macro`]: A reusable macro definition
//! - [`Locale`]: Locale-specific terms and date formats
//!
//! # Example
//!
//! ```rust
//! use citeproc_style::parse_csl;
//!
//! let csl = r#"<?xml version="1.0" encoding="utf-8"?>
//! <style xmlns="http://purl.org/net/xbiblio/csl" class="in-text" version="1.0">
//!   <info><title>Test Style</title></info>
//!   <citation><layout><text variable="title"/></layout></citation>
//! </style>"#;
//!
//! let style = parse_csl(csl).unwrap();
//! assert_eq!(style.version, "1.0");
//! ```
//!
//! # Errors
//!
//! Loading fails on structural problems, and the error carries the span of
//! the offending markup:
//!
//! ```rust
//! use citeproc_style::parse_csl;
//!
//! let err = parse_csl("<style/>").unwrap_err();
//! assert!(err.span().is_some());
//! ```

pub mod error;
pub mod parser;
pub mod types;

pub use error::{Error, Result};
pub use parser::{parse_csl, parse_csl_document, parse_locale};
pub use types::*;
