//! Error types for XML parsing.

use crate::Span;
use thiserror::Error;

/// Result type alias for citeproc-xml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during XML parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// XML syntax error reported by quick-xml.
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { message: String, position: u64 },

    /// A start tag was never closed.
    #[error("unexpected end of input, expected closing tag </{name}>")]
    UnclosedElement { name: String, span: Span },

    #[error("mismatched end tag: expected </{expected}>, found </{found}>")]
    MismatchedEndTag {
        expected: String,
        found: String,
        span: Span,
    },

    /// Empty document (no root element).
    #[error("empty XML document: no root element found")]
    EmptyDocument,

    #[error("multiple root elements")]
    MultipleRoots { span: Span },
}
