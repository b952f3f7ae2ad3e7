//! Error types for style loading.

use citeproc_xml::Span;
use thiserror::Error;

/// Result type alias for citeproc-style operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a style or locale.
///
/// All of these are fatal: a style that fails to load produces no
/// processor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Xml(#[from] citeproc_xml::Error),

    #[error("expected <{expected}> root element, found <{found}>")]
    InvalidRootElement {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: String,
        span: Span,
    },

    #[error("invalid value '{value}' for {attribute} on <{element}>, expected {expected}")]
    InvalidAttributeValue {
        element: String,
        attribute: String,
        value: String,
        expected: String,
        span: Span,
    },

    #[error("<{parent}> requires a <{element}> child")]
    MissingElement {
        parent: String,
        element: String,
        span: Span,
    },

    /// An element name with no counterpart node type.
    #[error("unknown element <{element}> inside <{context}>")]
    UnknownElement {
        element: String,
        context: String,
        span: Span,
    },

    #[error("<text> needs one of variable, macro, term or value")]
    MissingTextSource { span: Span },

    #[error("macro '{name}' is defined more than once")]
    DuplicateMacro { name: String, span: Span },

    #[error("circular macro reference: {}", chain.join(" -> "))]
    CircularMacro { chain: Vec<String>, span: Span },
}

impl Error {
    /// Location of the offending markup, when known.
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Xml(citeproc_xml::Error::UnclosedElement { span, .. })
            | Error::Xml(citeproc_xml::Error::MismatchedEndTag { span, .. })
            | Error::Xml(citeproc_xml::Error::MultipleRoots { span }) => Some(*span),
            Error::Xml(_) => None,
            Error::InvalidRootElement { span, .. }
            | Error::MissingAttribute { span, .. }
            | Error::InvalidAttributeValue { span, .. }
            | Error::MissingElement { span, .. }
            | Error::UnknownElement { span, .. }
            | Error::MissingTextSource { span }
            | Error::DuplicateMacro { span, .. }
            | Error::CircularMacro { span, .. } => Some(*span),
        }
    }
}
