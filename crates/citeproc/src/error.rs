//! Error types for citation processing.

use thiserror::Error;

/// Result type alias for citeproc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a processor or rendering.
///
/// Problems confined to a single node (an unknown macro, an id with no
/// matching item, an unusable date) are not errors; they render empty and
/// are logged.
#[derive(Error, Debug)]
pub enum Error {
    /// The style document failed to load.
    #[error(transparent)]
    Style(#[from] citeproc_style::Error),

    /// An embedded locale file could not be read or parsed.
    #[error("failed to load locale '{lang}': {message}")]
    Locale { lang: String, message: String },

    /// The top-level input did not have one of the accepted shapes.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid item data: {0}")]
    Json(#[from] serde_json::Error),
}
