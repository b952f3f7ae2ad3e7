//! Parser for standalone CSL locale files.
//!
//! Locale files share the `<locale>` grammar with the overrides embedded in
//! styles, so the element itself is handled by the style loader.

use crate::error::{Error, Result};
use citeproc_style::Locale;

/// Parse a locale XML file.
pub fn parse_locale_xml(lang: &str, xml: &str) -> Result<Locale> {
    let locale_error = |message: String| Error::Locale {
        lang: lang.to_string(),
        message,
    };

    let doc = citeproc_xml::parse(xml).map_err(|e| locale_error(e.to_string()))?;
    if doc.root.name != "locale" {
        return Err(locale_error(format!(
            "expected <locale> root element, found <{}>",
            doc.root.name
        )));
    }

    citeproc_style::parse_locale(&doc.root).map_err(|e| locale_error(e.to_string()))
}
