//! `<label>` rendering and term pluralization.

use crate::context::RenderContext;
use crate::reference::Item;
use citeproc_style::{LabelElement, LabelPlural, TermForm};
use once_cell::sync::Lazy;
use regex::Regex;

/// A numeric range such as "12-15", "iv–vii" or "S1-S4".
static RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-zA-Z]*)([0-9]+)\s*(?:–|-)\s*([a-zA-Z]*)([0-9]+)").unwrap());

/// Several numbers in a list.
static NUMBER_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+[a-zA-Z]*\s*(?:,|&|&#38;|\band\b)\s*[a-zA-Z]*[0-9]+").unwrap());

/// Render the label for the element's variable. Returns an empty string
/// when the variable is absent or the locale has no term for it.
pub fn render_label(ctx: &RenderContext, item: &Item, element: &LabelElement) -> String {
    let (term, plural) = match element.variable.as_str() {
        "locator" => {
            let Some(cite) = ctx.citation_item.filter(|c| c.locator.is_some()) else {
                return String::new();
            };
            let value = cite.locator.as_deref().unwrap_or_default();
            (cite.label().to_string(), is_plural_value(cite.label(), value))
        }
        variable => {
            if let Some(names) = item.get_names(variable) {
                (variable.to_string(), names.len() > 1)
            } else if let Some(value) = item.get_variable(variable) {
                (variable.to_string(), is_plural_value(variable, &value))
            } else {
                return String::new();
            }
        }
    };

    let plural = resolve_plural(element.plural, plural);
    term_text(ctx, &term, element.form, plural)
}

/// Apply a `plural` attribute to the contextual answer.
pub fn resolve_plural(setting: LabelPlural, contextual: bool) -> bool {
    match setting {
        LabelPlural::Contextual => contextual,
        LabelPlural::Always => true,
        LabelPlural::Never => false,
    }
}

/// A locale term ready for output, with ` & ` escaped.
pub fn term_text(ctx: &RenderContext, term: &str, form: TermForm, plural: bool) -> String {
    ctx.locale
        .term(term, form, plural)
        .map(|t| t.replace(" & ", " &#38; "))
        .unwrap_or_default()
}

/// Whether a variable value reads as more than one thing. For a locator,
/// `variable` is its label.
///
/// Page-like values are plural when they hold a range or a list of numbers.
/// A plain number elsewhere counts: "3" volumes is plural.
pub fn is_plural_value(variable: &str, value: &str) -> bool {
    let page_like = matches!(variable, "page" | "chapter" | "folio");
    if !page_like && let Ok(n) = value.trim().parse::<u64>() {
        return n > 1;
    }
    RANGE.is_match(value) || NUMBER_LIST.is_match(value)
}
