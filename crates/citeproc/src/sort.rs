//! Sort keys and item ordering for `<sort>`.

use crate::context::{ItemScratch, NameOverrides, Phase, RenderContext};
use crate::date::resolve_dates;
use crate::names::render_names;
use crate::number::to_decimal;
use crate::output::strip_html_tags;
use crate::reference::{DATE_VARIABLES, Item, NAME_VARIABLES, NUMBER_VARIABLES};
use crate::render::{render_elements, variable_text};
use citeproc_style::{NamesElement, Sort, SortKey, SortKeyType, SortOrder};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use tracing::warn;

/// The leading integer of a number variable.
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(-?[0-9]+)").unwrap());

/// A computed sort key value.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Empty,
    Number(i64),
    Text(String),
}

/// A computed sort key value with its sort direction.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKeyValue {
    pub value: SortValue,
    pub descending: bool,
}

/// Compare two sets of sort keys.
///
/// Empty values sort after non-empty ones regardless of direction; the
/// descending flag only reverses comparisons between two values.
pub fn compare_sort_keys(a: &[SortKeyValue], b: &[SortKeyValue]) -> Ordering {
    for (ka, kb) in a.iter().zip(b.iter()) {
        let cmp = match (&ka.value, &kb.value) {
            (SortValue::Empty, SortValue::Empty) => Ordering::Equal,
            (SortValue::Empty, _) => Ordering::Greater,
            (_, SortValue::Empty) => Ordering::Less,
            (va, vb) => {
                let value_cmp = compare_values(va, vb);
                if ka.descending {
                    value_cmp.reverse()
                } else {
                    value_cmp
                }
            }
        };

        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    a.len().cmp(&b.len())
}

fn compare_values(a: &SortValue, b: &SortValue) -> Ordering {
    match (a, b) {
        (SortValue::Number(x), SortValue::Number(y)) => x.cmp(y),
        (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
        (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
        (SortValue::Text(x), SortValue::Text(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Sort `items` (each paired with its input index) by the sort keys. The
/// sort is stable.
pub fn sort_items<'i>(
    ctx: &RenderContext,
    sort: &Sort,
    items: Vec<(usize, &'i Item)>,
) -> Vec<(usize, &'i Item)> {
    let mut keyed: Vec<(Vec<SortKeyValue>, (usize, &'i Item))> = items
        .into_iter()
        .map(|(index, item)| {
            let ctx = ctx
                .with_phase(Phase::Sorting)
                .with_citation_number(index + 1);
            (compute_sort_keys(&ctx, item, &sort.keys), (index, item))
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| compare_sort_keys(a, b));
    keyed.into_iter().map(|(_, entry)| entry).collect()
}

/// Compute sort key values for an item.
pub fn compute_sort_keys(ctx: &RenderContext, item: &Item, keys: &[SortKey]) -> Vec<SortKeyValue> {
    keys.iter()
        .map(|key| {
            let overrides = NameOverrides {
                et_al_min: key.names_min,
                et_al_use_first: key.names_use_first,
                et_al_use_last: key.names_use_last,
            };
            let ctx = ctx.with_name_overrides(overrides);
            let value = match &key.key {
                SortKeyType::Variable(variable) => variable_sort_value(&ctx, item, variable),
                SortKeyType::Macro(name) => macro_sort_value(&ctx, item, name),
            };
            SortKeyValue {
                value,
                descending: key.sort_order == SortOrder::Descending,
            }
        })
        .collect()
}

fn variable_sort_value(ctx: &RenderContext, item: &Item, variable: &str) -> SortValue {
    if NAME_VARIABLES.contains(&variable) {
        // Name keys list every name unless the key asks for et-al.
        let ctx = ctx.with_name_overrides(NameOverrides {
            et_al_min: ctx.name_overrides.et_al_min.or(Some(u32::MAX)),
            ..ctx.name_overrides
        });
        let element = NamesElement {
            variables: vec![variable.to_string()],
            delimiter: None,
            name: None,
            et_al: None,
            label: None,
            label_before_name: false,
            substitute: None,
        };
        let names = render_names(&ctx, item, &mut ItemScratch::default(), &element);
        return text_value(&names);
    }

    if DATE_VARIABLES.contains(&variable) {
        return match item.get_date(variable).and_then(resolve_dates) {
            Some((start, end)) => {
                let mut key = date_to_sort_string(start.year, start.month, start.day);
                if let Some(end) = end {
                    key.push_str(&date_to_sort_string(end.year, end.month, end.day));
                }
                SortValue::Text(key)
            }
            None => SortValue::Empty,
        };
    }

    let Some(value) = variable_text(ctx, item, variable) else {
        return SortValue::Empty;
    };
    if NUMBER_VARIABLES.contains(&variable) {
        if let Some(number) = leading_number(&to_decimal(&value)) {
            return SortValue::Number(number);
        }
    }
    text_value(&value)
}

fn macro_sort_value(ctx: &RenderContext, item: &Item, name: &str) -> SortValue {
    let Some(definition) = ctx.style.macros.get(name) else {
        warn!(macro_name = %name, "undefined macro in sort key");
        return SortValue::Empty;
    };
    let rendered = render_elements(ctx, item, &mut ItemScratch::default(), &definition.elements, "");
    let plain = strip_html_tags(&rendered);
    if !plain.is_empty() && plain.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(number) = plain.parse() {
            return SortValue::Number(number);
        }
    }
    text_value(&rendered)
}

fn leading_number(value: &str) -> Option<i64> {
    LEADING_NUMBER.captures(value)?[1].parse().ok()
}

fn text_value(text: &str) -> SortValue {
    let normalized = normalize_for_sort(text);
    if normalized.is_empty() {
        SortValue::Empty
    } else {
        SortValue::Text(normalized)
    }
}

/// Characters that separate words in a sort key.
fn is_sort_word_separator(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '\'' | '\u{2019}' | '\u{2018}' | '\u{201C}' | '\u{201D}' | '"' | ',' | '[' | ']'
        )
        || c == '\u{02BE}'
        || c == '\u{02BF}'
}

/// Strip markup and entities, split on word separators, case-fold.
pub fn normalize_for_sort(s: &str) -> String {
    let s = strip_html_tags(s).replace("&#38;", "&");
    s.split(is_sort_word_separator)
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `P{year:09}{month:02}{day:02}`; years before the common era get an `N`
/// prefix and an offset so that they sort first and chronologically.
fn date_to_sort_string(year: Option<i32>, month: Option<i32>, day: Option<i32>) -> String {
    let year = year.unwrap_or(0);
    let (prefix, sort_year) = if year < 0 {
        ('N', 999_999_999 + year)
    } else {
        ('P', year)
    };
    format!(
        "{}{:09}{:02}{:02}",
        prefix,
        sort_year,
        month.unwrap_or(0).max(0),
        day.unwrap_or(0).max(0)
    )
}
