//! Number formatting: ordinals, roman numerals, numeric and page ranges.

use crate::locale::LocaleStore;
use citeproc_style::{NumberForm, PageRangeFormat, TermForm};
use once_cell::sync::Lazy;
use regex::Regex;

/// Two numbers joined by a hyphen, en dash, ampersand or comma.
static NUMBER_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([0-9]+)\s*([\-–&,])\s*([0-9]+)\s*$").unwrap());

/// Two roman numerals joined the same way.
static ROMAN_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([ivxlcdm]+)\s*([\-–&,])\s*([ivxlcdm]+)\s*$").unwrap());

/// A page range with optional letter prefixes.
static PAGE_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]*)([0-9]+)\s*(?:–|-)+\s*([A-Za-z]*)([0-9]+)$").unwrap());

const ROMAN_DIGITS: &[(u32, &str)] = &[
    (1000, "m"),
    (900, "cm"),
    (500, "d"),
    (400, "cd"),
    (100, "c"),
    (90, "xc"),
    (50, "l"),
    (40, "xl"),
    (10, "x"),
    (9, "ix"),
    (5, "v"),
    (4, "iv"),
    (1, "i"),
];

/// Lowercase roman numeral for 1 to 3999.
pub fn decimal_to_roman(mut n: u32) -> Option<String> {
    if !(1..=3999).contains(&n) {
        return None;
    }
    let mut result = String::new();
    for &(value, digits) in ROMAN_DIGITS {
        while n >= value {
            result.push_str(digits);
            n -= value;
        }
    }
    Some(result)
}

/// Value of a roman numeral, case-insensitive. Rejects non-canonical
/// spellings such as "iiii".
pub fn roman_to_decimal(s: &str) -> Option<u32> {
    let lower = s.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    let mut rest = lower.as_str();
    let mut total = 0;
    for &(value, digits) in ROMAN_DIGITS {
        let mut repeats = 0;
        while let Some(next) = rest.strip_prefix(digits) {
            rest = next;
            total += value;
            repeats += 1;
            if repeats > 3 {
                return None;
            }
        }
    }
    if rest.is_empty() && decimal_to_roman(total).as_deref() == Some(lower.as_str()) {
        Some(total)
    } else {
        None
    }
}

/// Replace roman numerals (alone or as a range) with decimal numbers.
pub fn to_decimal(value: &str) -> String {
    if let Some(n) = roman_to_decimal(value) {
        return n.to_string();
    }
    let lower = value.to_lowercase();
    if let Some(caps) = ROMAN_RANGE.captures(&lower) {
        if let (Some(a), Some(b)) = (roman_to_decimal(&caps[1]), roman_to_decimal(&caps[3])) {
            return format!("{}{}{}", a, &caps[2], b);
        }
    }
    value.to_string()
}

/// Number with its locale ordinal suffix: 1st, 2nd, 3rd, 4th, 11th, 21st.
pub fn ordinal(n: u64, locale: &dyn LocaleStore) -> String {
    let term_name = if (n / 10) % 10 == 1 {
        "ordinal"
    } else {
        match n % 10 {
            1 => "ordinal-01",
            2 => "ordinal-02",
            3 => "ordinal-03",
            _ => "ordinal-04",
        }
    };
    let suffix = locale
        .term(term_name, TermForm::Long, false)
        .filter(|s| !s.is_empty())
        .or_else(|| locale.term("ordinal", TermForm::Long, false))
        .unwrap_or_default();
    format!("{}{}", n, suffix)
}

/// "first" through "tenth"; larger numbers fall back to [`ordinal`].
pub fn long_ordinal(n: u64, locale: &dyn LocaleStore) -> String {
    let term = format!("long-ordinal-{:02}", n);
    match locale.term(&term, TermForm::Long, false) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => ordinal(n, locale),
    }
}

fn format_single(value: &str, form: NumberForm, locale: &dyn LocaleStore) -> String {
    let Ok(n) = value.trim().parse::<u64>() else {
        return value.to_string();
    };
    match form {
        NumberForm::Numeric => n.to_string(),
        NumberForm::Ordinal => ordinal(n, locale),
        NumberForm::LongOrdinal => long_ordinal(n, locale),
        NumberForm::Roman => u32::try_from(n)
            .ok()
            .and_then(decimal_to_roman)
            .unwrap_or_else(|| n.to_string()),
    }
}

/// Join a two-number range: `a-b`, `a, b` or `a &#38; b`.
fn join_range(from: &str, delimiter: &str, to: &str) -> String {
    match delimiter {
        "&" => format!("{} &#38; {}", from, to),
        "," => format!("{}, {}", from, to),
        _ => format!("{}-{}", from, to),
    }
}

/// Render a number variable value in the given form. Values that are not
/// numbers are returned unchanged.
pub fn format_number(value: &str, form: NumberForm, locale: &dyn LocaleStore) -> String {
    let decimal = to_decimal(value);
    if let Some(caps) = NUMBER_RANGE.captures(&decimal) {
        return join_range(
            &format_single(&caps[1], form, locale),
            &caps[2],
            &format_single(&caps[3], form, locale),
        );
    }
    format_single(&decimal, form, locale)
}

/// Reformat page ranges. Each comma-separated range is normalised to
/// `delimiter` and shortened per `format`; other text is kept.
pub fn format_page_range(value: &str, format: Option<PageRangeFormat>, delimiter: &str) -> String {
    value
        .split(',')
        .map(|chunk| format_one_page_range(chunk.trim(), format, delimiter))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_one_page_range(chunk: &str, format: Option<PageRangeFormat>, delimiter: &str) -> String {
    let Some(caps) = PAGE_RANGE.captures(chunk) else {
        return chunk.to_string();
    };
    let (from_prefix, from, to_prefix, to) = (&caps[1], &caps[2], &caps[3], &caps[4]);

    // Ranges across different prefixes keep both ends intact.
    if !to_prefix.is_empty() && to_prefix != from_prefix {
        return format!("{}{}{}{}{}", from_prefix, from, delimiter, to_prefix, to);
    }

    let to = match format {
        Some(format) => shorten_range_end(from, to, format),
        None => to.to_string(),
    };
    format!("{}{}{}{}{}", from_prefix, from, delimiter, to_prefix, to)
}

/// The end of a range written in full, e.g. 321-28 gives 328.
fn expand_range_end(from: &str, to: &str) -> String {
    if to.len() >= from.len() {
        return to.to_string();
    }
    let expanded = format!("{}{}", &from[..from.len() - to.len()], to);
    match (from.parse::<u64>(), expanded.parse::<u64>()) {
        (Ok(a), Ok(b)) if b >= a => expanded,
        _ => to.to_string(),
    }
}

/// Digits of `to` from the first one that differs from `from`, keeping at
/// least `min_digits`.
fn changed_digits(from: &str, to: &str, min_digits: usize) -> String {
    if from.len() != to.len() {
        return to.to_string();
    }
    let first_diff = from
        .bytes()
        .zip(to.bytes())
        .position(|(a, b)| a != b)
        .unwrap_or(to.len() - 1);
    let start = first_diff.min(to.len().saturating_sub(min_digits));
    to[start..].to_string()
}

fn shorten_range_end(from: &str, to: &str, format: PageRangeFormat) -> String {
    let full = expand_range_end(from, to);
    match format {
        PageRangeFormat::Expanded => full,
        PageRangeFormat::Minimal => changed_digits(from, &full, 1),
        PageRangeFormat::MinimalTwo => changed_digits(from, &full, 2),
        PageRangeFormat::Chicago => {
            let Ok(start) = from.parse::<u64>() else {
                return full;
            };
            if start < 100 || start % 100 == 0 {
                full
            } else if start % 100 < 10 {
                changed_digits(from, &full, 1)
            } else {
                let shortened = changed_digits(from, &full, 2);
                if from.len() == 4 && shortened.len() >= 3 {
                    full
                } else {
                    shortened
                }
            }
        }
    }
}
