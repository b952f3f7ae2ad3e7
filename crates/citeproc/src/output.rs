//! Formatting primitives for rendered HTML fragments.
//!
//! Every rendering node produces a `String` of HTML. The helpers here apply
//! the CSL styling attributes to such fragments in a fixed order:
//! text-case, strip-periods, inline formatting, affixes, quotes, display.
//!
//! Markup (`<...>` tags and `&...;` entities) is never touched by the text
//! transformations, and content of `<span class="nocase">` keeps its case.

use crate::locale::LocaleStore;
use citeproc_style::{
    FontStyle, FontVariant, FontWeight, Formatting, TermForm, TextCase, TextDecoration,
    VerticalAlign,
};

// ============================================================================
// Quote configuration
// ============================================================================

/// Locale quote terms and the punctuation-in-quote option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteConfig {
    pub open_quote: String,
    pub close_quote: String,
    pub open_inner_quote: String,
    pub close_inner_quote: String,
    pub punctuation_in_quote: bool,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            open_quote: "\u{201C}".to_string(),
            close_quote: "\u{201D}".to_string(),
            open_inner_quote: "\u{2018}".to_string(),
            close_inner_quote: "\u{2019}".to_string(),
            punctuation_in_quote: false,
        }
    }
}

impl QuoteConfig {
    pub fn from_locale(locale: &dyn LocaleStore) -> Self {
        let defaults = Self::default();
        let term = |name: &str, default: String| {
            locale
                .term(name, TermForm::Long, false)
                .map(str::to_string)
                .unwrap_or(default)
        };
        Self {
            open_quote: term("open-quote", defaults.open_quote),
            close_quote: term("close-quote", defaults.close_quote),
            open_inner_quote: term("open-inner-quote", defaults.open_inner_quote),
            close_inner_quote: term("close-inner-quote", defaults.close_inner_quote),
            punctuation_in_quote: locale.options().punctuation_in_quote.unwrap_or(false),
        }
    }
}

// ============================================================================
// Full styling pipeline
// ============================================================================

/// Apply all styling attributes of `formatting` to `text`.
///
/// `english` enables title casing, which is only defined for English.
pub fn render_with_formatting(
    text: &str,
    formatting: &Formatting,
    quotes: &QuoteConfig,
    english: bool,
) -> String {
    if text.is_empty() {
        return String::new();
    }

    let cased = match formatting.text_case {
        Some(case) => apply_text_case(text, case, english),
        None => text.to_string(),
    };

    let stripped = if formatting.strip_periods {
        strip_periods(&cased)
    } else {
        cased
    };

    let formatted = apply_inline_formatting(&stripped, formatting);

    let affixed = apply_affixes(
        &formatted,
        formatting.prefix.as_deref().unwrap_or_default(),
        formatting.suffix.as_deref().unwrap_or_default(),
        quotes,
    );

    let quoted = if formatting.quotes {
        apply_quotes(&affixed, formatting.suffix.as_deref(), quotes)
    } else {
        affixed
    };

    match formatting.display {
        Some(display) => format!("<div class=\"csl-{}\">{}</div>", display.class_name(), quoted),
        None => quoted,
    }
}

/// Wrap `text` in the HTML for font style, weight, variant, decoration and
/// vertical alignment. `normal`, `none` and `baseline` emit nothing.
pub fn apply_inline_formatting(text: &str, formatting: &Formatting) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut result = text.to_string();
    let mut styles: Vec<&str> = Vec::new();

    match formatting.font_style {
        Some(FontStyle::Italic) => result = format!("<i>{}</i>", result),
        Some(FontStyle::Oblique) => styles.push("font-style: oblique"),
        Some(FontStyle::Normal) | None => {}
    }

    match formatting.font_weight {
        Some(FontWeight::Bold) => result = format!("<b>{}</b>", result),
        Some(FontWeight::Light) => styles.push("font-weight: light"),
        Some(FontWeight::Normal) | None => {}
    }

    match formatting.vertical_align {
        Some(VerticalAlign::Sup) => result = format!("<sup>{}</sup>", result),
        Some(VerticalAlign::Sub) => result = format!("<sub>{}</sub>", result),
        Some(VerticalAlign::Baseline) | None => {}
    }

    if formatting.font_variant == Some(FontVariant::SmallCaps) {
        styles.push("font-variant: small-caps");
    }
    if formatting.text_decoration == Some(TextDecoration::Underline) {
        styles.push("text-decoration: underline");
    }

    if styles.is_empty() {
        result
    } else {
        format!("<span style=\"{}\">{}</span>", styles.join(";"), result)
    }
}

/// Add prefix and suffix.
///
/// A suffix whose first character repeats the last visible character of
/// `text` loses that character. With punctuation-in-quote, a `,` `;` or `.`
/// suffix after a closing quote moves inside the quote.
pub fn apply_affixes(text: &str, prefix: &str, suffix: &str, quotes: &QuoteConfig) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut suffix = suffix;
    if let Some(first) = suffix.chars().next() {
        if strip_html_tags(text).chars().last() == Some(first) {
            suffix = &suffix[first.len_utf8()..];
        }

        if quotes.punctuation_in_quote
            && matches!(suffix, "," | ";" | ".")
            && !quotes.close_quote.is_empty()
        {
            if let Some(body) = text.strip_suffix(quotes.close_quote.as_str()) {
                return format!("{}{}{}{}", prefix, body, suffix, quotes.close_quote);
            }
        }
    }

    format!("{}{}{}", prefix, text, suffix)
}

/// Surround `text` with the locale quotes.
///
/// Quotes already present become inner quotes. Without punctuation-in-quote,
/// trailing `.` `,` or `;` moves outside the closing quote unless it equals
/// the element suffix.
pub fn apply_quotes(text: &str, suffix: Option<&str>, quotes: &QuoteConfig) -> String {
    let open = quotes.open_quote.as_str();
    let close = quotes.close_quote.as_str();

    let mut text = replace_outer_quotes(
        text,
        "\"",
        "\"",
        &quotes.open_inner_quote,
        &quotes.close_inner_quote,
    );
    text = replace_outer_quotes(
        &text,
        open,
        close,
        &quotes.open_inner_quote,
        &quotes.close_inner_quote,
    );

    if !quotes.punctuation_in_quote {
        let body = text.trim_end_matches(['.', ',', ';']);
        if !body.is_empty() && body.len() < text.len() {
            if let Some(punctuation) = text.chars().last() {
                let mut buf = [0u8; 4];
                if suffix != Some(punctuation.encode_utf8(&mut buf)) {
                    let kept = &text[..text.len() - punctuation.len_utf8()];
                    return format!("{}{}{}{}", open, kept, close, punctuation);
                }
            }
        }
    }

    format!("{}{}{}", open, text, close)
}

/// Replace each `outer_open … outer_close` pair found outside of tags
/// with the inner quote marks.
fn replace_outer_quotes(
    text: &str,
    outer_open: &str,
    outer_close: &str,
    inner_open: &str,
    inner_close: &str,
) -> String {
    if outer_open.is_empty() || outer_close.is_empty() {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let Some(start) = find_outside_tags(rest, outer_open) else {
            break;
        };
        let after_open = start + outer_open.len();
        let Some(end) = find_outside_tags(&rest[after_open..], outer_close) else {
            break;
        };
        let end = after_open + end;
        result.push_str(&rest[..start]);
        result.push_str(inner_open);
        result.push_str(&rest[after_open..end]);
        result.push_str(inner_close);
        rest = &rest[end + outer_close.len()..];
    }
    result.push_str(rest);
    result
}

/// Byte offset of the first `needle` that is not inside a `<...>` tag.
fn find_outside_tags(haystack: &str, needle: &str) -> Option<usize> {
    let mut in_tag = false;
    for (i, c) in haystack.char_indices() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag && haystack[i..].starts_with(needle) => return Some(i),
            _ => {}
        }
    }
    None
}

// ============================================================================
// Text case
// ============================================================================

/// Words that title case keeps lowercase unless they are first or last.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "by", "down", "for", "from", "in", "into", "nor", "of",
    "on", "onto", "or", "over", "so", "the", "till", "to", "up", "via", "with", "yet",
];

/// A piece of an HTML fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    /// A tag or an entity.
    Markup(&'a str),
    /// A whole `<span class="nocase">…</span>`.
    NoCase(&'a str),
}

const NOCASE_OPEN: &str = "<span class=\"nocase\">";

fn split_segments(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        let markup_len = if rest.starts_with(NOCASE_OPEN) {
            rest.find("</span>").map(|end| (end + "</span>".len(), true))
        } else if rest.starts_with('<') {
            rest.find('>').map(|end| (end + 1, false))
        } else if rest.starts_with('&') {
            entity_len(rest).map(|len| (len, false))
        } else {
            None
        };

        match markup_len {
            Some((len, nocase)) => {
                if text_start < i {
                    segments.push(Segment::Text(&text[text_start..i]));
                }
                let piece = &text[i..i + len];
                segments.push(if nocase {
                    Segment::NoCase(piece)
                } else {
                    Segment::Markup(piece)
                });
                i += len;
                text_start = i;
            }
            None => {
                i += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    if text_start < text.len() {
        segments.push(Segment::Text(&text[text_start..]));
    }
    segments
}

/// Length of an HTML entity at the start of `s`, if there is one.
fn entity_len(s: &str) -> Option<usize> {
    let body = s.strip_prefix('&')?;
    let body = body.strip_prefix('#').unwrap_or(body);
    let name_len = body
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .count();
    if name_len > 0 && body[name_len..].starts_with(';') {
        Some(s.len() - body.len() + name_len + 1)
    } else {
        None
    }
}

/// Apply `f` to every text segment, keeping markup and nocase spans.
fn map_text(segments: &[Segment], mut f: impl FnMut(&str) -> String) -> String {
    let mut result = String::new();
    for segment in segments {
        match segment {
            Segment::Text(t) => result.push_str(&f(t)),
            Segment::Markup(m) | Segment::NoCase(m) => result.push_str(m),
        }
    }
    result
}

/// Apply `f` to every whitespace-separated word of the text segments.
fn map_words(segments: &[Segment], mut f: impl FnMut(&str) -> String) -> String {
    map_text(segments, |text| {
        let mut out = String::with_capacity(text.len());
        let mut word = String::new();
        for c in text.chars() {
            if c.is_whitespace() {
                if !word.is_empty() {
                    out.push_str(&f(&word));
                    word.clear();
                }
                out.push(c);
            } else {
                word.push(c);
            }
        }
        if !word.is_empty() {
            out.push_str(&f(&word));
        }
        out
    })
}

/// Apply a CSL text-case to an HTML fragment.
pub fn apply_text_case(text: &str, case: TextCase, english: bool) -> String {
    let segments = split_segments(text);
    match case {
        TextCase::Lowercase => map_text(&segments, str::to_lowercase),
        TextCase::Uppercase => map_text(&segments, str::to_uppercase),
        TextCase::CapitalizeFirst => capitalize_first(&segments),
        TextCase::CapitalizeAll => capitalize_all(&segments),
        TextCase::Sentence => sentence_case(text),
        TextCase::Title if english => title_case(&segments),
        TextCase::Title => text.to_string(),
    }
}

/// Uppercase the first letter of `word`, leaving leading punctuation.
fn ucfirst(word: &str) -> String {
    match word.char_indices().find(|(_, c)| c.is_alphabetic()) {
        Some((i, c)) => {
            let mut result = String::with_capacity(word.len());
            result.push_str(&word[..i]);
            result.extend(c.to_uppercase());
            result.push_str(&word[i + c.len_utf8()..]);
            result
        }
        None => word.to_string(),
    }
}

fn capitalize_first(segments: &[Segment]) -> String {
    let mut done = false;
    let mut result = String::new();
    for segment in segments {
        match segment {
            Segment::Text(t) if !done && t.chars().any(char::is_alphabetic) => {
                result.push_str(&ucfirst(t));
                done = true;
            }
            Segment::Text(t) | Segment::Markup(t) => result.push_str(t),
            Segment::NoCase(t) => {
                done |= strip_html_tags(t).chars().any(char::is_alphabetic);
                result.push_str(t);
            }
        }
    }
    result
}

fn capitalize_all(segments: &[Segment]) -> String {
    map_words(segments, ucfirst)
}

/// Lowercase all-caps text first, then capitalize the first letter.
fn sentence_case(text: &str) -> String {
    let plain = strip_html_tags(text);
    let all_caps =
        plain.chars().any(char::is_alphabetic) && !plain.chars().any(char::is_lowercase);
    if all_caps {
        let lowered = map_text(&split_segments(text), str::to_lowercase);
        capitalize_first(&split_segments(&lowered))
    } else {
        capitalize_first(&split_segments(text))
    }
}

/// Capitalize lowercase words except stop words in the middle.
fn title_case(segments: &[Segment]) -> String {
    let total: usize = segments
        .iter()
        .map(|s| match s {
            Segment::Text(t) => t.split_whitespace().count(),
            _ => 0,
        })
        .sum();

    let mut index = 0;
    map_words(segments, |word| {
        let edge = index == 0 || index + 1 == total;
        index += 1;
        let is_lowercase = !word.chars().any(char::is_uppercase);
        if !is_lowercase {
            word.to_string()
        } else if !edge && STOP_WORDS.contains(&word) {
            word.to_string()
        } else {
            ucfirst(word)
        }
    })
}

fn strip_periods(text: &str) -> String {
    map_text(&split_segments(text), |t| t.replace('.', ""))
}

// ============================================================================
// Escaping and cleanup
// ============================================================================

/// Inline tags that CSL-JSON field values may carry.
const ALLOWED_TAGS: &[&str] = &[
    "<i>", "</i>", "<b>", "</b>", "<sup>", "</sup>", "<sub>", "</sub>", NOCASE_OPEN, "</span>",
];

/// Escape a field value for HTML output, keeping the permitted inline tags
/// and existing entities.
pub fn escape_html(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut i = 0;
    while i < value.len() {
        let rest = &value[i..];
        if let Some(tag) = ALLOWED_TAGS.iter().find(|tag| rest.starts_with(**tag)) {
            result.push_str(tag);
            i += tag.len();
            continue;
        }
        let Some(c) = rest.chars().next() else {
            break;
        };
        match c {
            '&' if entity_len(rest).is_some() => result.push('&'),
            '&' => result.push_str("&#38;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
        i += c.len_utf8();
    }
    result
}

/// Replace every `&` that does not start an entity with `&#38;`.
pub fn escape_ampersands(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for (i, c) in text.char_indices() {
        if c == '&' && entity_len(&text[i..]).is_none() {
            result.push_str("&#38;");
        } else {
            result.push(c);
        }
    }
    result
}

/// Straight apostrophes become typographic ones outside of tags.
pub fn clear_apostrophes(text: &str) -> String {
    map_text(&split_segments(text), |t| t.replace('\'', "\u{2019}"))
}

/// Strip HTML tags from a string.
pub fn strip_html_tags(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

/// Collapse exactly doubled `.` `,` `;` or `:`. Longer runs (an ellipsis)
/// stay as they are.
pub fn collapse_punctuation(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        if matches!(c, '.' | ',' | ';' | ':') && run == 2 {
            result.push(c);
        } else {
            result.extend(std::iter::repeat_n(c, run));
        }
        i += run;
    }
    result
}

// ============================================================================
// Joining
// ============================================================================

/// Join the non-empty outputs with a delimiter.
pub fn join_with_delimiter<S: AsRef<str>>(outputs: &[S], delimiter: &str) -> String {
    outputs
        .iter()
        .map(AsRef::as_ref)
        .filter(|o| !o.is_empty())
        .collect::<Vec<_>>()
        .join(delimiter)
}

/// Join group children. When the text so far already ends with the first
/// character of the delimiter, that character is not repeated.
pub fn join_group_parts<S: AsRef<str>>(parts: &[S], delimiter: &str) -> String {
    let mut result = String::new();
    for part in parts.iter().map(AsRef::as_ref).filter(|p| !p.is_empty()) {
        if !result.is_empty() {
            let visible = strip_html_tags(&result);
            match delimiter.chars().next() {
                Some(first) if visible.trim().ends_with(first) => {
                    result.push_str(&delimiter[first.len_utf8()..]);
                }
                _ => result.push_str(delimiter),
            }
        }
        result.push_str(part);
    }
    result
}
