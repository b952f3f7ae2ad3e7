//! Date rendering: single dates, date ranges and the raw-string fallback.

use crate::context::RenderContext;
use crate::number::ordinal;
use crate::output::{apply_affixes, escape_html, join_with_delimiter, render_with_formatting};
use crate::reference::{DateParts, DateVariable};
use citeproc_style::{
    DateElement, DateForm, DatePart, DatePartForm, DatePartName, Formatting, TermForm,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Range bitmask bits.
const RANGE_YEAR: u8 = 4;
const RANGE_MONTH: u8 = 2;
const RANGE_DAY: u8 = 1;
const RANGE_MONTH_DAY: u8 = RANGE_MONTH | RANGE_DAY;

const DEFAULT_RANGE_DELIMITER: &str = "–";

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?[0-9]{1,4})(?:-([0-9]{1,2})(?:-([0-9]{1,2}))?)?$").unwrap());

static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+)\.?\s+(-?[0-9]{1,4})$").unwrap());

const MONTH_NAMES: &[&str] = &[
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Start and optional end of a date, parsing `raw` when there are no
/// date-parts.
pub fn resolve_dates(date: &DateVariable) -> Option<(DateParts, Option<DateParts>)> {
    if let Some(start) = date.parts() {
        return Some((start, date.end_parts()));
    }
    let raw = date.raw.as_deref()?;
    let parsed = parse_raw_date(raw)?;
    let mut start = DateParts::from_slice(parsed.first()?);
    if start.month.is_none() {
        start.month = date.season.map(|s| 20 + s);
    }
    let end = parsed.get(1).map(|p| DateParts::from_slice(p));
    Some((start, end))
}

/// Parse `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, `Month YYYY`, or two of them
/// separated by `/`.
pub fn parse_raw_date(raw: &str) -> Option<Vec<Vec<i32>>> {
    let pieces: Vec<&str> = raw.split('/').map(str::trim).collect();
    if pieces.len() > 2 || pieces.iter().any(|p| p.is_empty()) {
        return None;
    }
    pieces.into_iter().map(parse_single_date).collect()
}

fn parse_single_date(s: &str) -> Option<Vec<i32>> {
    if let Some(caps) = ISO_DATE.captures(s) {
        let mut parts = vec![caps[1].parse().ok()?];
        if let Some(month) = caps.get(2) {
            let month: i32 = month.as_str().parse().ok()?;
            if !(1..=12).contains(&month) {
                return None;
            }
            parts.push(month);
        }
        if let Some(day) = caps.get(3) {
            let day: i32 = day.as_str().parse().ok()?;
            if !(1..=31).contains(&day) {
                return None;
            }
            parts.push(day);
        }
        return Some(parts);
    }

    let caps = MONTH_YEAR.captures(s)?;
    let name = caps[1].to_lowercase();
    let month = MONTH_NAMES
        .iter()
        .position(|m| *m == name || (name.len() >= 3 && m.starts_with(name.as_str())))?;
    Some(vec![caps[2].parse().ok()?, month as i32 + 1])
}

/// A date part with locale settings and element overrides applied.
struct ResolvedPart<'a> {
    name: DatePartName,
    form: Option<DatePartForm>,
    formatting: Formatting,
    range_delimiter: Option<&'a str>,
}

impl<'a> ResolvedPart<'a> {
    fn inline(part: &'a DatePart) -> Self {
        Self {
            name: part.name,
            form: part.form,
            formatting: part.formatting.clone(),
            range_delimiter: part.range_delimiter.as_deref(),
        }
    }

    /// A locale part with the element's own `<date-part>` applied. The
    /// locale keeps control of the affixes.
    fn localized(part: &'a DatePart, local: Option<&'a DatePart>) -> Self {
        let Some(local) = local else {
            return Self::inline(part);
        };
        let own = local.formatting.without_affixes();
        let formatting = if own.is_empty() {
            part.formatting.clone()
        } else {
            Formatting {
                prefix: part.formatting.prefix.clone(),
                suffix: part.formatting.suffix.clone(),
                ..own
            }
        };
        Self {
            name: part.name,
            form: local.form.or(part.form),
            formatting,
            range_delimiter: local
                .range_delimiter
                .as_deref()
                .or(part.range_delimiter.as_deref()),
        }
    }

    fn value(&self, date: &DateParts) -> Option<i32> {
        match self.name {
            DatePartName::Year => date.year,
            DatePartName::Month => date.month,
            DatePartName::Day => date.day,
        }
    }
}

/// The parts to render, in order.
fn resolve_parts<'a>(ctx: &RenderContext<'a>, element: &'a DateElement) -> Vec<ResolvedPart<'a>> {
    let localized = element.form.or(element.parts.is_empty().then_some(DateForm::Text));
    let Some(form) = localized else {
        return element.parts.iter().map(ResolvedPart::inline).collect();
    };

    let Some(format) = ctx.locale.date_format(form) else {
        debug!(?form, "locale has no date format");
        return Vec::new();
    };

    format
        .parts
        .iter()
        .filter(|part| element.date_parts.includes(part.name))
        .map(|part| {
            let local = element.parts.iter().find(|p| p.name == part.name);
            ResolvedPart::localized(part, local)
        })
        .collect()
}

/// Render a date variable. Formatting of the `<date>` element itself is
/// left to the caller.
pub fn render_date(ctx: &RenderContext, date: &DateVariable, element: &DateElement, english: bool) -> String {
    if let Some(literal) = date.literal.as_deref().filter(|l| !l.is_empty()) {
        return escape_html(literal);
    }

    let Some((start, end)) = resolve_dates(date) else {
        debug!(variable = %element.variable, "date has no usable parts");
        return date.raw.as_deref().map(escape_html).unwrap_or_default();
    };

    let parts = resolve_parts(ctx, element);
    if parts.is_empty() {
        return String::new();
    }

    let renderer = DateRenderer {
        ctx,
        parts: &parts,
        glue: glue(ctx, element, &parts),
        english,
    };

    match end {
        Some(end) => renderer.render_range(&start, &end),
        None => renderer.render_single(&start),
    }
}

/// Parts join directly when any of them carries affixes.
fn glue(ctx: &RenderContext, element: &DateElement, parts: &[ResolvedPart]) -> String {
    if parts.iter().any(|p| p.formatting.has_affixes()) {
        return String::new();
    }
    element
        .delimiter
        .clone()
        .or_else(|| {
            element
                .form
                .and_then(|form| ctx.locale.date_format(form))
                .and_then(|f| f.delimiter.clone())
        })
        .unwrap_or_else(|| " ".to_string())
}

struct DateRenderer<'r, 'a> {
    ctx: &'r RenderContext<'a>,
    parts: &'r [ResolvedPart<'a>],
    glue: String,
    english: bool,
}

impl DateRenderer<'_, '_> {
    fn render_single(&self, date: &DateParts) -> String {
        let rendered: Vec<String> = self
            .parts
            .iter()
            .map(|p| self.render_part(p, date, true, true))
            .collect();
        join_with_delimiter(&rendered, &self.glue).trim().to_string()
    }

    fn render_range(&self, from: &DateParts, to: &DateParts) -> String {
        let differs = |name: DatePartName| {
            self.parts.iter().any(|p| {
                p.name == name && p.value(to).is_some() && p.value(from) != p.value(to)
            })
        };

        let mut state = 0u8;
        if differs(DatePartName::Year) {
            state |= RANGE_YEAR;
        }
        if differs(DatePartName::Month) {
            state |= RANGE_MONTH;
        }
        if differs(DatePartName::Day) {
            state |= RANGE_DAY;
        }

        if state == 0 {
            return self.render_single(from);
        }

        let ranged = |name: DatePartName| match state {
            RANGE_DAY => name == DatePartName::Day,
            RANGE_MONTH | RANGE_MONTH_DAY => name != DatePartName::Year,
            _ => true,
        };

        let largest = if state & RANGE_YEAR != 0 {
            DatePartName::Year
        } else if state & RANGE_MONTH != 0 {
            DatePartName::Month
        } else {
            DatePartName::Day
        };
        let delimiter = self
            .parts
            .iter()
            .find(|p| p.name == largest)
            .and_then(|p| p.range_delimiter)
            .unwrap_or(DEFAULT_RANGE_DELIMITER);

        let in_block =
            |p: &ResolvedPart| ranged(p.name) && (p.value(from).is_some() || p.value(to).is_some());
        let (Some(first), Some(last)) = (
            self.parts.iter().position(in_block),
            self.parts.iter().rposition(in_block),
        ) else {
            return self.render_single(from);
        };

        let block = &self.parts[first..=last];
        let from_text = self.render_block(block, from, true);
        let to_text = self.render_block(block, to, false);

        let mut pieces: Vec<String> = Vec::new();
        pieces.extend(self.parts[..first].iter().map(|p| self.render_part(p, from, true, true)));
        pieces.push(format!("{}{}{}", from_text, delimiter, to_text));
        pieces.extend(
            self.parts[last + 1..]
                .iter()
                .map(|p| self.render_part(p, from, true, true)),
        );
        join_with_delimiter(&pieces, &self.glue).trim().to_string()
    }

    /// The from side drops the suffix of its last part, the to side the
    /// prefix of its first part.
    fn render_block(&self, block: &[ResolvedPart], date: &DateParts, is_from: bool) -> String {
        let present: Vec<&ResolvedPart> = block.iter().filter(|p| p.value(date).is_some()).collect();
        let count = present.len();
        let rendered: Vec<String> = present
            .into_iter()
            .enumerate()
            .map(|(i, p)| {
                let keep_prefix = is_from || i > 0;
                let keep_suffix = !is_from || i + 1 < count;
                self.render_part(p, date, keep_prefix, keep_suffix)
            })
            .collect();
        join_with_delimiter(&rendered, &self.glue)
    }

    fn render_part(&self, resolved: &ResolvedPart, date: &DateParts, prefix: bool, suffix: bool) -> String {
        let text = match resolved.name {
            DatePartName::Year => date.year.map(|y| self.render_year(y, resolved.form)),
            DatePartName::Month => date.month.and_then(|m| self.render_month(m, resolved.form)),
            DatePartName::Day => date.day.and_then(|d| self.render_day(d, resolved.form)),
        };
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return String::new();
        };

        let formatting = &resolved.formatting;
        let styled = render_with_formatting(
            &text,
            &formatting.without_affixes(),
            self.ctx.quotes,
            self.english,
        );
        apply_affixes(
            &styled,
            if prefix { formatting.prefix.as_deref().unwrap_or_default() } else { "" },
            if suffix { formatting.suffix.as_deref().unwrap_or_default() } else { "" },
            self.ctx.quotes,
        )
    }

    fn render_year(&self, year: i32, form: Option<DatePartForm>) -> String {
        if form == Some(DatePartForm::Short) {
            return format!("{:02}", year.rem_euclid(100));
        }
        let term = |name: &str| self.ctx.locale.term(name, TermForm::Long, false).unwrap_or_default();
        if year < 0 {
            format!("{}{}", year.unsigned_abs(), term("bc"))
        } else if year > 0 && year < 1000 {
            format!("{}{}", year, term("ad"))
        } else {
            year.to_string()
        }
    }

    fn render_month(&self, month: i32, form: Option<DatePartForm>) -> Option<String> {
        let season = match month {
            13..=16 => Some(month - 12),
            21..=24 => Some(month - 20),
            _ => None,
        };
        if let Some(season) = season {
            return self
                .ctx
                .locale
                .term(&format!("season-{:02}", season), TermForm::Long, false)
                .map(str::to_string);
        }
        if !(1..=12).contains(&month) {
            return None;
        }

        match form {
            Some(DatePartForm::Numeric) => Some(month.to_string()),
            Some(DatePartForm::NumericLeadingZeros) => Some(format!("{:02}", month)),
            Some(DatePartForm::Short) => self.month_term(month, TermForm::Short),
            _ => self.month_term(month, TermForm::Long),
        }
    }

    fn month_term(&self, month: i32, form: TermForm) -> Option<String> {
        self.ctx
            .locale
            .term(&format!("month-{:02}", month), form, false)
            .map(str::to_string)
    }

    fn render_day(&self, day: i32, form: Option<DatePartForm>) -> Option<String> {
        if !(1..=31).contains(&day) {
            return None;
        }
        Some(match form {
            Some(DatePartForm::NumericLeadingZeros) => format!("{:02}", day),
            Some(DatePartForm::Ordinal) => {
                let limited = self
                    .ctx
                    .locale
                    .options()
                    .limit_day_ordinals_to_day_1
                    .unwrap_or(false);
                if limited && self.ctx.cited_counter > 1 {
                    day.to_string()
                } else {
                    ordinal(day.unsigned_abs().into(), self.ctx.locale)
                }
            }
            _ => day.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;
    use serde_json::json;

    #[test]
    fn test_parse_raw_date() {
        assert_eq!(parse_raw_date("2020"), Some(vec![vec![2020]]));
        assert_eq!(parse_raw_date("2020-03"), Some(vec![vec![2020, 3]]));
        assert_eq!(parse_raw_date("2020-03-15"), Some(vec![vec![2020, 3, 15]]));
        assert_eq!(
            parse_raw_date("2019/2020-02"),
            Some(vec![vec![2019], vec![2020, 2]])
        );
        assert_eq!(parse_raw_date("March 2021"), Some(vec![vec![2021, 3]]));
        assert_eq!(parse_raw_date("Sept. 1999"), Some(vec![vec![1999, 9]]));
        assert_eq!(parse_raw_date("2020-13"), None);
        assert_eq!(parse_raw_date("Spring of last year"), None);
    }

    fn date_style(date: &str) -> Fixture {
        Fixture::citation(date)
    }

    #[test]
    fn test_text_date() {
        let fixture = date_style(r#"<date variable="issued" form="text"/>"#);
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[2020, 3, 15]]}})),
            "March 15, 2020"
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[2020, 3]]}})),
            "March 2020"
        );
    }

    #[test]
    fn test_numeric_date() {
        let fixture = date_style(r#"<date variable="issued" form="numeric"/>"#);
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[2020, 3, 5]]}})),
            "03/05/2020"
        );
    }

    #[test]
    fn test_date_parts_attribute_filters() {
        let fixture = date_style(r#"<date variable="issued" form="text" date-parts="year"/>"#);
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[2020, 3, 15]]}})),
            "2020"
        );
    }

    #[test]
    fn test_localized_date_part_override() {
        let fixture = date_style(
            r#"<date variable="issued" form="text"><date-part name="month" form="short"/></date>"#,
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[2020, 1, 2]]}})),
            "Jan. 2, 2020"
        );
    }

    #[test]
    fn test_explicit_parts_without_affixes_join_with_space() {
        let fixture = date_style(
            r#"<date variable="issued"><date-part name="day"/><date-part name="month"/><date-part name="year"/></date>"#,
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[1999, 12, 31]]}})),
            "31 December 1999"
        );
    }

    #[test]
    fn test_year_forms_and_eras() {
        let fixture = date_style(
            r#"<date variable="issued"><date-part name="year"/></date>
               <date variable="accessed" prefix=" "><date-part name="year" form="short"/></date>"#,
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[-50]]}})),
            "50BC"
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[800]]}})),
            "800AD"
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[1999]]}, "accessed": {"date-parts": [[2005]]}})),
            "1999 05"
        );
    }

    #[test]
    fn test_seasons() {
        let fixture = date_style(r#"<date variable="issued" form="text"/>"#);
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[2020, 14]]}})),
            "Summer 2020"
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[2020]], "season": 3}})),
            "Autumn 2020"
        );
    }

    #[test]
    fn test_day_ordinal() {
        let fixture = date_style(
            r#"<date variable="issued"><date-part name="day" form="ordinal" suffix=" "/><date-part name="month"/></date>"#,
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[2020, 5, 2]]}})),
            "2nd May"
        );
    }

    #[test]
    fn test_identical_range_renders_single_date() {
        let fixture = date_style(r#"<date variable="issued" form="text"/>"#);
        let single = fixture.render(json!({"id": "a", "issued": {"date-parts": [[2020, 3, 15]]}}));
        let range = fixture.render(
            json!({"id": "a", "issued": {"date-parts": [[2020, 3, 15], [2020, 3, 15]]}}),
        );
        assert_eq!(single, range);
    }

    #[test]
    fn test_day_range() {
        let fixture = date_style(r#"<date variable="issued" form="text"/>"#);
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[2020, 3, 3], [2020, 3, 5]]}})),
            "March 3–5, 2020"
        );
    }

    #[test]
    fn test_month_range() {
        let fixture = date_style(r#"<date variable="issued" form="text"/>"#);
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[2020, 3, 3], [2020, 4, 5]]}})),
            "March 3–April 5, 2020"
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[2020, 3], [2020, 4]]}})),
            "March–April 2020"
        );
    }

    #[test]
    fn test_year_range_uses_year_delimiter() {
        let fixture = date_style(
            r#"<date variable="issued"><date-part name="month" suffix=" "/><date-part name="year" range-delimiter="/"/></date>"#,
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[2019, 11], [2020, 2]]}})),
            "November 2019/February 2020"
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"date-parts": [[2019], [2020]]}})),
            "2019/2020"
        );
    }

    #[test]
    fn test_raw_and_literal_fallbacks() {
        let fixture = date_style(r#"<date variable="issued" form="text"/>"#);
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"raw": "2021-06-01"}})),
            "June 1, 2021"
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": "circa spring 1820"})),
            "circa spring 1820"
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "issued": {"literal": "Michaelmas Term, 1710"}})),
            "Michaelmas Term, 1710"
        );
        assert_eq!(fixture.render(json!({"id": "a"})), "");
    }
}
