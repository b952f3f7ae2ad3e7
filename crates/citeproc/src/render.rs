//! Element dispatch.
//!
//! Every style node renders to an HTML fragment. [`render_element`] matches
//! on the closed element enum, hands variable-bearing nodes to the name,
//! date, number and label engines, and applies the node's formatting.
//!
//! Group suppression works through [`VariableUse`] counters in the item
//! scratch: each variable reference records whether it produced output,
//! and a group whose variables all came out empty renders nothing.

use crate::constraint::{branch_matches, is_numeric};
use crate::context::{ItemScratch, Phase, RenderContext, VariableUse};
use crate::date::render_date;
use crate::label::{render_label, term_text};
use crate::names::render_names;
use crate::number::{format_number, format_page_range, to_decimal};
use crate::output::{
    clear_apostrophes, escape_html, join_group_parts, join_with_delimiter, render_with_formatting,
};
use crate::reference::Item;
use citeproc_style::{
    ChooseElement, DateElement, Element, ElementType, GroupElement, NumberElement, TermForm,
    TextSource, VariableForm,
};
use tracing::warn;

/// Variables whose values are page ranges.
const PAGE_VARIABLES: &[&str] = &["page", "chapter-number", "folio"];

const DEFAULT_PAGE_RANGE_DELIMITER: &str = "–";

/// Render elements in order and join the non-empty results.
pub fn render_elements(
    ctx: &RenderContext,
    item: &Item,
    scratch: &mut ItemScratch,
    elements: &[Element],
    delimiter: &str,
) -> String {
    let parts: Vec<String> = elements
        .iter()
        .map(|element| render_element(ctx, item, scratch, element))
        .collect();
    join_with_delimiter(&parts, delimiter)
}

/// Render one element with its formatting applied.
pub fn render_element(
    ctx: &RenderContext,
    item: &Item,
    scratch: &mut ItemScratch,
    element: &Element,
) -> String {
    let text = match &element.element_type {
        ElementType::Text(text) => render_text(ctx, item, scratch, &text.source),
        ElementType::Number(number) => render_number(ctx, item, scratch, number),
        ElementType::Label(label) => render_label(ctx, item, label),
        ElementType::Names(names) => {
            let output = render_names(ctx, item, scratch, names);
            scratch.vars.record(!output.is_empty());
            output
        }
        ElementType::Date(date) => render_date_variable(ctx, item, scratch, date),
        ElementType::Group(group) => render_group(ctx, item, scratch, group),
        ElementType::Choose(choose) => render_choose(ctx, item, scratch, choose),
    };
    render_with_formatting(&text, &element.formatting, ctx.quotes, ctx.is_english(item))
}

fn render_text(
    ctx: &RenderContext,
    item: &Item,
    scratch: &mut ItemScratch,
    source: &TextSource,
) -> String {
    match source {
        TextSource::Variable { name, form } => {
            let output = render_variable(ctx, item, scratch, name, *form);
            scratch.vars.record(!output.is_empty());
            output
        }
        TextSource::Macro { name, .. } => {
            let Some(definition) = ctx.style.macros.get(name) else {
                warn!(macro_name = %name, "undefined macro");
                return String::new();
            };
            let output = render_elements(ctx, item, scratch, &definition.elements, "");
            if !output.is_empty() {
                scratch.vars.rendered += 1;
            }
            output
        }
        TextSource::Term { name, form, plural } => term_text(ctx, name, *form, *plural),
        TextSource::Value { value } => value.clone(),
    }
}

/// The text of a `<text variable>`: escaped, page ranges reformatted,
/// markup extension applied.
fn render_variable(
    ctx: &RenderContext,
    item: &Item,
    scratch: &mut ItemScratch,
    name: &str,
    form: VariableForm,
) -> String {
    if scratch.is_consumed(name) {
        return String::new();
    }

    let value = match (name, form) {
        ("citation-number", _) => {
            let number = variable_text(ctx, item, name).unwrap_or_default();
            return ctx.apply_markup("citation-number", item, number);
        }
        (_, VariableForm::Short) => short_variable(item, name).or_else(|| variable_text(ctx, item, name)),
        _ => variable_text(ctx, item, name),
    };
    let Some(value) = value else {
        return String::new();
    };

    let mut text = clear_apostrophes(&escape_html(&value));
    if is_page_like(ctx, name) {
        let delimiter = ctx
            .locale
            .term("page-range-delimiter", TermForm::Long, false)
            .unwrap_or(DEFAULT_PAGE_RANGE_DELIMITER);
        text = format_page_range(&text, ctx.style.options.page_range_format, delimiter);
    }

    if ctx.phase == Phase::Substitution {
        scratch.consumed.insert(name.to_string());
    }
    ctx.apply_markup(name, item, text)
}

/// Page-like variables, and locators labelled as pages.
fn is_page_like(ctx: &RenderContext, name: &str) -> bool {
    match name {
        "locator" => ctx
            .citation_item
            .is_some_and(|c| PAGE_VARIABLES.contains(&c.label())),
        _ => PAGE_VARIABLES.contains(&name),
    }
}

/// `<variable>-short`, then the legacy camel-case `short<Variable>` field.
fn short_variable(item: &Item, name: &str) -> Option<String> {
    if let Some(value) = item.get_variable(&format!("{}-short", name)) {
        return Some(value);
    }
    if name == "container-title" {
        if let Some(value) = item.get_variable("journalAbbreviation") {
            return Some(value);
        }
    }
    let mut chars = name.chars();
    let first = chars.next()?;
    item.get_variable(&format!("short{}{}", first.to_uppercase(), chars.as_str()))
}

/// Raw text of a variable, including the cite-level `locator` and
/// `citation-number`.
pub fn variable_text(ctx: &RenderContext, item: &Item, name: &str) -> Option<String> {
    match name {
        "locator" => ctx
            .citation_item
            .and_then(|c| c.locator.clone())
            .filter(|l| !l.is_empty()),
        "citation-number" => (ctx.citation_number > 0).then(|| ctx.citation_number.to_string()),
        _ => item.get_variable(name),
    }
}

fn render_number(
    ctx: &RenderContext,
    item: &Item,
    scratch: &mut ItemScratch,
    element: &NumberElement,
) -> String {
    let value = if scratch.is_consumed(&element.variable) {
        None
    } else {
        variable_text(ctx, item, &element.variable)
    };

    let output = match value {
        Some(value) if is_numeric(&to_decimal(&value)) => {
            format_number(&value, element.form, ctx.locale)
        }
        Some(value) => clear_apostrophes(&escape_html(&value)),
        None => String::new(),
    };

    if !output.is_empty() && ctx.phase == Phase::Substitution {
        scratch.consumed.insert(element.variable.clone());
    }
    scratch.vars.record(!output.is_empty());
    output
}

fn render_date_variable(
    ctx: &RenderContext,
    item: &Item,
    scratch: &mut ItemScratch,
    element: &DateElement,
) -> String {
    let date = item
        .get_date(&element.variable)
        .filter(|_| !scratch.is_consumed(&element.variable));

    let output = match date {
        Some(date) => {
            let text = render_date(ctx, date, element, ctx.is_english(item));
            ctx.apply_markup(&element.variable, item, text)
        }
        None => String::new(),
    };

    if !output.is_empty() && ctx.phase == Phase::Substitution {
        scratch.consumed.insert(element.variable.clone());
    }
    scratch.vars.record(!output.is_empty());
    output
}

/// A group renders only when at least one of its variables did, or when it
/// has no variables at all.
fn render_group(
    ctx: &RenderContext,
    item: &Item,
    scratch: &mut ItemScratch,
    group: &GroupElement,
) -> String {
    let outer = std::mem::take(&mut scratch.vars);
    let parts: Vec<String> = group
        .elements
        .iter()
        .map(|element| render_element(ctx, item, scratch, element))
        .collect();
    let inner: VariableUse = std::mem::replace(&mut scratch.vars, outer);

    let text = join_group_parts(&parts, group.delimiter.as_deref().unwrap_or_default());
    let suppressed = inner.called > 0 && inner.rendered == 0;

    if inner.called > 0 {
        scratch.vars.record(!suppressed && !text.is_empty());
    }
    if suppressed { String::new() } else { text }
}

fn render_choose(
    ctx: &RenderContext,
    item: &Item,
    scratch: &mut ItemScratch,
    choose: &ChooseElement,
) -> String {
    choose
        .branches
        .iter()
        .find(|branch| branch_matches(ctx, item, scratch, branch))
        .map(|branch| render_elements(ctx, item, scratch, &branch.elements, ""))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CitationItem, RenderMode};
    use crate::test_support::{Fixture, item, style_xml};
    use serde_json::json;

    #[test]
    fn test_text_value_and_term() {
        let fixture = Fixture::citation(r#"<text value="Hello"/><text term="and" prefix=" "/>"#);
        assert_eq!(fixture.render(json!({"id": "a"})), "Hello and");
    }

    #[test]
    fn test_variable_is_escaped() {
        let fixture = Fixture::citation(r#"<text variable="title"/>"#);
        assert_eq!(
            fixture.render(json!({"id": "a", "title": "Cats & Dogs <i>in</i> Rome's <script>"})),
            "Cats &#38; Dogs <i>in</i> Rome’s &lt;script&gt;"
        );
    }

    #[test]
    fn test_short_form_fallbacks() {
        let fixture = Fixture::citation(r#"<text variable="title" form="short"/>"#);
        assert_eq!(
            fixture.render(json!({"id": "a", "title": "Long Title", "title-short": "Short"})),
            "Short"
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "title": "Long Title", "shortTitle": "Legacy"})),
            "Legacy"
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "title": "Long Title"})),
            "Long Title"
        );
    }

    #[test]
    fn test_page_range_uses_en_dash() {
        let fixture = Fixture::citation(r#"<text variable="page"/>"#);
        assert_eq!(fixture.render(json!({"id": "a", "page": "12-15"})), "12–15");
    }

    #[test]
    fn test_page_range_format() {
        let xml = style_xml("", r#"<text variable="page"/>"#, None).replace(
            r#"version="1.0">"#,
            r#"version="1.0" page-range-format="minimal">"#,
        );
        let fixture = Fixture::new(&xml);
        assert_eq!(fixture.render(json!({"id": "a", "page": "321-328"})), "321–8");
    }

    #[test]
    fn test_locator_with_page_label() {
        let fixture = Fixture::citation(r#"<text variable="locator"/>"#);
        let it = item(json!({"id": "a"}));
        let mut scratch = ItemScratch::default();

        let page = CitationItem::new("a").with_locator("3-5");
        let ctx = fixture
            .ctx(RenderMode::Citation)
            .with_citation_item(Some(&page));
        assert_eq!(
            render_elements(&ctx, &it, &mut scratch, &fixture.style.citation.elements, ""),
            "3–5"
        );

        let section = CitationItem::new("a").with_locator("3-5").with_label("section");
        let ctx = fixture
            .ctx(RenderMode::Citation)
            .with_citation_item(Some(&section));
        assert_eq!(
            render_elements(&ctx, &it, &mut scratch, &fixture.style.citation.elements, ""),
            "3-5"
        );
    }

    #[test]
    fn test_citation_number() {
        let fixture = Fixture::citation(r#"<text variable="citation-number" prefix="[" suffix="]"/>"#);
        assert_eq!(fixture.render(json!({"id": "a"})), "[1]");
    }

    #[test]
    fn test_number_element() {
        let fixture = Fixture::citation(
            r#"<number variable="edition" form="ordinal"/><number variable="volume" form="roman" prefix=" "/><number variable="issue" prefix=" "/>"#,
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "edition": 2, "volume": "4", "issue": "Spring"})),
            "2nd iv Spring"
        );
    }

    #[test]
    fn test_number_element_reads_roman_input() {
        let fixture = Fixture::citation(
            r#"<number variable="volume" form="numeric"/><number variable="issue" form="ordinal" prefix="|"/>"#,
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "volume": "xiv", "issue": "iv-vii"})),
            "14|4th-7th"
        );
    }

    #[test]
    fn test_macro_and_missing_macro() {
        let xml = style_xml(
            r#"<macro name="title"><text variable="title" font-style="italic"/></macro>"#,
            r#"<text macro="title"/><text macro="nope"/>"#,
            None,
        );
        let fixture = Fixture::new(&xml);
        assert_eq!(fixture.render(json!({"id": "a", "title": "T"})), "<i>T</i>");
    }

    #[test]
    fn test_group_suppressed_when_variables_empty() {
        let fixture = Fixture::citation(
            r#"<group delimiter=" "><text term="in"/><text variable="container-title"/></group>"#,
        );
        assert_eq!(fixture.render(json!({"id": "a"})), "");
        assert_eq!(
            fixture.render(json!({"id": "a", "container-title": "Nature"})),
            "in Nature"
        );
    }

    #[test]
    fn test_group_of_terms_renders() {
        let fixture = Fixture::citation(r#"<group delimiter=" "><text value="a"/><text value="b"/></group>"#);
        assert_eq!(fixture.render(json!({"id": "a"})), "a b");
    }

    #[test]
    fn test_nested_suppressed_group_suppresses_parent() {
        let fixture = Fixture::citation(
            r#"<group delimiter=", "><text value="vol."/><group><text variable="volume"/></group></group>"#,
        );
        assert_eq!(fixture.render(json!({"id": "a"})), "");
        assert_eq!(fixture.render(json!({"id": "a", "volume": "3"})), "vol., 3");
    }

    #[test]
    fn test_macro_with_term_counts_as_rendered() {
        let xml = style_xml(
            r#"<macro name="date"><choose><if variable="issued"><date variable="issued" form="text" date-parts="year"/></if><else><text term="no date" form="short"/></else></choose></macro>"#,
            r#"<group delimiter=" "><names variable="author"/><text macro="date"/></group>"#,
            None,
        );
        let fixture = Fixture::new(&xml);
        assert_eq!(fixture.render(json!({"id": "a"})), "n.d.");
    }

    #[test]
    fn test_group_delimiter_not_doubled() {
        let fixture = Fixture::citation(
            r#"<group delimiter=". "><text variable="title"/><text variable="publisher"/></group>"#,
        );
        assert_eq!(
            fixture.render(json!({"id": "a", "title": "Who?.", "publisher": "Acme"})),
            "Who?. Acme"
        );
    }

    #[test]
    fn test_choose_renders_first_match_only() {
        let fixture = Fixture::citation(
            r#"<choose>
                 <if type="book"><text value="one"/></if>
                 <else-if variable="title"><text value="two"/></else-if>
                 <else><text value="three"/></else>
               </choose>"#,
        );
        assert_eq!(fixture.render(json!({"id": "a", "type": "book", "title": "T"})), "one");
        assert_eq!(fixture.render(json!({"id": "a", "title": "T"})), "two");
        assert_eq!(fixture.render(json!({"id": "a"})), "three");
    }

    #[test]
    fn test_quotes_and_text_case() {
        let fixture = Fixture::citation(r#"<text variable="title" quotes="true" text-case="title"/>"#);
        assert_eq!(
            fixture.render(json!({"id": "a", "title": "the art of war"})),
            "“The Art of War”"
        );
    }

    #[test]
    fn test_title_case_only_for_english() {
        let fixture = Fixture::citation(r#"<text variable="title" text-case="title"/>"#);
        assert_eq!(
            fixture.render(json!({"id": "a", "title": "la guerre", "language": "fr"})),
            "la guerre"
        );
    }

    #[test]
    fn test_markup_extension() {
        let mut fixture = Fixture::citation(r#"<text variable="title"/>"#);
        fixture.markup.insert(
            "title".to_string(),
            Box::new(|item: &Item, text: &str| format!("<a href=\"#{}\">{}</a>", item.id, text)),
        );
        assert_eq!(
            fixture.render(json!({"id": "x1", "title": "T"})),
            "<a href=\"#x1\">T</a>"
        );
    }
}
