//! Bibliography and citation assembly.
//!
//! The layout is the root of a render: it picks the items, sorts them when
//! the layout has a `<sort>`, renders each item through the layout's
//! children and joins the results.

use crate::context::{CiteHistory, CitationItem, ItemScratch, RenderContext};
use crate::output::{
    apply_affixes, collapse_punctuation, escape_ampersands, join_with_delimiter,
    render_with_formatting,
};
use crate::reference::Item;
use crate::render::{render_element, render_elements};
use crate::sort::sort_items;
use citeproc_style::Layout;
use tracing::{debug, warn};

/// Rendered layout text and the number of items that went into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutOutput {
    pub text: String,
    pub items: usize,
}

/// Render the bibliography for all `items`.
///
/// `ctx.cited_counter` is the counter value of the first entry; each
/// following entry counts one further.
pub fn render_bibliography(ctx: &RenderContext, items: &[Item]) -> LayoutOutput {
    let layout = ctx.layout;
    let ordered = ordered_items(ctx, layout, items.iter().enumerate().collect());

    let mut previous_names: Option<Vec<String>> = None;
    let mut entries = Vec::with_capacity(ordered.len());
    for (n, (index, item)) in ordered.iter().enumerate() {
        let item_ctx = ctx
            .with_citation_number(index + 1)
            .with_cited_counter(ctx.cited_counter + n);
        let mut scratch = ItemScratch::new(previous_names.take());

        let entry = render_bibliography_entry(&item_ctx, item, &mut scratch, layout);
        previous_names = scratch.first_names;

        let entry = item_ctx.apply_markup("csl-entry", item, entry);
        entries.push(format!("\n  <div class=\"csl-entry\">{}</div>", entry));
    }

    LayoutOutput {
        text: format!(
            "<div class=\"csl-bib-body\">{}\n</div>",
            entries.join(layout.delimiter.as_deref().unwrap_or_default())
        ),
        items: ordered.len(),
    }
}

fn render_bibliography_entry(
    ctx: &RenderContext,
    item: &Item,
    scratch: &mut ItemScratch,
    layout: &Layout,
) -> String {
    let prefix = layout.formatting.prefix.as_deref().unwrap_or_default();
    let suffix = layout.formatting.suffix.as_deref().unwrap_or_default();

    if layout.second_field_align.is_some()
        && let Some((first, rest)) = layout.elements.split_first()
    {
        let left = render_element(ctx, item, scratch, first);
        let right = render_elements(ctx, item, scratch, rest, "");
        if !left.is_empty() && !right.is_empty() {
            let formatting = layout.formatting.without_affixes();
            let english = ctx.is_english(item);
            let left = finish(&render_with_formatting(
                &left,
                &formatting,
                ctx.quotes,
                english,
            ));
            let right = finish(&apply_affixes(
                &render_with_formatting(&right, &formatting, ctx.quotes, english),
                "",
                suffix,
                ctx.quotes,
            ));
            return format!(
                "{}<div class=\"csl-left-margin\">{}</div><div class=\"csl-right-inline\">{}</div>",
                prefix,
                left.trim(),
                right.trim()
            );
        }
        let joined = join_with_delimiter(&[left, right], "");
        return affixed_entry(ctx, item, layout, &joined, prefix, suffix);
    }

    let text = render_elements(ctx, item, scratch, &layout.elements, "");
    affixed_entry(ctx, item, layout, &text, prefix, suffix)
}

fn affixed_entry(
    ctx: &RenderContext,
    item: &Item,
    layout: &Layout,
    text: &str,
    prefix: &str,
    suffix: &str,
) -> String {
    let single = render_single(ctx, item, layout, text);
    apply_affixes(&single, prefix, suffix, ctx.quotes)
}

/// Render the citation for `cites`, or for every item when `cites` is
/// `None`. Each rendered cite is appended to `history`.
pub fn render_citation(
    ctx: &RenderContext,
    items: &[Item],
    cites: Option<&[CitationItem]>,
    history: &mut CiteHistory,
) -> LayoutOutput {
    let layout = ctx.layout;

    let selected: Vec<(usize, &Item)> = match cites {
        Some(cites) => {
            for cite in cites {
                if !items.iter().any(|item| item.id == cite.id) {
                    warn!(id = %cite.id, "cited item not found in item data");
                }
            }
            items
                .iter()
                .enumerate()
                .filter(|(_, item)| cites.iter().any(|c| c.id == item.id))
                .collect()
        }
        None => items.iter().enumerate().collect(),
    };
    let ordered = ordered_items(ctx, layout, selected);

    let mut rendered = Vec::with_capacity(ordered.len());
    for (n, (index, item)) in ordered.iter().enumerate() {
        let cite = cites.and_then(|cites| cites.iter().find(|c| c.id == item.id));
        let text = {
            let item_ctx = ctx
                .with_cited_items(history)
                .with_citation_items(cites.unwrap_or_default())
                .with_citation_item(cite)
                .with_citation_number(index + 1)
                .with_cited_counter(ctx.cited_counter + n);
            let mut scratch = ItemScratch::default();
            let text = render_elements(&item_ctx, item, &mut scratch, &layout.elements, "");
            let text = render_single(&item_ctx, item, layout, &text);
            item_ctx.apply_markup("csl-entry", item, text)
        };
        history.append_cited_item(&item.id, cite.and_then(|c| c.locator.as_deref()));
        rendered.push(text);
    }

    debug!(items = ordered.len(), "rendered citation");
    let joined = join_with_delimiter(&rendered, layout.delimiter.as_deref().unwrap_or_default());
    LayoutOutput {
        text: apply_affixes(
            &joined,
            layout.formatting.prefix.as_deref().unwrap_or_default(),
            layout.formatting.suffix.as_deref().unwrap_or_default(),
            ctx.quotes,
        ),
        items: ordered.len(),
    }
}

fn ordered_items<'i>(
    ctx: &RenderContext,
    layout: &Layout,
    items: Vec<(usize, &'i Item)>,
) -> Vec<(usize, &'i Item)> {
    match &layout.sort {
        Some(sort) => sort_items(ctx, sort, items),
        None => items,
    }
}

/// Apply the layout's formatting, without its affixes, to one item's
/// output.
fn render_single(ctx: &RenderContext, item: &Item, layout: &Layout, text: &str) -> String {
    let formatted = render_with_formatting(
        text,
        &layout.formatting.without_affixes(),
        ctx.quotes,
        ctx.is_english(item),
    );
    finish(&formatted)
}

fn finish(text: &str) -> String {
    collapse_punctuation(&escape_ampersands(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RenderMode;
    use crate::test_support::{Fixture, item, style_xml};
    use serde_json::json;

    fn items(values: serde_json::Value) -> Vec<Item> {
        serde_json::from_value(values).unwrap()
    }

    fn bibliography(fixture: &Fixture, data: serde_json::Value) -> String {
        let ctx = fixture.ctx(RenderMode::Bibliography);
        render_bibliography(&ctx, &items(data)).text
    }

    #[test]
    fn test_bibliography_wrapping() {
        let fixture = Fixture::new(&style_xml(
            "",
            r#"<text variable="title"/>"#,
            Some(r#"<text variable="title"/>"#),
        ));
        assert_eq!(
            bibliography(&fixture, json!([{"id": "a", "title": "One"}, {"id": "b", "title": "Two"}])),
            "<div class=\"csl-bib-body\">\n  <div class=\"csl-entry\">One</div>\n  <div class=\"csl-entry\">Two</div>\n</div>"
        );
    }

    #[test]
    fn test_bibliography_layout_affixes_per_entry() {
        let xml = style_xml("", r#"<text variable="title"/>"#, None).replace(
            "</style>",
            r#"<bibliography><layout suffix="." font-style="italic"><text variable="title"/></layout></bibliography></style>"#,
        );
        let fixture = Fixture::new(&xml);
        assert_eq!(
            bibliography(&fixture, json!([{"id": "a", "title": "One"}])),
            "<div class=\"csl-bib-body\">\n  <div class=\"csl-entry\"><i>One</i>.</div>\n</div>"
        );
    }

    #[test]
    fn test_second_field_align() {
        let xml = style_xml("", r#"<text variable="title"/>"#, None).replace(
            "</style>",
            r#"<bibliography second-field-align="flush"><layout suffix="."><text variable="citation-number" prefix="[" suffix="] "/><text variable="title"/></layout></bibliography></style>"#,
        );
        let fixture = Fixture::new(&xml);
        assert_eq!(
            bibliography(&fixture, json!([{"id": "a", "title": "One"}])),
            "<div class=\"csl-bib-body\">\n  <div class=\"csl-entry\"><div class=\"csl-left-margin\">[1]</div><div class=\"csl-right-inline\">One.</div></div>\n</div>"
        );
    }

    #[test]
    fn test_bibliography_escapes_ampersands_and_collapses_punctuation() {
        let xml = style_xml("", r#"<text variable="title"/>"#, None).replace(
            "</style>",
            r#"<bibliography><layout suffix="."><text variable="title" suffix="."/><text value="R&amp;D" prefix=" "/></layout></bibliography></style>"#,
        );
        let fixture = Fixture::new(&xml);
        assert_eq!(
            bibliography(&fixture, json!([{"id": "a", "title": "Notes."}])),
            "<div class=\"csl-bib-body\">\n  <div class=\"csl-entry\">Notes. R&#38;D.</div>\n</div>"
        );
    }

    #[test]
    fn test_citation_follows_item_order_and_numbers() {
        let xml = style_xml(
            "",
            r#"<text variable="citation-number"/>"#,
            None,
        )
        .replace("<citation>", r#"<citation><sort><key variable="title" sort="descending"/></sort>"#)
        .replace("<layout>", r#"<layout delimiter="," prefix="[" suffix="]">"#);
        let fixture = Fixture::new(&xml);
        let data = items(json!([
            {"id": "a", "title": "Alpha"},
            {"id": "b", "title": "Beta"},
            {"id": "c", "title": "Gamma"}
        ]));
        let cites = vec![CitationItem::new("c"), CitationItem::new("a")];
        let mut history = CiteHistory::new();
        let ctx = fixture.ctx(RenderMode::Citation);
        let output = render_citation(&ctx, &data, Some(&cites), &mut history);
        assert_eq!(output.text, "[3,1]");
        assert_eq!(output.items, 2);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_citation_skips_unknown_ids() {
        let fixture = Fixture::citation(r#"<text variable="title"/>"#);
        let data = vec![item(json!({"id": "a", "title": "Alpha"}))];
        let cites = vec![CitationItem::new("missing"), CitationItem::new("a")];
        let mut history = CiteHistory::new();
        let ctx = fixture.ctx(RenderMode::Citation);
        let output = render_citation(&ctx, &data, Some(&cites), &mut history);
        assert_eq!(output.text, "Alpha");
        assert_eq!(output.items, 1);
    }

    #[test]
    fn test_citation_positions_use_history() {
        let fixture = Fixture::citation(
            r#"<choose><if position="subsequent"><text value="again"/></if><else><text variable="title"/></else></choose>"#,
        );
        let data = vec![item(json!({"id": "a", "title": "Alpha"}))];
        let cites = vec![CitationItem::new("a")];
        let mut history = CiteHistory::new();
        let ctx = fixture.ctx(RenderMode::Citation);
        assert_eq!(render_citation(&ctx, &data, Some(&cites), &mut history).text, "Alpha");
        assert_eq!(render_citation(&ctx, &data, Some(&cites), &mut history).text, "again");
    }

    #[test]
    fn test_subsequent_author_substitute_across_entries() {
        let xml = style_xml("", r#"<text variable="title"/>"#, None).replace(
            "</style>",
            r#"<bibliography subsequent-author-substitute="---"><layout><names variable="author" suffix=". "><name/></names><text variable="title"/></layout></bibliography></style>"#,
        );
        let fixture = Fixture::new(&xml);
        let data = json!([
            {"id": "a", "title": "One", "author": [{"family": "Doe", "given": "John"}]},
            {"id": "b", "title": "Two", "author": [{"family": "Doe", "given": "John"}]},
            {"id": "c", "title": "Three", "author": [{"family": "Roe", "given": "Jane"}]}
        ]);
        assert_eq!(
            bibliography(&fixture, data),
            "<div class=\"csl-bib-body\">\n  <div class=\"csl-entry\">John Doe. One</div>\n  <div class=\"csl-entry\">---. Two</div>\n  <div class=\"csl-entry\">Jane Roe. Three</div>\n</div>"
        );
    }

    fn substitute_rule_entries(rule: &str) -> Vec<String> {
        let bibliography_xml = format!(
            r#"<bibliography subsequent-author-substitute="---" subsequent-author-substitute-rule="{}"><layout><names variable="author" suffix=". "><name and="text"/></names><text variable="title"/></layout></bibliography></style>"#,
            rule
        );
        let xml = style_xml("", r#"<text variable="title"/>"#, None).replace("</style>", &bibliography_xml);
        let fixture = Fixture::new(&xml);
        let data = json!([
            {"id": "a", "title": "One", "author": [
                {"family": "Doe", "given": "John"}, {"family": "Poe", "given": "Ed"}
            ]},
            {"id": "b", "title": "Two", "author": [
                {"family": "Doe", "given": "John"}, {"family": "Poe", "given": "Ed"}
            ]},
            {"id": "c", "title": "Three", "author": [
                {"family": "Roe", "given": "Jane"}, {"family": "Poe", "given": "Ed"}
            ]}
        ]);
        bibliography(&fixture, data)
            .lines()
            .filter_map(|line| line.trim().strip_prefix(r#"<div class="csl-entry">"#))
            .filter_map(|line| line.strip_suffix("</div>"))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_subsequent_author_substitute_complete_all() {
        assert_eq!(
            substitute_rule_entries("complete-all"),
            ["John Doe and Ed Poe. One", "---. Two", "Jane Roe and Ed Poe. Three"]
        );
    }

    #[test]
    fn test_subsequent_author_substitute_complete_each() {
        assert_eq!(
            substitute_rule_entries("complete-each"),
            ["John Doe and Ed Poe. One", "--- and ---. Two", "Jane Roe and Ed Poe. Three"]
        );
    }

    #[test]
    fn test_subsequent_author_substitute_partial_each() {
        assert_eq!(
            substitute_rule_entries("partial-each"),
            ["John Doe and Ed Poe. One", "--- and ---. Two", "Jane Roe and ---. Three"]
        );
    }

    #[test]
    fn test_subsequent_author_substitute_partial_first() {
        assert_eq!(
            substitute_rule_entries("partial-first"),
            ["John Doe and Ed Poe. One", "--- and Ed Poe. Two", "Jane Roe and Ed Poe. Three"]
        );
    }
}
