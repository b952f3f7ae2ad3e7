//! End-to-end rendering of the fixture styles in tests/fixtures.

use citeproc::{CitationItem, CitationItems, Processor, RenderMode, Rendered, parse_items};
use insta::assert_snapshot;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;

fn processor(name: &str) -> Processor {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let content = fs::read_to_string(&path).expect("Failed to read fixture");
    Processor::new(&content).expect("Failed to load fixture style")
}

fn author_date_items() -> Value {
    json!([
        {
            "id": "doe2020",
            "type": "book",
            "author": [{"family": "Doe", "given": "John"}],
            "title": "The Book",
            "issued": {"date-parts": [[2020]]}
        },
        {
            "id": "doe2018",
            "type": "article-journal",
            "author": [{"family": "Doe", "given": "John"}],
            "title": "An Article",
            "container-title": "Journal",
            "volume": "3",
            "page": "10-15",
            "issued": {"date-parts": [[2018]]}
        },
        {
            "id": "adams2019",
            "type": "book",
            "author": [
                {"family": "Adams", "given": "Ann"},
                {"family": "Baker", "given": "Bob"}
            ],
            "title": "Third",
            "issued": {"date-parts": [[2019]]}
        }
    ])
}

fn note_items() -> Value {
    json!([
        {
            "id": "a",
            "author": [{"family": "Doe", "given": "John"}],
            "title": "A Long Title",
            "title-short": "Short",
            "issued": {"date-parts": [[2020, 3, 15]]}
        },
        {
            "id": "b",
            "editor": [{"family": "Roe", "given": "Jane"}],
            "title": "Other"
        },
        {
            "id": "c",
            "author": [
                {"family": "Doe", "given": "John"},
                {"family": "Roe", "given": "Jane"}
            ],
            "title": "Joint"
        }
    ])
}

fn text(rendered: Rendered) -> String {
    rendered.into_text()
}

#[test]
fn test_author_date_bibliography() {
    let mut p = processor("author-date.csl");
    let rendered = p
        .render(&author_date_items(), RenderMode::Bibliography, None, false)
        .unwrap();
    assert_snapshot!(text(rendered), @r#"
    <div class="csl-bib-body">
      <div class="csl-entry">Adams, A., &#38; B. Baker. (2019). <i>Third</i>.</div>
      <div class="csl-entry">Doe, J. (2018). An Article. <i>Journal</i>, <i>3</i>, 10–15.</div>
      <div class="csl-entry">———. (2020). <i>The Book</i>.</div>
    </div>
    "#);
}

#[test]
fn test_author_date_citation_sorts_cites() {
    let mut p = processor("author-date.csl");
    let cites = json!([{"id": "doe2018", "locator": "12"}, {"id": "adams2019"}]);
    let rendered = p
        .render(&author_date_items(), RenderMode::Citation, Some(&cites), false)
        .unwrap();
    assert_snapshot!(text(rendered), @"(Adams &#38; Baker, 2019; Doe, 2018, p. 12)");
}

#[test]
fn test_numeric_bibliography_second_field_align() {
    let mut p = processor("numeric.csl");
    let items = json!([
        {
            "id": "a",
            "author": [{"family": "Smith", "given": "Alice Mary"}],
            "title": "Notes",
            "container-title": "Review",
            "volume": "12",
            "page": "100-105",
            "issued": {"date-parts": [[2021, 3]]}
        },
        {
            "id": "b",
            "author": [
                {"family": "One", "given": "Ann"},
                {"family": "Two", "given": "Bea"},
                {"family": "Three", "given": "Cal"},
                {"family": "Four", "given": "Dan"},
                {"family": "Five", "given": "Eve"},
                {"family": "Six", "given": "Fay"},
                {"family": "Seven", "given": "Gus"}
            ],
            "title": "Big Team"
        }
    ]);
    let rendered = p
        .render(&items, RenderMode::Bibliography, None, false)
        .unwrap();
    assert_snapshot!(text(rendered), @r#"
    <div class="csl-bib-body">
      <div class="csl-entry"><div class="csl-left-margin">[1]</div><div class="csl-right-inline">A. M. Smith, “Notes”, <i>Review</i>, vol. 12, pp. 100–5, March 2021.</div></div>
      <div class="csl-entry"><div class="csl-left-margin">[2]</div><div class="csl-right-inline">A. One, B. Two, C. Three, <i>et al.</i>, “Big Team.”</div></div>
    </div>
    "#);
}

#[test]
fn test_citation_numbers_follow_input_order() {
    let mut p = processor("numeric.csl");
    let items = json!([{"id": "a"}, {"id": "b"}, {"id": "c"}]);
    let cites = json!([{"id": "c"}, {"id": "a", "locator": "3"}]);
    let rendered = p
        .render(&items, RenderMode::Citation, Some(&cites), false)
        .unwrap();
    assert_snapshot!(text(rendered), @"[1, p. 3, 3]");
}

#[test]
fn test_grouped_citations_as_array() {
    let mut p = processor("numeric.csl");
    let items = json!([{"id": "a"}, {"id": "b"}]);
    let cites = json!([[{"id": "b"}], [{"id": "a"}, {"id": "b", "locator": "4-6"}]]);
    let rendered = p
        .render(&items, RenderMode::Citation, Some(&cites), true)
        .unwrap();
    assert_eq!(
        rendered,
        Rendered::Groups(vec!["[2]".to_string(), "[1, 2, pp. 4–6]".to_string()])
    );
}

#[test]
fn test_note_positions() {
    let mut p = processor("note.csl");
    let cites = json!([
        [{"id": "a", "locator": "5"}],
        [{"id": "a", "locator": "5"}],
        [{"id": "a", "locator": "7"}],
        [{"id": "b"}],
        [{"id": "a"}]
    ]);
    let rendered = p
        .render(&note_items(), RenderMode::Citation, Some(&cites), false)
        .unwrap();
    assert_snapshot!(text(rendered), @r#"
    John Doe, <i>A Long Title</i>, March 15, 2020, 5.
    Ibid.
    Ibid., 7.
    Jane Roe, <i>Other</i>.
    Doe, <i>Short</i>.
    "#);
}

#[test]
fn test_note_et_al_subsequent() {
    let mut p = processor("note.csl");
    let cites = json!([[{"id": "c"}], [{"id": "a"}], [{"id": "c"}]]);
    let rendered = p
        .render(&note_items(), RenderMode::Citation, Some(&cites), false)
        .unwrap();
    assert_snapshot!(text(rendered), @r#"
    John Doe and Jane Roe, <i>Joint</i>.
    John Doe, <i>A Long Title</i>, March 15, 2020.
    Doe et al., <i>Joint</i>.
    "#);
}

#[test]
fn test_typed_entry_points() {
    let mut p = processor("note.csl");
    let items = parse_items(&note_items()).unwrap();
    let cites = CitationItems::Grouped(vec![
        vec![CitationItem::new("b")],
        vec![CitationItem::new("b").with_locator("9")],
    ]);
    assert_eq!(
        p.render_citation(&items, &cites),
        "Jane Roe, <i>Other</i>.\nIbid., 9."
    );
    assert_eq!(p.cited_items(), 2);
}

#[test]
fn test_unknown_cite_id_is_skipped() {
    let mut p = processor("numeric.csl");
    let items = json!([{"id": "a"}]);
    let cites = json!([{"id": "nope"}, {"id": "a"}]);
    let rendered = p
        .render(&items, RenderMode::Citation, Some(&cites), false)
        .unwrap();
    assert_snapshot!(text(rendered), @"[1]");
}

#[test]
fn test_locale_override_changes_terms() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/note.csl");
    let content = fs::read_to_string(path).unwrap();
    let mut p = Processor::with_locale(&content, "de-DE").unwrap();
    let cites = json!([[{"id": "c"}]]);
    let rendered = p
        .render(&note_items(), RenderMode::Citation, Some(&cites), false)
        .unwrap();
    assert_snapshot!(text(rendered), @"John Doe und Jane Roe, <i>Joint</i>.");
}
