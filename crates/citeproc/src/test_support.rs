//! Shared helpers for unit tests.

use crate::context::{CiteHistory, ItemScratch, MarkupExtensions, RenderContext, RenderMode};
use crate::locale::Locales;
use crate::output::QuoteConfig;
use crate::reference::Item;
use crate::render::render_elements;
use citeproc_style::{Style, parse_csl};

/// A style with the given macros, citation layout body and optional
/// bibliography layout body.
pub fn style_xml(macros: &str, citation: &str, bibliography: Option<&str>) -> String {
    let bibliography = bibliography
        .map(|body| format!("<bibliography><layout>{}</layout></bibliography>", body))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<style xmlns="http://purl.org/net/xbiblio/csl" class="in-text" version="1.0">
  {}
  <citation><layout>{}</layout></citation>
  {}
</style>"#,
        macros, citation, bibliography
    )
}

pub fn item(value: serde_json::Value) -> Item {
    serde_json::from_value(value).unwrap()
}

/// Everything a [`RenderContext`] borrows.
pub struct Fixture {
    pub style: Style,
    pub locales: Locales,
    pub quotes: QuoteConfig,
    pub history: CiteHistory,
    pub markup: MarkupExtensions,
}

impl Fixture {
    pub fn new(xml: &str) -> Self {
        Self::with_locale(xml, "en-US")
    }

    pub fn with_locale(xml: &str, lang: &str) -> Self {
        let style = parse_csl(xml).unwrap();
        let locales = Locales::new(Some(lang), &style.locales).unwrap();
        let quotes = QuoteConfig::from_locale(&locales);
        Self {
            style,
            locales,
            quotes,
            history: CiteHistory::new(),
            markup: MarkupExtensions::new(),
        }
    }

    /// A style whose citation layout is `body`.
    pub fn citation(body: &str) -> Self {
        Self::new(&style_xml("", body, None))
    }

    pub fn ctx(&self, mode: RenderMode) -> RenderContext<'_> {
        let layout = match mode {
            RenderMode::Citation => &self.style.citation,
            RenderMode::Bibliography => self
                .style
                .bibliography
                .as_ref()
                .unwrap_or(&self.style.citation),
        };
        RenderContext::new(
            &self.style,
            &self.locales,
            &self.quotes,
            layout,
            mode,
            &self.history,
            1,
            &self.markup,
        )
        .with_citation_number(1)
    }

    /// Render the citation layout's children for one item, without layout
    /// affixes.
    pub fn render(&self, data: serde_json::Value) -> String {
        let it = item(data);
        let ctx = self.ctx(RenderMode::Citation);
        let mut scratch = ItemScratch::default();
        render_elements(&ctx, &it, &mut scratch, &self.style.citation.elements, "")
    }
}
