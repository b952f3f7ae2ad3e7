//! The public processor API.

use crate::context::{
    CiteHistory, CitationItem, CitationItems, MarkupExtensions, RenderContext, RenderMode,
};
use crate::error::{Error, Result};
use crate::layout::{self, LayoutOutput};
use crate::locale::Locales;
use crate::output::QuoteConfig;
use crate::reference::Item;
use citeproc_style::{Layout, Style, parse_csl};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Result of a render call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Rendered {
    Text(String),
    /// One citation per input group.
    Groups(Vec<String>),
}

impl Rendered {
    /// The rendered text, with groups joined by newlines.
    pub fn into_text(self) -> String {
        match self {
            Rendered::Text(text) => text,
            Rendered::Groups(groups) => groups.join("\n"),
        }
    }
}

/// Renders citations and bibliographies for one style and locale.
///
/// The processor counts the items it has rendered over its lifetime; the
/// `limit-day-ordinals-to-day-1` locale option depends on that count.
pub struct Processor {
    style: Style,
    locales: Locales,
    quotes: QuoteConfig,
    markup: MarkupExtensions,
    cited_counter: usize,
}

impl Processor {
    /// Load a style, using its `default-locale` (or en-US).
    pub fn new(style_xml: &str) -> Result<Self> {
        let style = parse_csl(style_xml)?;
        let locales = Locales::new(style.default_locale.as_deref(), &style.locales)?;
        Ok(Self::from_style(style, locales))
    }

    /// Load a style and render in `lang`.
    pub fn with_locale(style_xml: &str, lang: &str) -> Result<Self> {
        let style = parse_csl(style_xml)?;
        let locales = Locales::new(Some(lang), &style.locales)?;
        Ok(Self::from_style(style, locales))
    }

    pub fn from_style(style: Style, locales: Locales) -> Self {
        let quotes = QuoteConfig::from_locale(&locales);
        Self {
            style,
            locales,
            quotes,
            markup: MarkupExtensions::new(),
            cited_counter: 0,
        }
    }

    /// Register a callback that rewrites the rendered text of a variable,
    /// of each entry (`csl-entry`), or of the citation number
    /// (`citation-number`).
    pub fn with_markup_extension<F>(mut self, key: impl Into<String>, extension: F) -> Self
    where
        F: Fn(&Item, &str) -> String + 'static,
    {
        self.markup.insert(key.into(), Box::new(extension));
        self
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Items rendered by this processor so far.
    pub fn cited_items(&self) -> usize {
        self.cited_counter
    }

    /// Render JSON input.
    ///
    /// `data` is an array of items or an object whose values are items.
    /// `citation_items` is a flat array of cites or an array of such
    /// arrays; it only matters in citation mode. With `as_array`, grouped
    /// citations come back as [`Rendered::Groups`].
    pub fn render(
        &mut self,
        data: &Value,
        mode: RenderMode,
        citation_items: Option<&Value>,
        as_array: bool,
    ) -> Result<Rendered> {
        let items = parse_items(data)?;
        match mode {
            RenderMode::Bibliography => Ok(Rendered::Text(self.render_bibliography(&items))),
            RenderMode::Citation => {
                let cites = citation_items
                    .filter(|value| !value.is_null())
                    .map(parse_citation_items)
                    .transpose()?;
                match cites {
                    Some(CitationItems::Flat(flat)) if flat.is_empty() => {
                        Ok(Rendered::Text(self.render_all_cited(&items)))
                    }
                    Some(cites) => Ok(self.render_citation_items(&items, &cites, as_array)),
                    None => Ok(Rendered::Text(self.render_all_cited(&items))),
                }
            }
        }
    }

    /// Render the bibliography of `items`. A style without a
    /// `<bibliography>` renders nothing.
    pub fn render_bibliography(&mut self, items: &[Item]) -> String {
        let Some(layout) = self.style.bibliography.as_ref() else {
            warn!("style has no bibliography");
            return String::new();
        };
        let history = CiteHistory::new();
        let ctx = self.context(layout, RenderMode::Bibliography, &history);
        let output = layout::render_bibliography(&ctx, items);
        self.count(output)
    }

    /// Render citations of `items`, one per group of `cites`.
    pub fn render_citation(&mut self, items: &[Item], cites: &CitationItems) -> String {
        self.render_citation_items(items, cites, false).into_text()
    }

    fn render_citation_items(
        &mut self,
        items: &[Item],
        cites: &CitationItems,
        as_array: bool,
    ) -> Rendered {
        let mut history = CiteHistory::new();
        let mut groups = Vec::new();
        for group in cites.groups() {
            let output = self.cite(items, Some(group), &mut history);
            groups.push(self.count(output));
        }

        if cites.is_grouped() && as_array {
            Rendered::Groups(groups)
        } else {
            Rendered::Text(groups.join("\n"))
        }
    }

    /// Cite every item, in input order unless the citation sorts.
    fn render_all_cited(&mut self, items: &[Item]) -> String {
        let mut history = CiteHistory::new();
        let output = self.cite(items, None, &mut history);
        self.count(output)
    }

    fn cite(
        &self,
        items: &[Item],
        cites: Option<&[CitationItem]>,
        history: &mut CiteHistory,
    ) -> LayoutOutput {
        // The layout hands `history` to each cite itself.
        let start = CiteHistory::new();
        let ctx = self.context(&self.style.citation, RenderMode::Citation, &start);
        layout::render_citation(&ctx, items, cites, history)
    }

    fn context<'a>(
        &'a self,
        layout: &'a Layout,
        mode: RenderMode,
        history: &'a CiteHistory,
    ) -> RenderContext<'a> {
        RenderContext::new(
            &self.style,
            &self.locales,
            &self.quotes,
            layout,
            mode,
            history,
            self.cited_counter + 1,
            &self.markup,
        )
    }

    fn count(&mut self, output: LayoutOutput) -> String {
        self.cited_counter += output.items;
        output.text
    }
}

/// Items from an array, or from the values of an object.
pub fn parse_items(data: &Value) -> Result<Vec<Item>> {
    let values: Vec<&Value> = match data {
        Value::Array(values) => values.iter().collect(),
        Value::Object(map) => map.values().collect(),
        other => {
            return Err(Error::InvalidInput(format!(
                "expected an array or object of items, got {}",
                json_kind(other)
            )));
        }
    };
    let items = values
        .into_iter()
        .map(|value| Item::deserialize(value).map_err(Error::from))
        .collect::<Result<Vec<_>>>()?;
    debug!(items = items.len(), "parsed item data");
    Ok(items)
}

/// Cites from a flat array, or groups from an array of arrays.
pub fn parse_citation_items(value: &Value) -> Result<CitationItems> {
    let Value::Array(entries) = value else {
        return Err(Error::InvalidInput(format!(
            "expected an array of citation items, got {}",
            json_kind(value)
        )));
    };

    if entries.first().is_some_and(Value::is_array) {
        let groups = entries
            .iter()
            .map(|group| match group {
                Value::Array(cites) => parse_cites(cites),
                other => Err(Error::InvalidInput(format!(
                    "expected every citation group to be an array, got {}",
                    json_kind(other)
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(CitationItems::Grouped(groups));
    }

    Ok(CitationItems::Flat(parse_cites(entries)?))
}

fn parse_cites(values: &[Value]) -> Result<Vec<CitationItem>> {
    values
        .iter()
        .map(|value| match value {
            Value::Object(_) => CitationItem::deserialize(value).map_err(Error::from),
            other => Err(Error::InvalidInput(format!(
                "expected a citation item object, got {}",
                json_kind(other)
            ))),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
