//! Render context threaded through every render call.
//!
//! [`RenderContext`] is a small `Copy` value. Sub-renders that need a
//! different mode or phase receive a derived copy, so the caller's own
//! context is unchanged when the call returns. Mutable bookkeeping for the
//! item being rendered lives in [`ItemScratch`], passed separately as
//! `&mut`.

use crate::locale::LocaleStore;
use crate::output::QuoteConfig;
use crate::reference::Item;
use citeproc_style::{InheritableNameOptions, Layout, Position, Style};
use hashlink::LinkedHashMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Which layout is being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Citation,
    Bibliography,
}

/// What the current render is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Rendering,
    /// Computing sort keys.
    Sorting,
    /// Rendering `<substitute>` children of a `<names>` element.
    Substitution,
}

/// Callback that post-processes the rendered text of a variable (or of a
/// whole entry) for one item.
pub type MarkupExtension = Box<dyn Fn(&Item, &str) -> String>;

/// Markup extensions keyed by variable name, `csl-entry` or
/// `citation-number`.
pub type MarkupExtensions = HashMap<String, MarkupExtension>;

/// One cited item as given by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CitationItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub locator: Option<String>,

    /// Locator type, e.g. "page" or "chapter".
    #[serde(default)]
    pub label: Option<String>,
}

impl CitationItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = Some(locator.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The locator label, "page" unless given.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("page")
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(D::Error::custom("expected string or number")),
    }
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// The citation items of one render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitationItems {
    /// A single citation.
    Flat(Vec<CitationItem>),
    /// One citation per group.
    Grouped(Vec<Vec<CitationItem>>),
}

impl CitationItems {
    pub fn groups(&self) -> Vec<&[CitationItem]> {
        match self {
            CitationItems::Flat(items) => vec![items.as_slice()],
            CitationItems::Grouped(groups) => groups.iter().map(Vec::as_slice).collect(),
        }
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self, CitationItems::Grouped(_))
    }
}

/// A previously rendered cite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitedItem {
    pub id: String,
    pub locator: Option<String>,
}

/// The cites rendered so far in this render call, oldest first.
#[derive(Debug, Clone, Default)]
pub struct CiteHistory {
    cites: Vec<CitedItem>,
    /// Index into `cites` of the latest cite of each id.
    last_cited: LinkedHashMap<String, usize>,
}

/// The position flags of one cite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Positions {
    pub first: bool,
    pub subsequent: bool,
    pub ibid: bool,
    pub ibid_with_locator: bool,
    pub near_note: bool,
}

impl Positions {
    /// Whether a `position` test on `if`/`else-if` holds.
    pub fn matches(&self, position: Position) -> bool {
        match position {
            Position::First => self.first,
            Position::Subsequent => self.subsequent,
            Position::Ibid => self.ibid || self.ibid_with_locator,
            Position::IbidWithLocator => self.ibid_with_locator,
            Position::NearNote => self.near_note,
        }
    }
}

impl CiteHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_cited_item(&mut self, id: &str, locator: Option<&str>) {
        self.last_cited.remove(id);
        self.last_cited.insert(id.to_string(), self.cites.len());
        self.cites.push(CitedItem {
            id: id.to_string(),
            locator: locator.map(str::to_string),
        });
    }

    pub fn len(&self) -> usize {
        self.cites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cites.is_empty()
    }

    pub fn last(&self) -> Option<&CitedItem> {
        self.cites.last()
    }

    /// Positions of a new cite of `id` against this history.
    pub fn positions(&self, id: &str, locator: Option<&str>, near_note_distance: u32) -> Positions {
        let Some(&last_index) = self.last_cited.get(id) else {
            return Positions {
                first: true,
                ..Default::default()
            };
        };

        let ibid = self.last().is_some_and(|prev| prev.id == id);
        let ibid_with_locator =
            ibid && self.last().is_some_and(|prev| prev.locator.as_deref() != locator);
        let distance = self.cites.len() - last_index;

        Positions {
            first: false,
            subsequent: true,
            ibid: ibid && !ibid_with_locator,
            ibid_with_locator,
            near_note: distance <= near_note_distance as usize,
        }
    }
}

/// Variable references met while rendering a group, and how many of them
/// produced output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariableUse {
    pub called: usize,
    pub rendered: usize,
}

impl VariableUse {
    pub fn record(&mut self, rendered: bool) {
        self.called += 1;
        if rendered {
            self.rendered += 1;
        }
    }
}

/// Mutable state for the item being rendered.
#[derive(Debug, Default)]
pub struct ItemScratch {
    /// Variables already rendered by a `<substitute>`.
    pub consumed: HashSet<String>,
    pub vars: VariableUse,
    /// Names of the previous bibliography entry, one string per name.
    pub previous_names: Option<Vec<String>>,
    /// Names of the first name list rendered for this entry.
    pub first_names: Option<Vec<String>>,
}

impl ItemScratch {
    pub fn new(previous_names: Option<Vec<String>>) -> Self {
        Self {
            previous_names,
            ..Default::default()
        }
    }

    pub fn is_consumed(&self, variable: &str) -> bool {
        self.consumed.contains(variable)
    }
}

/// Name options set by a sort key, overriding the style for macro keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NameOverrides {
    pub et_al_min: Option<u32>,
    pub et_al_use_first: Option<u32>,
    pub et_al_use_last: Option<bool>,
}

/// Everything a node needs to render, apart from the item and its scratch.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub style: &'a Style,
    pub locale: &'a dyn LocaleStore,
    pub quotes: &'a QuoteConfig,
    /// The citation or bibliography layout being rendered.
    pub layout: &'a Layout,
    pub mode: RenderMode,
    pub phase: Phase,
    /// Items of the citation being rendered.
    pub citation_items: &'a [CitationItem],
    /// The entry of `citation_items` for the current item.
    pub citation_item: Option<&'a CitationItem>,
    pub cited: &'a CiteHistory,
    /// 1-based position of the item in the input collection.
    pub citation_number: usize,
    /// Items cited over the processor's lifetime.
    pub cited_counter: usize,
    pub name_overrides: NameOverrides,
    pub markup: &'a MarkupExtensions,
}

impl<'a> RenderContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        style: &'a Style,
        locale: &'a dyn LocaleStore,
        quotes: &'a QuoteConfig,
        layout: &'a Layout,
        mode: RenderMode,
        cited: &'a CiteHistory,
        cited_counter: usize,
        markup: &'a MarkupExtensions,
    ) -> Self {
        Self {
            style,
            locale,
            quotes,
            layout,
            mode,
            phase: Phase::Rendering,
            citation_items: &[],
            citation_item: None,
            cited,
            citation_number: 0,
            cited_counter,
            name_overrides: NameOverrides::default(),
            markup,
        }
    }

    pub fn with_mode(self, mode: RenderMode) -> Self {
        Self { mode, ..self }
    }

    pub fn with_phase(self, phase: Phase) -> Self {
        Self { phase, ..self }
    }

    pub fn with_citation_items(self, citation_items: &'a [CitationItem]) -> Self {
        Self {
            citation_items,
            ..self
        }
    }

    pub fn with_citation_item(self, citation_item: Option<&'a CitationItem>) -> Self {
        Self {
            citation_item,
            ..self
        }
    }

    pub fn with_citation_number(self, citation_number: usize) -> Self {
        Self {
            citation_number,
            ..self
        }
    }

    pub fn with_cited_counter(self, cited_counter: usize) -> Self {
        Self {
            cited_counter,
            ..self
        }
    }

    pub fn with_name_overrides(self, name_overrides: NameOverrides) -> Self {
        Self {
            name_overrides,
            ..self
        }
    }

    /// The same context over a shorter-lived cite history.
    pub fn with_cited_items<'b>(&self, cited: &'b CiteHistory) -> RenderContext<'b>
    where
        'a: 'b,
    {
        let base: RenderContext<'b> = *self;
        RenderContext { cited, ..base }
    }

    /// Name options in effect below the layout: the layout's own options
    /// over the style's.
    pub fn layout_name_options(&self) -> InheritableNameOptions {
        self.layout.name_options.merge(&self.style.name_options)
    }

    /// Position flags of the current cite. All false in the bibliography.
    pub fn positions(&self, item: &Item) -> Positions {
        if self.mode == RenderMode::Bibliography {
            return Positions::default();
        }
        let locator = self.citation_item.and_then(|c| c.locator.as_deref());
        self.cited
            .positions(&item.id, locator, self.layout.near_note_distance)
    }

    /// Whether the current cite is a repeat citation, for the
    /// `et-al-subsequent-*` options.
    pub fn is_subsequent_cite(&self, item: &Item) -> bool {
        self.mode == RenderMode::Citation && self.positions(item).subsequent
    }

    /// Whether the item is in English: its `language` field, or the
    /// locale's language when the item has none.
    pub fn is_english(&self, item: &Item) -> bool {
        let language = item.get_variable("language");
        language
            .as_deref()
            .unwrap_or_else(|| self.locale.lang())
            .to_lowercase()
            .starts_with("en")
    }

    /// Run the markup extension registered for `key`, if any.
    pub fn apply_markup(&self, key: &str, item: &Item, text: String) -> String {
        match self.markup.get(key) {
            Some(extension) if !text.is_empty() => extension(item, &text),
            _ => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_citation_item_deserialize() {
        let item: CitationItem =
            serde_json::from_value(json!({"id": 7, "locator": 12, "label": "chapter"})).unwrap();
        assert_eq!(item.id, "7");
        assert_eq!(item.locator.as_deref(), Some("12"));
        assert_eq!(item.label(), "chapter");

        let bare: CitationItem = serde_json::from_value(json!({"id": "smith"})).unwrap();
        assert_eq!(bare.label(), "page");
        assert_eq!(bare.locator, None);
    }

    #[test]
    fn test_first_and_subsequent() {
        let mut history = CiteHistory::new();
        let first = history.positions("a", None, 5);
        assert!(first.first);
        assert!(!first.subsequent);

        history.append_cited_item("a", None);
        history.append_cited_item("b", None);
        let again = history.positions("a", None, 5);
        assert!(!again.first);
        assert!(again.subsequent);
        assert!(!again.ibid);
        assert!(again.near_note);
    }

    #[test]
    fn test_ibid_and_ibid_with_locator() {
        let mut history = CiteHistory::new();
        history.append_cited_item("a", Some("10"));

        let same = history.positions("a", Some("10"), 5);
        assert!(same.ibid);
        assert!(!same.ibid_with_locator);
        assert!(same.subsequent);

        let other = history.positions("a", Some("12"), 5);
        assert!(other.ibid_with_locator);
        assert!(other.matches(Position::Ibid));
        assert!(other.matches(Position::IbidWithLocator));
        assert!(other.matches(Position::Subsequent));
    }

    #[test]
    fn test_ibid_requires_immediately_preceding_cite() {
        let mut history = CiteHistory::new();
        history.append_cited_item("a", None);
        history.append_cited_item("b", None);
        let positions = history.positions("a", None, 5);
        assert!(!positions.matches(Position::Ibid));
        assert!(positions.matches(Position::Subsequent));
    }

    #[test]
    fn test_near_note_distance() {
        let mut history = CiteHistory::new();
        history.append_cited_item("a", None);
        for id in ["b", "c", "d"] {
            history.append_cited_item(id, None);
        }
        assert!(history.positions("a", None, 5).near_note);
        assert!(!history.positions("a", None, 3).near_note);
    }

    #[test]
    fn test_repeated_cite_updates_last_index() {
        let mut history = CiteHistory::new();
        history.append_cited_item("a", None);
        history.append_cited_item("b", None);
        history.append_cited_item("c", None);
        history.append_cited_item("a", None);
        history.append_cited_item("d", None);
        assert!(history.positions("a", None, 2).near_note);
        assert_eq!(history.len(), 5);
    }

    #[test]
    fn test_citation_items_groups() {
        let flat = CitationItems::Flat(vec![CitationItem::new("a")]);
        assert_eq!(flat.groups().len(), 1);
        assert!(!flat.is_grouped());

        let grouped = CitationItems::Grouped(vec![
            vec![CitationItem::new("a")],
            vec![CitationItem::new("b"), CitationItem::new("c").with_locator("5")],
        ]);
        assert_eq!(grouped.groups().len(), 2);
        assert!(grouped.is_grouped());
    }

    #[test]
    fn test_variable_use_record() {
        let mut vars = VariableUse::default();
        vars.record(false);
        vars.record(true);
        assert_eq!(vars, VariableUse { called: 2, rendered: 1 });
    }
}
