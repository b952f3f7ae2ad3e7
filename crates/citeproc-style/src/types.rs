//! Typed CSL style tree.
//!
//! Every style element the renderer understands is one variant of the
//! closed [`ElementType`] enum. Nodes carry their resolved attributes and
//! never change after loading.

use citeproc_xml::Span;
use std::collections::HashMap;

/// A parsed CSL style.
#[derive(Debug, Clone)]
pub struct Style {
    /// CSL version (e.g., "1.0").
    pub version: String,

    /// Style class: "in-text" or "note".
    pub class: StyleClass,

    /// Default locale for the style (e.g., "en-US").
    pub default_locale: Option<String>,

    pub options: StyleOptions,

    pub info: Option<StyleInfo>,

    /// Locale overrides defined in the style.
    pub locales: Vec<Locale>,

    /// Macro definitions, keyed by name.
    pub macros: HashMap<String, Macro>,

    pub citation: Layout,

    pub bibliography: Option<Layout>,

    /// Style-level name formatting options.
    pub name_options: InheritableNameOptions,

    pub span: Span,
}

impl Style {
    /// The layout used for a bibliography or citation render.
    pub fn layout(&self, bibliography: bool) -> Option<&Layout> {
        if bibliography {
            self.bibliography.as_ref()
        } else {
            Some(&self.citation)
        }
    }
}

/// Style class: determines citation format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleClass {
    InText,
    Note,
}

/// Global style options.
#[derive(Debug, Clone)]
pub struct StyleOptions {
    /// `None` when the attribute is absent.
    pub demote_non_dropping_particle: Option<DemoteNonDroppingParticle>,
    pub initialize_with_hyphen: bool,
    pub page_range_format: Option<PageRangeFormat>,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            demote_non_dropping_particle: None,
            initialize_with_hyphen: true,
            page_range_format: None,
        }
    }
}

/// Demote non-dropping particle option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoteNonDroppingParticle {
    Never,
    SortOnly,
    DisplayAndSort,
}

/// Page range format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRangeFormat {
    Chicago,
    Expanded,
    Minimal,
    MinimalTwo,
}

/// Style metadata from `<info>`.
#[derive(Debug, Clone, Default)]
pub struct StyleInfo {
    pub title: Option<String>,
    pub id: Option<String>,
    pub updated: Option<String>,
}

/// A locale definition with terms, date formats and options.
#[derive(Debug, Clone, Default)]
pub struct Locale {
    /// Language code (e.g., "en", "en-US"); `None` applies to every language.
    pub lang: Option<String>,
    pub terms: Vec<Term>,
    pub date_formats: Vec<DateFormat>,
    pub options: LocaleOptions,
    pub span: Span,
}

/// Options from `<style-options>` inside a locale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocaleOptions {
    pub punctuation_in_quote: Option<bool>,
    pub limit_day_ordinals_to_day_1: Option<bool>,
}

/// A term definition.
#[derive(Debug, Clone)]
pub struct Term {
    /// Term name (e.g., "and", "editor").
    pub name: String,
    pub form: TermForm,
    pub single: Option<String>,
    pub multiple: Option<String>,
    /// Simple value (when single/multiple not used).
    pub value: Option<String>,
}

impl Term {
    /// The text for this term in the requested number.
    pub fn text(&self, plural: bool) -> Option<&str> {
        let chosen = if plural {
            self.multiple.as_ref().or(self.value.as_ref())
        } else {
            self.single.as_ref().or(self.value.as_ref())
        };
        chosen
            .or(self.value.as_ref())
            .or(self.single.as_ref())
            .map(String::as_str)
    }
}

/// Term form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum TermForm {
    #[default]
    Long,
    Short,
    Verb,
    VerbShort,
    Symbol,
}

impl TermForm {
    /// The next form to try when a term is missing in this form.
    pub fn fallback(self) -> Option<TermForm> {
        match self {
            TermForm::VerbShort => Some(TermForm::Verb),
            TermForm::Symbol => Some(TermForm::Short),
            TermForm::Verb | TermForm::Short => Some(TermForm::Long),
            TermForm::Long => None,
        }
    }
}

/// A localized date format.
#[derive(Debug, Clone)]
pub struct DateFormat {
    pub form: DateForm,
    pub parts: Vec<DatePart>,
    pub delimiter: Option<String>,
}

/// Date form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateForm {
    #[default]
    Text,
    Numeric,
}

/// A macro definition.
#[derive(Debug, Clone)]
pub struct Macro {
    pub name: String,
    pub elements: Vec<Element>,
    pub span: Span,
}

/// A `<citation>` or `<bibliography>` layout with its options.
#[derive(Debug, Clone)]
pub struct Layout {
    /// Prefix, suffix and inline formatting of `<layout>`.
    pub formatting: Formatting,
    /// Delimiter between citations/entries.
    pub delimiter: Option<String>,
    pub sort: Option<Sort>,
    /// Inheritable name options (from citation/bibliography element).
    pub name_options: InheritableNameOptions,
    pub elements: Vec<Element>,
    /// Cites within this distance count as near-note.
    pub near_note_distance: u32,
    pub second_field_align: Option<SecondFieldAlign>,
    pub subsequent_author_substitute: Option<String>,
    pub subsequent_author_substitute_rule: SubsequentAuthorSubstituteRule,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondFieldAlign {
    Flush,
    Margin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubsequentAuthorSubstituteRule {
    #[default]
    CompleteAll,
    CompleteEach,
    PartialEach,
    PartialFirst,
}

/// Inheritable name formatting options.
///
/// These options can be set on style, citation, bibliography, names or name
/// elements. More specific levels override general levels.
#[derive(Debug, Clone, Default)]
pub struct InheritableNameOptions {
    pub and: Option<NameAnd>,
    /// Delimiter between names.
    pub delimiter: Option<String>,
    pub delimiter_precedes_last: Option<DelimiterPrecedesLast>,
    pub delimiter_precedes_et_al: Option<DelimiterPrecedesLast>,
    pub et_al_min: Option<u32>,
    pub et_al_use_first: Option<u32>,
    pub et_al_subsequent_min: Option<u32>,
    pub et_al_subsequent_use_first: Option<u32>,
    /// Show the last name after an ellipsis.
    pub et_al_use_last: Option<bool>,
    /// When false, given names are never reduced to initials.
    pub initialize: Option<bool>,
    pub initialize_with: Option<String>,
    pub form: Option<NameForm>,
    pub name_as_sort_order: Option<NameAsSortOrder>,
    pub sort_separator: Option<String>,
    /// Delimiter between the name lists of several variables.
    pub names_delimiter: Option<String>,
}

impl InheritableNameOptions {
    /// Merge two option sets, with `self` taking precedence over `other`.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            and: self.and.or(other.and),
            delimiter: self.delimiter.clone().or_else(|| other.delimiter.clone()),
            delimiter_precedes_last: self.delimiter_precedes_last.or(other.delimiter_precedes_last),
            delimiter_precedes_et_al: self
                .delimiter_precedes_et_al
                .or(other.delimiter_precedes_et_al),
            et_al_min: self.et_al_min.or(other.et_al_min),
            et_al_use_first: self.et_al_use_first.or(other.et_al_use_first),
            et_al_subsequent_min: self.et_al_subsequent_min.or(other.et_al_subsequent_min),
            et_al_subsequent_use_first: self
                .et_al_subsequent_use_first
                .or(other.et_al_subsequent_use_first),
            et_al_use_last: self.et_al_use_last.or(other.et_al_use_last),
            initialize: self.initialize.or(other.initialize),
            initialize_with: self
                .initialize_with
                .clone()
                .or_else(|| other.initialize_with.clone()),
            form: self.form.or(other.form),
            name_as_sort_order: self.name_as_sort_order.or(other.name_as_sort_order),
            sort_separator: self
                .sort_separator
                .clone()
                .or_else(|| other.sort_separator.clone()),
            names_delimiter: self
                .names_delimiter
                .clone()
                .or_else(|| other.names_delimiter.clone()),
        }
    }
}

/// Sort specification.
#[derive(Debug, Clone)]
pub struct Sort {
    pub keys: Vec<SortKey>,
    pub span: Span,
}

/// A sort key.
#[derive(Debug, Clone)]
pub struct SortKey {
    pub key: SortKeyType,
    pub sort_order: SortOrder,
    /// Overrides et-al-min for names rendered by this key.
    pub names_min: Option<u32>,
    pub names_use_first: Option<u32>,
    pub names_use_last: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKeyType {
    Variable(String),
    Macro(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// A rendering element (text, names, date, etc.).
#[derive(Debug, Clone)]
pub struct Element {
    pub element_type: ElementType,
    pub formatting: Formatting,
    pub span: Span,
}

/// The closed set of rendering elements.
#[derive(Debug, Clone)]
pub enum ElementType {
    Text(TextElement),
    Number(NumberElement),
    Label(LabelElement),
    Names(NamesElement),
    Date(DateElement),
    Group(GroupElement),
    Choose(ChooseElement),
}

#[derive(Debug, Clone)]
pub struct TextElement {
    pub source: TextSource,
}

/// What a `<text>` element renders.
#[derive(Debug, Clone)]
pub enum TextSource {
    Variable { name: String, form: VariableForm },
    Macro { name: String, span: Span },
    Term { name: String, form: TermForm, plural: bool },
    Value { value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VariableForm {
    #[default]
    Long,
    Short,
}

#[derive(Debug, Clone)]
pub struct NumberElement {
    pub variable: String,
    pub form: NumberForm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberForm {
    #[default]
    Numeric,
    Ordinal,
    LongOrdinal,
    Roman,
}

#[derive(Debug, Clone)]
pub struct LabelElement {
    pub variable: String,
    pub form: TermForm,
    pub plural: LabelPlural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelPlural {
    #[default]
    Contextual,
    Always,
    Never,
}

/// `<names>` with its name, et-al, label and substitute children.
#[derive(Debug, Clone)]
pub struct NamesElement {
    /// Variable names (e.g., "author", "editor").
    pub variables: Vec<String>,
    /// Delimiter between the lists of different variables.
    pub delimiter: Option<String>,
    pub name: Option<Name>,
    pub et_al: Option<EtAl>,
    pub label: Option<NamesLabel>,
    /// `<label>` appeared before `<name>` in the style.
    pub label_before_name: bool,
    pub substitute: Option<Vec<Element>>,
}

/// `<name>` formatting.
#[derive(Debug, Clone, Default)]
pub struct Name {
    pub options: InheritableNameOptions,
    pub formatting: Formatting,
    pub family_formatting: Option<Formatting>,
    pub given_formatting: Option<Formatting>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameAsSortOrder {
    First,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameAnd {
    Text,
    Symbol,
}

/// Shared by delimiter-precedes-last and delimiter-precedes-et-al.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DelimiterPrecedesLast {
    #[default]
    Contextual,
    Always,
    Never,
    AfterInvertedName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameForm {
    #[default]
    Long,
    Short,
    Count,
}

#[derive(Debug, Clone)]
pub struct EtAl {
    /// "et-al" or "and others".
    pub term: String,
    pub formatting: Formatting,
}

#[derive(Debug, Clone)]
pub struct NamesLabel {
    pub form: TermForm,
    pub plural: LabelPlural,
    pub formatting: Formatting,
}

#[derive(Debug, Clone)]
pub struct DateElement {
    pub variable: String,
    /// Set for localized dates.
    pub form: Option<DateForm>,
    pub date_parts: DatePartsFilter,
    /// Inline parts; for localized dates these override the locale parts.
    pub parts: Vec<DatePart>,
    pub delimiter: Option<String>,
}

/// Which parts of a localized date to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatePartsFilter {
    Year,
    YearMonth,
    #[default]
    YearMonthDay,
}

impl DatePartsFilter {
    pub fn includes(self, name: DatePartName) -> bool {
        match (self, name) {
            (_, DatePartName::Year) => true,
            (DatePartsFilter::Year, _) => false,
            (DatePartsFilter::YearMonth, DatePartName::Day) => false,
            _ => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatePart {
    pub name: DatePartName,
    pub form: Option<DatePartForm>,
    pub formatting: Formatting,
    pub range_delimiter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePartName {
    Year,
    Month,
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePartForm {
    Long,
    Short,
    Numeric,
    NumericLeadingZeros,
    Ordinal,
}

#[derive(Debug, Clone)]
pub struct GroupElement {
    pub elements: Vec<Element>,
    pub delimiter: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChooseElement {
    /// `if`, then any `else-if`, then an optional `else`.
    pub branches: Vec<ChooseBranch>,
}

#[derive(Debug, Clone)]
pub struct ChooseBranch {
    /// Empty for the else branch.
    pub conditions: Vec<Condition>,
    pub match_type: MatchType,
    pub elements: Vec<Element>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchType {
    #[default]
    All,
    Any,
    None,
}

/// A single test attribute on `if`/`else-if`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Type(Vec<String>),
    Variable(Vec<String>),
    IsNumeric(Vec<String>),
    IsUncertainDate(Vec<String>),
    Locator(Vec<String>),
    Position(Vec<Position>),
    Disambiguate(bool),
}

/// Citation position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    First,
    Subsequent,
    IbidWithLocator,
    Ibid,
    NearNote,
}

/// Formatting attributes shared by most elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formatting {
    pub font_style: Option<FontStyle>,
    pub font_variant: Option<FontVariant>,
    pub font_weight: Option<FontWeight>,
    pub text_decoration: Option<TextDecoration>,
    pub vertical_align: Option<VerticalAlign>,
    pub text_case: Option<TextCase>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub display: Option<Display>,
    pub quotes: bool,
    pub strip_periods: bool,
}

impl Formatting {
    pub fn has_affixes(&self) -> bool {
        self.prefix.as_deref().is_some_and(|p| !p.is_empty())
            || self.suffix.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        *self == Formatting::default()
    }

    /// The same formatting without prefix and suffix.
    pub fn without_affixes(&self) -> Formatting {
        Formatting {
            prefix: None,
            suffix: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
    Oblique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontVariant {
    Normal,
    SmallCaps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecoration {
    None,
    Underline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Baseline,
    Sup,
    Sub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextCase {
    Lowercase,
    Uppercase,
    CapitalizeFirst,
    CapitalizeAll,
    Sentence,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    LeftMargin,
    RightInline,
    Indent,
}

impl Display {
    /// Class name used in the `csl-*` div wrapper.
    pub fn class_name(self) -> &'static str {
        match self {
            Display::Block => "block",
            Display::LeftMargin => "left-margin",
            Display::RightInline => "right-inline",
            Display::Indent => "indent",
        }
    }
}
