//! Name list rendering.
//!
//! A `<names>` element renders each listed variable as one name list:
//! names are ordered per script and `name-as-sort-order`, abbreviated with
//! et-al, joined with the "and" term and followed (or preceded) by a role
//! label. When no variable has names, the `<substitute>` children are tried
//! in turn.

use crate::context::{ItemScratch, Phase, RenderContext, RenderMode};
use crate::label::{resolve_plural, term_text};
use crate::output::{escape_html, render_with_formatting};
use crate::reference::{Item, Name};
use crate::render::render_element;
use citeproc_style::{
    DelimiterPrecedesLast, DemoteNonDroppingParticle, Element, ElementType, Formatting,
    InheritableNameOptions, NameAnd, NameAsSortOrder, NameForm, NamesElement,
    SubsequentAuthorSubstituteRule, TermForm,
};

const DEFAULT_DELIMITER: &str = ", ";
const DEFAULT_SORT_SEPARATOR: &str = ", ";
const AND_SYMBOL: &str = "&#38;";

/// Render a `<names>` element. Formatting of the element itself is left to
/// the caller.
pub fn render_names(
    ctx: &RenderContext,
    item: &Item,
    scratch: &mut ItemScratch,
    element: &NamesElement,
) -> String {
    let lists = collect_lists(item, scratch, element);
    if lists.is_empty() {
        return render_substitute(ctx, item, scratch, element);
    }

    let renderer = NameListRenderer::new(ctx, item, element);

    if renderer.form() == NameForm::Count {
        let count: usize = lists.iter().map(|l| renderer.shown_count(l.names.len())).sum();
        return if count == 0 {
            String::new()
        } else {
            count.to_string()
        };
    }

    let mut rendered = Vec::new();
    for list in &lists {
        let text = renderer.render_list(scratch, list);
        if ctx.phase == Phase::Substitution {
            scratch.consumed.extend(list.variables.iter().map(|v| v.to_string()));
        }
        if !text.is_empty() {
            rendered.push(text);
        }
    }

    let delimiter = element
        .delimiter
        .as_deref()
        .or(renderer.options.names_delimiter.as_deref())
        .unwrap_or(DEFAULT_DELIMITER);
    rendered.join(delimiter)
}

/// One variable's names, or editor and translator collapsed into one.
struct NameList<'i> {
    variables: Vec<&'i str>,
    /// Role term for the label.
    term: &'i str,
    names: Vec<&'i Name>,
}

fn collect_lists<'i>(
    item: &'i Item,
    scratch: &ItemScratch,
    element: &'i NamesElement,
) -> Vec<NameList<'i>> {
    let mut lists: Vec<NameList<'i>> = element
        .variables
        .iter()
        .filter(|v| !scratch.is_consumed(v))
        .filter_map(|variable| {
            let names: Vec<&Name> = item
                .get_names(variable)?
                .iter()
                .filter(|n| n.is_renderable())
                .collect();
            (!names.is_empty()).then(|| NameList {
                variables: vec![variable.as_str()],
                term: variable.as_str(),
                names,
            })
        })
        .collect();

    let position = |name: &str| lists.iter().position(|l| l.variables == [name]);
    if let (Some(editor), Some(translator)) = (position("editor"), position("translator")) {
        if lists[editor].names == lists[translator].names {
            let translator_list = lists.remove(translator);
            let editor = if translator < editor { editor - 1 } else { editor };
            lists[editor].variables.extend(translator_list.variables);
            lists[editor].term = "editortranslator";
        }
    }

    lists
}

/// Try each substitute child until one renders. Names elements without
/// their own name, et-al or label take the parent's.
fn render_substitute(
    ctx: &RenderContext,
    item: &Item,
    scratch: &mut ItemScratch,
    parent: &NamesElement,
) -> String {
    let Some(children) = &parent.substitute else {
        return String::new();
    };
    let sub_ctx = ctx.with_phase(Phase::Substitution);

    for child in children {
        let consumed = scratch.consumed.clone();
        let output = match &child.element_type {
            ElementType::Names(names) => {
                let inherited = Element {
                    element_type: ElementType::Names(inherit(names, parent)),
                    formatting: child.formatting.clone(),
                    span: child.span,
                };
                render_element(&sub_ctx, item, scratch, &inherited)
            }
            _ => render_element(&sub_ctx, item, scratch, child),
        };
        if !output.is_empty() {
            return output;
        }
        scratch.consumed = consumed;
    }

    String::new()
}

fn inherit(child: &NamesElement, parent: &NamesElement) -> NamesElement {
    let (label, label_before_name) = match &child.label {
        Some(label) => (Some(label.clone()), child.label_before_name),
        None => (parent.label.clone(), parent.label_before_name),
    };
    NamesElement {
        variables: child.variables.clone(),
        delimiter: child.delimiter.clone().or_else(|| parent.delimiter.clone()),
        name: child.name.clone().or_else(|| parent.name.clone()),
        et_al: child.et_al.clone().or_else(|| parent.et_al.clone()),
        label,
        label_before_name,
        substitute: child.substitute.clone(),
    }
}

/// Where truncated name lists stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Truncation {
    shown: usize,
    use_last: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    /// Latin or Cyrillic: particle-aware ordering.
    Latin,
    /// Chinese, Japanese, Korean: family then given, no space.
    Cjk,
    Other,
}

struct NameListRenderer<'r, 'a> {
    ctx: &'r RenderContext<'a>,
    item: &'r Item,
    element: &'r NamesElement,
    options: InheritableNameOptions,
    et_al_min: Option<u32>,
    et_al_use_first: Option<u32>,
    et_al_use_last: bool,
    english: bool,
}

impl<'r, 'a> NameListRenderer<'r, 'a> {
    fn new(ctx: &'r RenderContext<'a>, item: &'r Item, element: &'r NamesElement) -> Self {
        let layout_options = ctx.layout_name_options();
        let options = match &element.name {
            Some(name) => name.options.merge(&layout_options),
            None => layout_options,
        };

        let subsequent = ctx.is_subsequent_cite(item);
        let overrides = ctx.name_overrides;
        let et_al_min = overrides
            .et_al_min
            .or(options.et_al_subsequent_min.filter(|_| subsequent))
            .or(options.et_al_min);
        let et_al_use_first = overrides
            .et_al_use_first
            .or(options.et_al_subsequent_use_first.filter(|_| subsequent))
            .or(options.et_al_use_first);
        let et_al_use_last = overrides
            .et_al_use_last
            .or(options.et_al_use_last)
            .unwrap_or(false);

        Self {
            ctx,
            item,
            element,
            options,
            et_al_min,
            et_al_use_first,
            et_al_use_last,
            english: ctx.is_english(item),
        }
    }

    fn form(&self) -> NameForm {
        self.options.form.unwrap_or_default()
    }

    fn delimiter(&self) -> &str {
        self.options.delimiter.as_deref().unwrap_or(DEFAULT_DELIMITER)
    }

    fn sort_separator(&self) -> &str {
        self.options
            .sort_separator
            .as_deref()
            .unwrap_or(DEFAULT_SORT_SEPARATOR)
    }

    /// Sort keys always use inverted names.
    fn is_inverted(&self, rank: usize) -> bool {
        if self.ctx.phase == Phase::Sorting {
            return true;
        }
        match self.options.name_as_sort_order {
            Some(NameAsSortOrder::First) => rank == 0,
            Some(NameAsSortOrder::All) => true,
            None => false,
        }
    }

    fn truncation(&self, count: usize) -> Option<Truncation> {
        let min = self.et_al_min? as usize;
        let first = self.et_al_use_first? as usize;
        if first == 0 || count < min || first >= count {
            return None;
        }
        Some(Truncation {
            shown: first,
            use_last: self.et_al_use_last && min.saturating_sub(first) >= 2 && count >= first + 2,
        })
    }

    /// Number of names a list of `count` renders after et-al abbreviation.
    fn shown_count(&self, count: usize) -> usize {
        match self.truncation(count) {
            Some(t) if t.use_last => t.shown + 1,
            Some(t) => t.shown,
            None => count,
        }
    }

    fn render_list(&self, scratch: &mut ItemScratch, list: &NameList) -> String {
        let formatted: Vec<String> = list
            .names
            .iter()
            .enumerate()
            .map(|(rank, name)| self.format_name(name, rank))
            .collect();

        let body = match self.substitute_author(scratch, formatted) {
            Substituted::Whole(replacement) => replacement,
            Substituted::Names(names, replaced) => {
                let names: Vec<String> = names
                    .into_iter()
                    .zip(replaced)
                    .map(|(name, replaced)| {
                        if replaced {
                            name
                        } else {
                            self.ctx.apply_markup(list.variables[0], self.item, name)
                        }
                    })
                    .collect();
                self.join_names(&names)
            }
        };
        if body.is_empty() {
            return body;
        }

        let body = match &self.element.name {
            Some(name) if name.formatting.has_affixes() => crate::output::apply_affixes(
                &body,
                name.formatting.prefix.as_deref().unwrap_or_default(),
                name.formatting.suffix.as_deref().unwrap_or_default(),
                self.ctx.quotes,
            ),
            _ => body,
        };

        let Some(label) = &self.element.label else {
            return body;
        };
        if self.ctx.phase == Phase::Sorting {
            return body;
        }
        let plural = resolve_plural(label.plural, list.names.len() > 1);
        let term = term_text(self.ctx, list.term, label.form, plural);
        let term = render_with_formatting(&term, &label.formatting, self.ctx.quotes, self.english);
        if self.element.label_before_name {
            format!("{}{}", term, body)
        } else {
            format!("{}{}", body, term)
        }
    }

    /// Apply subsequent-author-substitute against the previous entry's
    /// first name list, and remember this entry's.
    fn substitute_author(&self, scratch: &mut ItemScratch, formatted: Vec<String>) -> Substituted {
        let unchanged = |formatted: Vec<String>| {
            let replaced = vec![false; formatted.len()];
            Substituted::Names(formatted, replaced)
        };

        let layout = self.ctx.layout;
        let applies = self.ctx.mode == RenderMode::Bibliography
            && self.ctx.phase != Phase::Sorting
            && scratch.first_names.is_none();
        if !applies {
            return unchanged(formatted);
        }
        scratch.first_names = Some(formatted.clone());

        let (Some(substitute), Some(previous)) = (
            layout.subsequent_author_substitute.as_deref(),
            scratch.previous_names.as_deref(),
        ) else {
            return unchanged(formatted);
        };

        let identical = previous == formatted.as_slice();
        let replaced: Vec<bool> = match layout.subsequent_author_substitute_rule {
            SubsequentAuthorSubstituteRule::CompleteAll => {
                if identical {
                    return Substituted::Whole(substitute.to_string());
                }
                vec![false; formatted.len()]
            }
            SubsequentAuthorSubstituteRule::CompleteEach => vec![identical; formatted.len()],
            SubsequentAuthorSubstituteRule::PartialEach => formatted
                .iter()
                .enumerate()
                .map(|(rank, name)| previous.get(rank) == Some(name))
                .collect(),
            SubsequentAuthorSubstituteRule::PartialFirst => formatted
                .iter()
                .enumerate()
                .map(|(rank, name)| rank == 0 && previous.first() == Some(name))
                .collect(),
        };

        let names = formatted
            .into_iter()
            .zip(&replaced)
            .map(|(name, replaced)| if *replaced { substitute.to_string() } else { name })
            .collect();
        Substituted::Names(names, replaced)
    }

    /// Join rendered names with et-al abbreviation or the "and" term.
    fn join_names(&self, names: &[String]) -> String {
        let delimiter = self.delimiter();
        let Some(truncation) = self.truncation(names.len()) else {
            return self.join_with_and(names);
        };

        let shown = names[..truncation.shown].join(delimiter);
        if truncation.use_last {
            let last = names.last().map(String::as_str).unwrap_or_default();
            return format!("{}{}… {}", shown, delimiter, last);
        }

        let et_al = self.et_al_term();
        if et_al.is_empty() {
            return shown;
        }
        let glue = match self.options.delimiter_precedes_et_al.unwrap_or_default() {
            DelimiterPrecedesLast::Never => " ",
            DelimiterPrecedesLast::Always => delimiter,
            DelimiterPrecedesLast::Contextual if truncation.shown >= 2 => delimiter,
            DelimiterPrecedesLast::Contextual => " ",
            DelimiterPrecedesLast::AfterInvertedName if self.is_inverted(truncation.shown - 1) => {
                delimiter
            }
            DelimiterPrecedesLast::AfterInvertedName => " ",
        };
        format!("{}{}{}", shown, glue, et_al)
    }

    fn join_with_and(&self, names: &[String]) -> String {
        let delimiter = self.delimiter();
        let Some((last, init)) = names.split_last() else {
            return String::new();
        };
        if init.is_empty() {
            return last.clone();
        }
        let Some(and) = self.and_term() else {
            return names.join(delimiter);
        };

        let glue = match self.options.delimiter_precedes_last.unwrap_or_default() {
            DelimiterPrecedesLast::Contextual if names.len() >= 3 => delimiter,
            DelimiterPrecedesLast::Contextual => " ",
            DelimiterPrecedesLast::Always => delimiter,
            DelimiterPrecedesLast::Never => " ",
            DelimiterPrecedesLast::AfterInvertedName if self.is_inverted(init.len() - 1) => {
                delimiter
            }
            DelimiterPrecedesLast::AfterInvertedName => " ",
        };
        format!("{}{}{} {}", init.join(delimiter), glue, and, last)
    }

    fn and_term(&self) -> Option<String> {
        match self.options.and? {
            NameAnd::Symbol => Some(AND_SYMBOL.to_string()),
            NameAnd::Text => Some(term_text(self.ctx, "and", TermForm::Long, false))
                .filter(|t| !t.is_empty()),
        }
    }

    fn et_al_term(&self) -> String {
        let (term, formatting) = match &self.element.et_al {
            Some(et_al) => (et_al.term.as_str(), Some(&et_al.formatting)),
            None => ("et-al", None),
        };
        let text = term_text(self.ctx, term, TermForm::Long, false);
        match formatting {
            Some(formatting) => {
                render_with_formatting(&text, formatting, self.ctx.quotes, self.english)
            }
            None => text,
        }
    }

    /// Render one name, without the `<name>` affixes.
    fn format_name(&self, name: &Name, rank: usize) -> String {
        let style_name = self.element.name.as_ref();
        let family_formatting = style_name.and_then(|n| n.family_formatting.as_ref());
        let given_formatting = style_name.and_then(|n| n.given_formatting.as_ref());
        let style = |text: String, formatting: Option<&Formatting>| match formatting {
            Some(formatting) => {
                render_with_formatting(&text, formatting, self.ctx.quotes, self.english)
            }
            None => text,
        };

        let text = if let Some(literal) = name.literal.as_deref().filter(|l| !l.is_empty()) {
            style(escape_html(literal), family_formatting)
        } else {
            let part = |value: &Option<String>| value.as_deref().map(escape_html).unwrap_or_default();
            let family = part(&name.family);
            let given = self.initialize(&part(&name.given));
            let dropping = part(&name.dropping_particle);
            let non_dropping = part(&name.non_dropping_particle);
            let suffix = part(&name.suffix);
            let short = self.form() == NameForm::Short;

            match detect_script(name) {
                Script::Latin if short => style(join_particle(&non_dropping, &family), family_formatting),
                Script::Latin if self.is_inverted(rank) => {
                    let demote = match (self.ctx.style.options.demote_non_dropping_particle, self.ctx.phase) {
                        (Some(DemoteNonDroppingParticle::Never), _) => false,
                        (Some(DemoteNonDroppingParticle::SortOnly), phase) => phase == Phase::Sorting,
                        _ => true,
                    };
                    let (family, given) = if demote {
                        (family, join_words(&[&given, &dropping, &non_dropping]))
                    } else {
                        (join_particle(&non_dropping, &family), join_words(&[&given, &dropping]))
                    };
                    let separator = self.sort_separator();
                    let mut text = style(family, family_formatting);
                    for rest in [style(given, given_formatting), suffix] {
                        if !rest.is_empty() {
                            text.push_str(separator);
                            text.push_str(&rest);
                        }
                    }
                    text
                }
                Script::Latin => {
                    let particles = join_words(&[&dropping, &non_dropping]);
                    let family = style(join_particle(&particles, &family), family_formatting);
                    let mut text = join_words(&[&style(given, given_formatting), &family]);
                    if !suffix.is_empty() {
                        text.push_str(if name.comma_suffix { ", " } else { " " });
                        text.push_str(&suffix);
                    }
                    text
                }
                Script::Cjk if short => style(family, family_formatting),
                Script::Cjk => format!(
                    "{}{}",
                    style(family, family_formatting),
                    style(given, given_formatting)
                ),
                Script::Other if short => style(family, family_formatting),
                Script::Other => join_words(&[
                    &style(family, family_formatting),
                    &style(given, given_formatting),
                ]),
            }
        };

        match style_name {
            Some(n) => render_with_formatting(
                &text,
                &n.formatting.without_affixes(),
                self.ctx.quotes,
                self.english,
            ),
            None => text,
        }
    }

    fn initialize(&self, given: &str) -> String {
        match self.options.initialize_with.as_deref() {
            Some(with) if self.options.initialize.unwrap_or(true) && !given.is_empty() => {
                initialize_given(given, with, self.ctx.style.options.initialize_with_hyphen)
            }
            _ => given.to_string(),
        }
    }
}

/// A name list after subsequent-author substitution.
enum Substituted {
    /// The whole list became this text.
    Whole(String),
    /// Names, and which of them were replaced.
    Names(Vec<String>, Vec<bool>),
}

fn detect_script(name: &Name) -> Script {
    let text = name.normalized();
    if text.chars().filter(|c| c.is_alphabetic()).all(is_latin_or_cyrillic) {
        Script::Latin
    } else if text.chars().any(is_cjk) {
        Script::Cjk
    } else {
        Script::Other
    }
}

fn is_latin_or_cyrillic(c: char) -> bool {
    matches!(c,
        '\u{0000}'..='\u{024F}'
        | '\u{1E00}'..='\u{1EFF}'
        | '\u{0400}'..='\u{052F}')
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}')
}

/// Particles ending in an apostrophe or hyphen attach without a space.
fn join_particle(particle: &str, family: &str) -> String {
    if particle.is_empty() {
        family.to_string()
    } else if particle.ends_with(['\'', '’', '-']) {
        format!("{}{}", particle, family)
    } else {
        format!("{} {}", particle, family)
    }
}

fn join_words<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(AsRef::as_ref)
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce given names to initials. Words already starting lowercase are
/// kept. Hyphenated names keep the hyphen when `hyphen` is set.
pub fn initialize_given(given: &str, with: &str, hyphen: bool) -> String {
    let initial_mark = with.trim_end();
    let gap = &with[initial_mark.len()..];

    given
        .split_whitespace()
        .map(|word| {
            let initials: Vec<String> = word
                .split('-')
                .filter(|part| !part.is_empty())
                .map(|part| match part.chars().next() {
                    Some(c) if c.is_lowercase() => part.to_string(),
                    Some(c) => format!("{}{}", c, initial_mark),
                    None => String::new(),
                })
                .collect();
            initials.join(if hyphen { "-" } else { gap })
        })
        .collect::<Vec<_>>()
        .join(gap)
}
