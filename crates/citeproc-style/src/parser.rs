//! Converts an XML tree into the typed style tree.

use crate::error::{Error, Result};
use crate::types::*;
use citeproc_xml::{Span, XmlDocument, XmlElement};
use std::collections::{HashMap, HashSet};

/// Parse a CSL style from a string.
///
/// # Example
///
/// ```rust
/// use citeproc_style::parse_csl;
///
/// let csl = r#"<?xml version="1.0" encoding="utf-8"?>
/// <style xmlns="http://purl.org/net/xbiblio/csl" class="in-text" version="1.0">
///   <info><title>Test</title></info>
///   <citation><layout><text variable="title"/></layout></citation>
/// </style>"#;
///
/// let style = parse_csl(csl).unwrap();
/// assert_eq!(style.class, citeproc_style::StyleClass::InText);
/// ```
pub fn parse_csl(content: &str) -> Result<Style> {
    let xml = citeproc_xml::parse(content)?;
    parse_csl_document(&xml)
}

/// Parse a Style from pre-parsed XML.
pub fn parse_csl_document(xml: &XmlDocument) -> Result<Style> {
    let style = CslParser.parse_style_element(&xml.root)?;
    validate_macros(&style)?;
    Ok(style)
}

/// Parse a `<locale>` element, either standalone or embedded in a style.
pub fn parse_locale(element: &XmlElement) -> Result<Locale> {
    CslParser.parse_locale(element)
}

/// Reject circular macro references.
///
/// References to undefined macros are allowed here; they render empty.
fn validate_macros(style: &Style) -> Result<()> {
    let mut names: Vec<&String> = style.macros.keys().collect();
    names.sort();

    for name in names {
        let mut visited = HashSet::new();
        let mut chain = vec![name.clone()];
        check_macro_cycle(name, &style.macros, &mut visited, &mut chain)?;
    }
    Ok(())
}

/// Depth-first search for a macro that reaches itself.
fn check_macro_cycle(
    start: &str,
    macros: &HashMap<String, Macro>,
    visited: &mut HashSet<String>,
    chain: &mut Vec<String>,
) -> Result<()> {
    let Some(macro_def) = macros.get(start) else {
        return Ok(());
    };

    for (ref_name, span) in collect_macro_refs(&macro_def.elements) {
        if chain.contains(&ref_name) {
            chain.push(ref_name);
            return Err(Error::CircularMacro {
                chain: chain.clone(),
                span,
            });
        }

        if visited.insert(ref_name.clone()) {
            chain.push(ref_name.clone());
            check_macro_cycle(&ref_name, macros, visited, chain)?;
            chain.pop();
        }
    }
    Ok(())
}

fn collect_macro_refs(elements: &[Element]) -> Vec<(String, Span)> {
    let mut refs = Vec::new();
    for element in elements {
        collect_macro_refs_from_element(element, &mut refs);
    }
    refs
}

fn collect_macro_refs_from_element(element: &Element, refs: &mut Vec<(String, Span)>) {
    match &element.element_type {
        ElementType::Text(text) => {
            if let TextSource::Macro { name, span } = &text.source {
                refs.push((name.clone(), *span));
            }
        }
        ElementType::Group(group) => {
            for el in &group.elements {
                collect_macro_refs_from_element(el, refs);
            }
        }
        ElementType::Choose(choose) => {
            for branch in &choose.branches {
                for el in &branch.elements {
                    collect_macro_refs_from_element(el, refs);
                }
            }
        }
        ElementType::Names(names) => {
            if let Some(substitute) = &names.substitute {
                for el in substitute {
                    collect_macro_refs_from_element(el, refs);
                }
            }
        }
        ElementType::Number(_) | ElementType::Label(_) | ElementType::Date(_) => {}
    }
}

struct CslParser;

impl CslParser {
    fn parse_style_element(&self, element: &XmlElement) -> Result<Style> {
        if element.name != "style" {
            return Err(Error::InvalidRootElement {
                expected: "style".to_string(),
                found: element.name.clone(),
                span: element.span,
            });
        }

        let version = self.require_attr(element, "version")?.to_string();

        let class = match self.require_attr(element, "class")? {
            "in-text" => StyleClass::InText,
            "note" => StyleClass::Note,
            other => {
                return Err(Error::InvalidAttributeValue {
                    element: "style".to_string(),
                    attribute: "class".to_string(),
                    value: other.to_string(),
                    expected: "\"in-text\" or \"note\"".to_string(),
                    span: element.span,
                });
            }
        };

        let default_locale = self.get_attr(element, "default-locale").map(str::to_string);
        let options = self.parse_style_options(element);
        let name_options = self.parse_inheritable_name_options(element, true);

        let mut info = None;
        let mut locales = Vec::new();
        let mut macros: HashMap<String, Macro> = HashMap::new();
        let mut citation = None;
        let mut bibliography = None;

        for child in element.elements() {
            match child.name.as_str() {
                "info" => info = Some(self.parse_info(child)),
                "locale" => locales.push(self.parse_locale(child)?),
                "macro" => {
                    let macro_def = self.parse_macro(child)?;
                    if macros.contains_key(&macro_def.name) {
                        return Err(Error::DuplicateMacro {
                            name: macro_def.name,
                            span: child.span,
                        });
                    }
                    macros.insert(macro_def.name.clone(), macro_def);
                }
                "citation" => citation = Some(self.parse_layout(child)?),
                "bibliography" => bibliography = Some(self.parse_layout(child)?),
                _ => {}
            }
        }

        let citation = citation.ok_or_else(|| Error::MissingElement {
            parent: "style".to_string(),
            element: "citation".to_string(),
            span: element.span,
        })?;

        Ok(Style {
            version,
            class,
            default_locale,
            options,
            info,
            locales,
            macros,
            citation,
            bibliography,
            name_options,
            span: element.span,
        })
    }

    fn parse_style_options(&self, element: &XmlElement) -> StyleOptions {
        let demote_non_dropping_particle = self
            .get_attr(element, "demote-non-dropping-particle")
            .and_then(|v| match v {
                "never" => Some(DemoteNonDroppingParticle::Never),
                "sort-only" => Some(DemoteNonDroppingParticle::SortOnly),
                "display-and-sort" => Some(DemoteNonDroppingParticle::DisplayAndSort),
                _ => None,
            });

        let initialize_with_hyphen = self
            .get_attr(element, "initialize-with-hyphen")
            .is_none_or(|v| v == "true");

        let page_range_format =
            self.get_attr(element, "page-range-format")
                .and_then(|v| match v {
                    "chicago" | "chicago-15" | "chicago-16" => Some(PageRangeFormat::Chicago),
                    "expanded" => Some(PageRangeFormat::Expanded),
                    "minimal" => Some(PageRangeFormat::Minimal),
                    "minimal-two" => Some(PageRangeFormat::MinimalTwo),
                    _ => None,
                });

        StyleOptions {
            demote_non_dropping_particle,
            initialize_with_hyphen,
            page_range_format,
        }
    }

    fn parse_info(&self, element: &XmlElement) -> StyleInfo {
        let mut info = StyleInfo::default();
        for child in element.elements() {
            match child.name.as_str() {
                "title" => info.title = child.text(),
                "id" => info.id = child.text(),
                "updated" => info.updated = child.text(),
                _ => {}
            }
        }
        info
    }

    fn parse_locale(&self, element: &XmlElement) -> Result<Locale> {
        let lang = element
            .get_prefixed_attribute("xml", "lang")
            .map(str::to_string);

        let mut terms = Vec::new();
        let mut date_formats = Vec::new();
        let mut options = LocaleOptions::default();

        for child in element.elements() {
            match child.name.as_str() {
                "terms" => {
                    for term_el in child.get_children("term") {
                        terms.push(self.parse_term(term_el)?);
                    }
                }
                "date" => date_formats.push(self.parse_date_format(child)?),
                "style-options" => {
                    options = LocaleOptions {
                        punctuation_in_quote: self
                            .get_attr(child, "punctuation-in-quote")
                            .map(|v| v == "true"),
                        limit_day_ordinals_to_day_1: self
                            .get_attr(child, "limit-day-ordinals-to-day-1")
                            .map(|v| v == "true"),
                    };
                }
                _ => {}
            }
        }

        Ok(Locale {
            lang,
            terms,
            date_formats,
            options,
            span: element.span,
        })
    }

    fn parse_term(&self, element: &XmlElement) -> Result<Term> {
        let name = self.require_attr(element, "name")?.to_string();
        let form = self.parse_term_form(element);

        let single = element.get_child("single").map(|c| c.text().unwrap_or_default());
        let multiple = element
            .get_child("multiple")
            .map(|c| c.text().unwrap_or_default());

        // An element without text is an explicitly empty term.
        let value = if single.is_none() && multiple.is_none() {
            Some(element.text().unwrap_or_default())
        } else {
            None
        };

        Ok(Term {
            name,
            form,
            single,
            multiple,
            value,
        })
    }

    fn parse_term_form(&self, element: &XmlElement) -> TermForm {
        self.get_attr(element, "form")
            .map(|v| match v {
                "short" => TermForm::Short,
                "verb" => TermForm::Verb,
                "verb-short" => TermForm::VerbShort,
                "symbol" => TermForm::Symbol,
                _ => TermForm::Long,
            })
            .unwrap_or_default()
    }

    fn parse_date_format(&self, element: &XmlElement) -> Result<DateFormat> {
        let form = match self.get_attr(element, "form") {
            Some("numeric") => DateForm::Numeric,
            _ => DateForm::Text,
        };

        let mut parts = Vec::new();
        for child in element.get_children("date-part") {
            parts.push(self.parse_date_part(child)?);
        }

        Ok(DateFormat {
            form,
            parts,
            delimiter: self.get_attr(element, "delimiter").map(str::to_string),
        })
    }

    fn parse_macro(&self, element: &XmlElement) -> Result<Macro> {
        Ok(Macro {
            name: self.require_attr(element, "name")?.to_string(),
            elements: self.parse_elements(element)?,
            span: element.span,
        })
    }

    /// Parse `<citation>` or `<bibliography>` with its `<layout>` child.
    fn parse_layout(&self, element: &XmlElement) -> Result<Layout> {
        let layout_element = element
            .get_child("layout")
            .ok_or_else(|| Error::MissingElement {
                parent: element.name.clone(),
                element: "layout".to_string(),
                span: element.span,
            })?;

        let sort = element
            .get_child("sort")
            .map(|s| self.parse_sort(s))
            .transpose()?;

        let near_note_distance = self
            .get_attr(element, "near-note-distance")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5);

        let second_field_align =
            self.get_attr(element, "second-field-align")
                .and_then(|v| match v {
                    "flush" => Some(SecondFieldAlign::Flush),
                    "margin" => Some(SecondFieldAlign::Margin),
                    _ => None,
                });

        let subsequent_author_substitute_rule = self
            .get_attr(element, "subsequent-author-substitute-rule")
            .map(|v| match v {
                "complete-each" => SubsequentAuthorSubstituteRule::CompleteEach,
                "partial-each" => SubsequentAuthorSubstituteRule::PartialEach,
                "partial-first" => SubsequentAuthorSubstituteRule::PartialFirst,
                _ => SubsequentAuthorSubstituteRule::CompleteAll,
            })
            .unwrap_or_default();

        Ok(Layout {
            formatting: self.parse_formatting(layout_element),
            delimiter: self.get_attr(layout_element, "delimiter").map(str::to_string),
            sort,
            name_options: self.parse_inheritable_name_options(element, true),
            elements: self.parse_elements(layout_element)?,
            near_note_distance,
            second_field_align,
            subsequent_author_substitute: self
                .get_attr(element, "subsequent-author-substitute")
                .map(str::to_string),
            subsequent_author_substitute_rule,
            span: element.span,
        })
    }

    /// Name options as attributes.
    ///
    /// On style, citation and bibliography the delimiter and form carry a
    /// `name-` prefix; on `<name>` they do not.
    fn parse_inheritable_name_options(
        &self,
        element: &XmlElement,
        inherited: bool,
    ) -> InheritableNameOptions {
        let (delimiter_attr, form_attr) = if inherited {
            ("name-delimiter", "name-form")
        } else {
            ("delimiter", "form")
        };

        let parse_precedes = |v: &str| match v {
            "always" => DelimiterPrecedesLast::Always,
            "never" => DelimiterPrecedesLast::Never,
            "after-inverted-name" => DelimiterPrecedesLast::AfterInvertedName,
            _ => DelimiterPrecedesLast::Contextual,
        };
        let parse_u32 = |name: &str| self.get_attr(element, name).and_then(|v| v.parse().ok());

        InheritableNameOptions {
            and: self.get_attr(element, "and").map(|v| match v {
                "symbol" => NameAnd::Symbol,
                _ => NameAnd::Text,
            }),
            delimiter: self.get_attr(element, delimiter_attr).map(str::to_string),
            delimiter_precedes_last: self
                .get_attr(element, "delimiter-precedes-last")
                .map(parse_precedes),
            delimiter_precedes_et_al: self
                .get_attr(element, "delimiter-precedes-et-al")
                .map(parse_precedes),
            et_al_min: parse_u32("et-al-min"),
            et_al_use_first: parse_u32("et-al-use-first"),
            et_al_subsequent_min: parse_u32("et-al-subsequent-min"),
            et_al_subsequent_use_first: parse_u32("et-al-subsequent-use-first"),
            et_al_use_last: self.get_attr(element, "et-al-use-last").map(|v| v == "true"),
            initialize: self.get_attr(element, "initialize").map(|v| v != "false"),
            initialize_with: self.get_attr(element, "initialize-with").map(str::to_string),
            form: self.get_attr(element, form_attr).map(|v| match v {
                "short" => NameForm::Short,
                "count" => NameForm::Count,
                _ => NameForm::Long,
            }),
            name_as_sort_order: self.get_attr(element, "name-as-sort-order").map(|v| match v {
                "all" => NameAsSortOrder::All,
                _ => NameAsSortOrder::First,
            }),
            sort_separator: self.get_attr(element, "sort-separator").map(str::to_string),
            names_delimiter: if inherited {
                self.get_attr(element, "names-delimiter").map(str::to_string)
            } else {
                None
            },
        }
    }

    fn parse_sort(&self, element: &XmlElement) -> Result<Sort> {
        let mut keys = Vec::new();
        for child in element.get_children("key") {
            keys.push(self.parse_sort_key(child)?);
        }
        Ok(Sort {
            keys,
            span: element.span,
        })
    }

    fn parse_sort_key(&self, element: &XmlElement) -> Result<SortKey> {
        let key = if let Some(var) = self.get_attr(element, "variable") {
            SortKeyType::Variable(var.to_string())
        } else if let Some(mac) = self.get_attr(element, "macro") {
            SortKeyType::Macro(mac.to_string())
        } else {
            return Err(Error::MissingAttribute {
                element: "key".to_string(),
                attribute: "variable or macro".to_string(),
                span: element.span,
            });
        };

        let sort_order = match self.get_attr(element, "sort") {
            Some("descending") => SortOrder::Descending,
            _ => SortOrder::Ascending,
        };

        Ok(SortKey {
            key,
            sort_order,
            names_min: self.get_attr(element, "names-min").and_then(|v| v.parse().ok()),
            names_use_first: self
                .get_attr(element, "names-use-first")
                .and_then(|v| v.parse().ok()),
            names_use_last: self.get_attr(element, "names-use-last").map(|v| v == "true"),
        })
    }

    fn parse_elements(&self, parent: &XmlElement) -> Result<Vec<Element>> {
        parent
            .elements()
            .map(|child| self.parse_element(child, &parent.name))
            .collect()
    }

    fn parse_element(&self, element: &XmlElement, context: &str) -> Result<Element> {
        let element_type = match element.name.as_str() {
            "text" => ElementType::Text(self.parse_text_element(element)?),
            "number" => ElementType::Number(self.parse_number_element(element)?),
            "label" => ElementType::Label(self.parse_label_element(element)?),
            "names" => ElementType::Names(self.parse_names_element(element)?),
            "date" => ElementType::Date(self.parse_date_element(element)?),
            "group" => ElementType::Group(self.parse_group_element(element)?),
            "choose" => ElementType::Choose(self.parse_choose_element(element)?),
            other => {
                return Err(Error::UnknownElement {
                    element: other.to_string(),
                    context: context.to_string(),
                    span: element.span,
                });
            }
        };

        Ok(Element {
            element_type,
            formatting: self.parse_formatting(element),
            span: element.span,
        })
    }

    fn parse_text_element(&self, element: &XmlElement) -> Result<TextElement> {
        let source = if let Some(name) = self.get_attr(element, "variable") {
            let form = match self.get_attr(element, "form") {
                Some("short") => VariableForm::Short,
                _ => VariableForm::Long,
            };
            TextSource::Variable {
                name: name.to_string(),
                form,
            }
        } else if let Some(name) = self.get_attr(element, "macro") {
            TextSource::Macro {
                name: name.to_string(),
                span: element.span,
            }
        } else if let Some(name) = self.get_attr(element, "term") {
            TextSource::Term {
                name: name.to_string(),
                form: self.parse_term_form(element),
                plural: self.get_attr(element, "plural") == Some("true"),
            }
        } else if let Some(value) = self.get_attr(element, "value") {
            TextSource::Value {
                value: value.to_string(),
            }
        } else {
            return Err(Error::MissingTextSource { span: element.span });
        };

        Ok(TextElement { source })
    }

    fn parse_number_element(&self, element: &XmlElement) -> Result<NumberElement> {
        let variable = self.require_attr(element, "variable")?.to_string();
        let form = match self.get_attr(element, "form") {
            Some("ordinal") => NumberForm::Ordinal,
            Some("long-ordinal") => NumberForm::LongOrdinal,
            Some("roman") => NumberForm::Roman,
            _ => NumberForm::Numeric,
        };
        Ok(NumberElement { variable, form })
    }

    fn parse_label_plural(&self, element: &XmlElement) -> LabelPlural {
        match self.get_attr(element, "plural") {
            Some("always") => LabelPlural::Always,
            Some("never") => LabelPlural::Never,
            _ => LabelPlural::Contextual,
        }
    }

    fn parse_label_element(&self, element: &XmlElement) -> Result<LabelElement> {
        Ok(LabelElement {
            variable: self.require_attr(element, "variable")?.to_string(),
            form: self.parse_term_form(element),
            plural: self.parse_label_plural(element),
        })
    }

    fn parse_names_element(&self, element: &XmlElement) -> Result<NamesElement> {
        let variables: Vec<String> = self
            .require_attr(element, "variable")?
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let mut name = None;
        let mut et_al = None;
        let mut label = None;
        let mut substitute = None;
        let mut label_before_name = false;

        for child in element.elements() {
            match child.name.as_str() {
                "name" => name = Some(self.parse_name(child)),
                "et-al" => {
                    et_al = Some(EtAl {
                        term: self.get_attr(child, "term").unwrap_or("et-al").to_string(),
                        formatting: self.parse_formatting(child),
                    });
                }
                "label" => {
                    label = Some(NamesLabel {
                        form: self.parse_term_form(child),
                        plural: self.parse_label_plural(child),
                        formatting: self.parse_formatting(child),
                    });
                    label_before_name = name.is_none();
                }
                "substitute" => substitute = Some(self.parse_elements(child)?),
                other => {
                    return Err(Error::UnknownElement {
                        element: other.to_string(),
                        context: "names".to_string(),
                        span: child.span,
                    });
                }
            }
        }

        Ok(NamesElement {
            variables,
            delimiter: self.get_attr(element, "delimiter").map(str::to_string),
            name,
            et_al,
            label,
            label_before_name,
            substitute,
        })
    }

    fn parse_name(&self, element: &XmlElement) -> Name {
        let mut family_formatting = None;
        let mut given_formatting = None;
        for child in element.get_children("name-part") {
            let formatting = self.parse_formatting(child);
            if formatting.is_empty() {
                continue;
            }
            match self.get_attr(child, "name") {
                Some("family") => family_formatting = Some(formatting),
                Some("given") => given_formatting = Some(formatting),
                _ => {}
            }
        }

        Name {
            options: self.parse_inheritable_name_options(element, false),
            formatting: self.parse_formatting(element),
            family_formatting,
            given_formatting,
        }
    }

    fn parse_date_element(&self, element: &XmlElement) -> Result<DateElement> {
        let variable = self.require_attr(element, "variable")?.to_string();

        let form = self.get_attr(element, "form").map(|v| match v {
            "numeric" => DateForm::Numeric,
            _ => DateForm::Text,
        });

        let date_parts = match self.get_attr(element, "date-parts") {
            Some("year") => DatePartsFilter::Year,
            Some("year-month") => DatePartsFilter::YearMonth,
            _ => DatePartsFilter::YearMonthDay,
        };

        let mut parts = Vec::new();
        for child in element.elements() {
            if child.name != "date-part" {
                return Err(Error::UnknownElement {
                    element: child.name.clone(),
                    context: "date".to_string(),
                    span: child.span,
                });
            }
            parts.push(self.parse_date_part(child)?);
        }

        Ok(DateElement {
            variable,
            form,
            date_parts,
            parts,
            delimiter: self.get_attr(element, "delimiter").map(str::to_string),
        })
    }

    fn parse_date_part(&self, element: &XmlElement) -> Result<DatePart> {
        let name = match self.require_attr(element, "name")? {
            "year" => DatePartName::Year,
            "month" => DatePartName::Month,
            "day" => DatePartName::Day,
            other => {
                return Err(Error::InvalidAttributeValue {
                    element: "date-part".to_string(),
                    attribute: "name".to_string(),
                    value: other.to_string(),
                    expected: "\"year\", \"month\", or \"day\"".to_string(),
                    span: element.span,
                });
            }
        };

        let form = self.get_attr(element, "form").map(|v| match v {
            "short" => DatePartForm::Short,
            "numeric" => DatePartForm::Numeric,
            "numeric-leading-zeros" => DatePartForm::NumericLeadingZeros,
            "ordinal" => DatePartForm::Ordinal,
            _ => DatePartForm::Long,
        });

        Ok(DatePart {
            name,
            form,
            formatting: self.parse_formatting(element),
            range_delimiter: self.get_attr(element, "range-delimiter").map(str::to_string),
        })
    }

    fn parse_group_element(&self, element: &XmlElement) -> Result<GroupElement> {
        Ok(GroupElement {
            elements: self.parse_elements(element)?,
            delimiter: self.get_attr(element, "delimiter").map(str::to_string),
        })
    }

    fn parse_choose_element(&self, element: &XmlElement) -> Result<ChooseElement> {
        let mut branches = Vec::new();

        for child in element.elements() {
            match child.name.as_str() {
                "if" | "else-if" => branches.push(self.parse_choose_branch(child, false)?),
                "else" => branches.push(self.parse_choose_branch(child, true)?),
                other => {
                    return Err(Error::UnknownElement {
                        element: other.to_string(),
                        context: "choose".to_string(),
                        span: child.span,
                    });
                }
            }
        }

        Ok(ChooseElement { branches })
    }

    fn parse_choose_branch(&self, element: &XmlElement, is_else: bool) -> Result<ChooseBranch> {
        let conditions = if is_else {
            Vec::new()
        } else {
            let conditions = self.parse_conditions(element);
            if conditions.is_empty() {
                return Err(Error::MissingAttribute {
                    element: element.name.clone(),
                    attribute: "condition".to_string(),
                    span: element.span,
                });
            }
            conditions
        };

        let match_type = match self.get_attr(element, "match") {
            Some("any") => MatchType::Any,
            Some("none") => MatchType::None,
            _ => MatchType::All,
        };

        Ok(ChooseBranch {
            conditions,
            match_type,
            elements: self.parse_elements(element)?,
            span: element.span,
        })
    }

    fn parse_conditions(&self, element: &XmlElement) -> Vec<Condition> {
        let list = |name: &str| -> Option<Vec<String>> {
            self.get_attr(element, name)
                .map(|v| v.split_whitespace().map(str::to_string).collect())
        };

        let mut conditions = Vec::new();
        if let Some(types) = list("type") {
            conditions.push(Condition::Type(types));
        }
        if let Some(vars) = list("variable") {
            conditions.push(Condition::Variable(vars));
        }
        if let Some(vars) = list("is-numeric") {
            conditions.push(Condition::IsNumeric(vars));
        }
        if let Some(vars) = list("is-uncertain-date") {
            conditions.push(Condition::IsUncertainDate(vars));
        }
        if let Some(locators) = list("locator") {
            conditions.push(Condition::Locator(locators));
        }
        if let Some(positions) = list("position") {
            let positions = positions
                .iter()
                .filter_map(|s| match s.as_str() {
                    "first" => Some(Position::First),
                    "subsequent" => Some(Position::Subsequent),
                    "ibid-with-locator" => Some(Position::IbidWithLocator),
                    "ibid" => Some(Position::Ibid),
                    "near-note" => Some(Position::NearNote),
                    _ => None,
                })
                .collect();
            conditions.push(Condition::Position(positions));
        }
        if let Some(value) = self.get_attr(element, "disambiguate") {
            conditions.push(Condition::Disambiguate(value == "true"));
        }
        conditions
    }

    fn parse_formatting(&self, element: &XmlElement) -> Formatting {
        Formatting {
            font_style: self.get_attr(element, "font-style").and_then(|v| match v {
                "italic" => Some(FontStyle::Italic),
                "oblique" => Some(FontStyle::Oblique),
                "normal" => Some(FontStyle::Normal),
                _ => None,
            }),
            font_variant: self.get_attr(element, "font-variant").and_then(|v| match v {
                "small-caps" => Some(FontVariant::SmallCaps),
                "normal" => Some(FontVariant::Normal),
                _ => None,
            }),
            font_weight: self.get_attr(element, "font-weight").and_then(|v| match v {
                "bold" => Some(FontWeight::Bold),
                "light" => Some(FontWeight::Light),
                "normal" => Some(FontWeight::Normal),
                _ => None,
            }),
            text_decoration: self
                .get_attr(element, "text-decoration")
                .and_then(|v| match v {
                    "underline" => Some(TextDecoration::Underline),
                    "none" => Some(TextDecoration::None),
                    _ => None,
                }),
            vertical_align: self.get_attr(element, "vertical-align").and_then(|v| match v {
                "sup" => Some(VerticalAlign::Sup),
                "sub" => Some(VerticalAlign::Sub),
                "baseline" => Some(VerticalAlign::Baseline),
                _ => None,
            }),
            text_case: self.get_attr(element, "text-case").and_then(|v| match v {
                "lowercase" => Some(TextCase::Lowercase),
                "uppercase" => Some(TextCase::Uppercase),
                "capitalize-first" => Some(TextCase::CapitalizeFirst),
                "capitalize-all" => Some(TextCase::CapitalizeAll),
                "sentence" => Some(TextCase::Sentence),
                "title" => Some(TextCase::Title),
                _ => None,
            }),
            prefix: self.get_attr(element, "prefix").map(str::to_string),
            suffix: self.get_attr(element, "suffix").map(str::to_string),
            display: self.get_attr(element, "display").and_then(|v| match v {
                "block" => Some(Display::Block),
                "left-margin" => Some(Display::LeftMargin),
                "right-inline" => Some(Display::RightInline),
                "indent" => Some(Display::Indent),
                _ => None,
            }),
            quotes: self.get_attr(element, "quotes") == Some("true"),
            strip_periods: self.get_attr(element, "strip-periods") == Some("true"),
        }
    }

    // Helper methods

    fn require_attr<'a>(&self, element: &'a XmlElement, name: &str) -> Result<&'a str> {
        element
            .get_attribute(name)
            .ok_or_else(|| Error::MissingAttribute {
                element: element.name.clone(),
                attribute: name.to_string(),
                span: element.span,
            })
    }

    fn get_attr<'a>(&self, element: &'a XmlElement, name: &str) -> Option<&'a str> {
        element.get_attribute(name)
    }
}
