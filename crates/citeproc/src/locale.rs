//! Locale management for CSL term lookup.
//!
//! A [`Locales`] value is a priority-ordered chain: the style's own
//! `<locale>` overrides, then the embedded locale file for the requested
//! language, then the primary dialect of its base language, then en-US.

use crate::error::Result;
use crate::locale_parser::parse_locale_xml;
use citeproc_style::{DateForm, DateFormat, Locale, LocaleOptions, TermForm};
use rust_embed::Embed;
use tracing::{debug, warn};

/// Embedded locale files from the locales/ directory.
#[derive(Embed)]
#[folder = "locales/"]
#[include = "*.xml"]
struct LocaleFiles;

/// The locale used when nothing else is available.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Read access to localized terms, date formats and options.
pub trait LocaleStore {
    /// The requested language code.
    fn lang(&self) -> &str;

    /// Look up a term. Forms fall back along verb-short → verb → long and
    /// symbol → short → long. An explicitly empty term is `Some("")`.
    fn term(&self, name: &str, form: TermForm, plural: bool) -> Option<&str>;

    /// The localized date format for `form`.
    fn date_format(&self, form: DateForm) -> Option<&DateFormat>;

    fn options(&self) -> LocaleOptions;
}

/// Locale chain backed by the embedded locale files.
#[derive(Debug, Clone)]
pub struct Locales {
    lang: String,
    /// Highest priority first.
    chain: Vec<Locale>,
}

impl Locales {
    /// Build the chain for `lang` (en-US when `None`), with the style's
    /// locale overrides on top.
    pub fn new(lang: Option<&str>, overrides: &[Locale]) -> Result<Self> {
        let lang = lang.unwrap_or(DEFAULT_LOCALE).to_string();
        let base = base_language(&lang);

        let mut chain = matching_overrides(&lang, overrides);

        let mut codes: Vec<&str> = Vec::new();
        if lang.contains('-') {
            codes.push(&lang);
        }
        if let Some(dialect) = primary_dialect(base) {
            codes.push(dialect);
        }
        codes.push(DEFAULT_LOCALE);
        codes.dedup();

        let mut found_requested = false;
        for code in codes {
            match load_embedded_locale(code)? {
                Some(locale) => {
                    found_requested |= base_language(code) == base;
                    chain.push(locale);
                }
                None => debug!(lang = %code, "no embedded locale file"),
            }
        }

        if !found_requested {
            warn!(lang = %lang, "locale not available, falling back to {}", DEFAULT_LOCALE);
        }

        Ok(Self { lang, chain })
    }

    /// Language codes with an embedded locale file.
    pub fn available() -> Vec<String> {
        let mut codes: Vec<String> = LocaleFiles::iter()
            .filter_map(|name| {
                name.strip_prefix("locales-")
                    .and_then(|rest| rest.strip_suffix(".xml"))
                    .map(str::to_string)
            })
            .collect();
        codes.sort();
        codes
    }

    fn find_term(&self, name: &str, form: TermForm, plural: bool) -> Option<&str> {
        // Ordinal suffixes come as a set: only the first locale defining any
        // of them is consulted.
        let locales = if is_ordinal_term(name) {
            match self
                .chain
                .iter()
                .position(|l| l.terms.iter().any(|t| is_ordinal_term(&t.name)))
            {
                Some(i) => &self.chain[i..=i],
                None => &[],
            }
        } else {
            self.chain.as_slice()
        };
        locales.iter().find_map(|locale| {
            locale
                .terms
                .iter()
                .find(|t| t.name == name && t.form == form)
                .and_then(|t| t.text(plural))
        })
    }
}

impl LocaleStore for Locales {
    fn lang(&self) -> &str {
        &self.lang
    }

    fn term(&self, name: &str, form: TermForm, plural: bool) -> Option<&str> {
        let mut current = Some(form);
        while let Some(form) = current {
            if let Some(text) = self.find_term(name, form, plural) {
                return Some(text);
            }
            current = form.fallback();
        }
        None
    }

    fn date_format(&self, form: DateForm) -> Option<&DateFormat> {
        self.chain
            .iter()
            .find_map(|locale| locale.date_formats.iter().find(|df| df.form == form))
    }

    fn options(&self) -> LocaleOptions {
        LocaleOptions {
            punctuation_in_quote: self
                .chain
                .iter()
                .find_map(|l| l.options.punctuation_in_quote),
            limit_day_ordinals_to_day_1: self
                .chain
                .iter()
                .find_map(|l| l.options.limit_day_ordinals_to_day_1),
        }
    }
}

fn is_ordinal_term(name: &str) -> bool {
    name == "ordinal" || name.starts_with("ordinal-")
}

/// "en" for "en-US".
fn base_language(lang: &str) -> &str {
    lang.split('-').next().unwrap_or(lang)
}

/// The dialect used for a bare language code.
fn primary_dialect(base: &str) -> Option<&'static str> {
    match base {
        "en" => Some("en-US"),
        "de" => Some("de-DE"),
        "fr" => Some("fr-FR"),
        _ => None,
    }
}

/// Style overrides that apply to `lang`: exact match first, then the base
/// language, then overrides without a language.
fn matching_overrides(lang: &str, overrides: &[Locale]) -> Vec<Locale> {
    let base = base_language(lang);
    let exact = overrides.iter().filter(|l| l.lang.as_deref() == Some(lang));
    let by_base = overrides
        .iter()
        .filter(|l| base != lang && l.lang.as_deref() == Some(base));
    let general = overrides.iter().filter(|l| l.lang.is_none());
    exact.chain(by_base).chain(general).cloned().collect()
}

fn load_embedded_locale(code: &str) -> Result<Option<Locale>> {
    let filename = format!("locales-{}.xml", code);
    let Some(file) = LocaleFiles::get(&filename) else {
        return Ok(None);
    };
    let xml = String::from_utf8_lossy(file.data.as_ref());
    parse_locale_xml(code, &xml).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use citeproc_style::Term;

    fn en_us() -> Locales {
        Locales::new(Some("en-US"), &[]).unwrap()
    }

    #[test]
    fn test_get_term() {
        let locales = en_us();
        assert_eq!(locales.term("and", TermForm::Long, false), Some("and"));
        assert_eq!(locales.term("and", TermForm::Symbol, false), Some("&"));
        assert_eq!(locales.term("et-al", TermForm::Long, false), Some("et al."));
    }

    #[test]
    fn test_get_term_plural() {
        let locales = en_us();
        assert_eq!(locales.term("editor", TermForm::Long, false), Some("editor"));
        assert_eq!(locales.term("editor", TermForm::Long, true), Some("editors"));
        assert_eq!(locales.term("editor", TermForm::Short, false), Some("ed."));
        assert_eq!(locales.term("editor", TermForm::Short, true), Some("eds."));
    }

    #[test]
    fn test_form_fallback() {
        let locales = en_us();
        // "and" has no verb-short or verb form.
        assert_eq!(locales.term("and", TermForm::VerbShort, false), Some("and"));
        // "page" has no symbol form, but a short one.
        assert_eq!(locales.term("page", TermForm::Symbol, false), Some("p."));
        assert_eq!(locales.term("no-such-term", TermForm::Long, false), None);
    }

    #[test]
    fn test_month_names() {
        let locales = en_us();
        assert_eq!(locales.term("month-01", TermForm::Long, false), Some("January"));
        assert_eq!(locales.term("month-01", TermForm::Short, false), Some("Jan."));
        assert_eq!(locales.term("month-06", TermForm::Short, false), Some("June"));
    }

    #[test]
    fn test_german_terms() {
        let locales = Locales::new(Some("de-DE"), &[]).unwrap();
        assert_eq!(locales.term("and", TermForm::Long, false), Some("und"));
        assert_eq!(locales.term("month-01", TermForm::Long, false), Some("Januar"));
    }

    #[test]
    fn test_bare_language_uses_primary_dialect() {
        let locales = Locales::new(Some("fr"), &[]).unwrap();
        assert_eq!(locales.lang(), "fr");
        assert_eq!(locales.term("and", TermForm::Long, false), Some("et"));
    }

    #[test]
    fn test_unknown_locale_falls_back_to_en_us() {
        let locales = Locales::new(Some("xx-XX"), &[]).unwrap();
        assert_eq!(locales.term("and", TermForm::Long, false), Some("and"));
    }

    #[test]
    fn test_missing_term_in_dialect_falls_back_to_en_us() {
        let locales = Locales::new(Some("en-GB"), &[]).unwrap();
        // en-GB defines its own quotes but not every term.
        assert_eq!(locales.term("open-quote", TermForm::Long, false), Some("‘"));
        assert_eq!(locales.term("ibid", TermForm::Long, false), Some("ibid."));
    }

    #[test]
    fn test_ordinal_terms_do_not_mix_locales() {
        let locales = Locales::new(Some("de-DE"), &[]).unwrap();
        assert_eq!(locales.term("ordinal", TermForm::Long, false), Some("."));
        assert_eq!(locales.term("ordinal-01", TermForm::Long, false), None);
        assert_eq!(
            locales.term("long-ordinal-01", TermForm::Long, false),
            Some("erster")
        );
    }

    #[test]
    fn test_punctuation_in_quote() {
        assert_eq!(en_us().options().punctuation_in_quote, Some(true));
        let gb = Locales::new(Some("en-GB"), &[]).unwrap();
        assert_eq!(gb.options().punctuation_in_quote, Some(false));
    }

    #[test]
    fn test_style_overrides() {
        let term = |lang: Option<&str>, value: &str| Locale {
            lang: lang.map(str::to_string),
            terms: vec![Term {
                name: "and".to_string(),
                form: TermForm::Long,
                single: None,
                multiple: None,
                value: Some(value.to_string()),
            }],
            ..Default::default()
        };

        let overrides = vec![term(None, "plus"), term(Some("en"), "with"), term(Some("de"), "und")];
        let locales = Locales::new(Some("en-US"), &overrides).unwrap();
        assert_eq!(locales.term("and", TermForm::Long, false), Some("with"));

        let overrides = vec![term(None, "plus"), term(Some("de"), "und")];
        let locales = Locales::new(Some("en-US"), &overrides).unwrap();
        assert_eq!(locales.term("and", TermForm::Long, false), Some("plus"));

        let overrides = vec![term(Some("de"), "und")];
        let locales = Locales::new(Some("en-US"), &overrides).unwrap();
        assert_eq!(locales.term("and", TermForm::Long, false), Some("and"));
    }

    #[test]
    fn test_all_embedded_locales_parse() {
        let available = Locales::available();
        assert_eq!(available, vec!["de-DE", "en-GB", "en-US", "fr-FR"]);

        for code in available {
            let locale = load_embedded_locale(&code)
                .unwrap_or_else(|e| panic!("Failed to parse {}: {}", code, e))
                .unwrap();
            assert_eq!(locale.lang.as_deref(), Some(code.as_str()));
            assert!(!locale.terms.is_empty(), "Locale {} has no terms", code);
            assert_eq!(locale.date_formats.len(), 2, "Locale {} date formats", code);
        }
    }
}
