//! Item types for CSL-JSON bibliographic data.
//!
//! An [`Item`] keeps name lists, dates and scalar fields in separate maps
//! keyed by CSL variable name, so any variable the style names can be
//! looked up without a per-field match. Fields the processor does not
//! recognise stay in the scalar map and remain addressable.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// CSL name variables.
pub const NAME_VARIABLES: &[&str] = &[
    "author",
    "chair",
    "collection-editor",
    "compiler",
    "composer",
    "container-author",
    "contributor",
    "curator",
    "director",
    "editor",
    "editor-translator",
    "editorial-director",
    "executive-producer",
    "guest",
    "host",
    "illustrator",
    "interviewer",
    "narrator",
    "organizer",
    "original-author",
    "performer",
    "producer",
    "recipient",
    "reviewed-author",
    "script-writer",
    "series-creator",
    "translator",
];

/// CSL date variables.
pub const DATE_VARIABLES: &[&str] = &[
    "accessed",
    "available-date",
    "container",
    "event-date",
    "issued",
    "original-date",
    "submitted",
];

/// Variables that are compared and labelled as numbers.
pub const NUMBER_VARIABLES: &[&str] = &[
    "chapter-number",
    "citation-number",
    "collection-number",
    "edition",
    "first-reference-note-number",
    "issue",
    "locator",
    "number",
    "number-of-pages",
    "number-of-volumes",
    "page",
    "page-first",
    "part-number",
    "printing-number",
    "section",
    "supplement-number",
    "version",
    "volume",
];

/// A bibliographic item in CSL-JSON format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    /// Unique identifier. CSL-JSON allows both strings and integers.
    pub id: String,

    /// Item type (e.g., "book", "article-journal"). Empty when absent.
    pub item_type: String,

    /// Name lists by variable.
    pub names: BTreeMap<String, Vec<Name>>,

    /// Dates by variable.
    pub dates: BTreeMap<String, DateVariable>,

    /// Every other field, as given.
    pub variables: BTreeMap<String, Value>,
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let fields = Map::<String, Value>::deserialize(deserializer)?;
        let mut item = Item::default();

        for (key, value) in fields {
            match key.as_str() {
                "id" => {
                    item.id = match value {
                        Value::String(s) => s,
                        Value::Number(n) => n.to_string(),
                        _ => return Err(D::Error::custom("expected string or number for id")),
                    };
                }
                "type" => {
                    item.item_type = value.as_str().unwrap_or_default().to_string();
                }
                _ if NAME_VARIABLES.contains(&key.as_str()) => {
                    let names: Vec<Name> = serde_json::from_value(value)
                        .map_err(|e| D::Error::custom(format!("{}: {}", key, e)))?;
                    item.names.insert(key, names);
                }
                _ if DATE_VARIABLES.contains(&key.as_str()) => {
                    let date: DateVariable = serde_json::from_value(value)
                        .map_err(|e| D::Error::custom(format!("{}: {}", key, e)))?;
                    item.dates.insert(key, date);
                }
                _ => {
                    item.variables.insert(key, value);
                }
            }
        }

        if item.id.is_empty() {
            return Err(D::Error::missing_field("id"));
        }
        Ok(item)
    }
}

impl Item {
    /// Get a scalar variable as text. Numbers are formatted in decimal.
    ///
    /// Empty strings count as absent.
    pub fn get_variable(&self, name: &str) -> Option<String> {
        let value = match self.variables.get(name)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if value.is_empty() { None } else { Some(value) }
    }

    /// Get a name list. Empty lists count as absent.
    pub fn get_names(&self, name: &str) -> Option<&[Name]> {
        self.names
            .get(name)
            .map(Vec::as_slice)
            .filter(|names| !names.is_empty())
    }

    /// Get a date variable.
    pub fn get_date(&self, name: &str) -> Option<&DateVariable> {
        self.dates.get(name)
    }

    /// True when the variable has a value of any kind.
    pub fn has_variable(&self, name: &str) -> bool {
        match name {
            "id" => true,
            "type" => !self.item_type.is_empty(),
            _ => {
                self.get_names(name).is_some()
                    || self.get_date(name).is_some_and(DateVariable::has_content)
                    || self.get_variable(name).is_some()
            }
        }
    }
}

/// A name in CSL-JSON format.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq, Hash)]
pub struct Name {
    pub family: Option<String>,

    pub given: Option<String>,

    /// Dropping particle (e.g., "de" in "Jean de La Fontaine").
    #[serde(rename = "dropping-particle")]
    pub dropping_particle: Option<String>,

    /// Non-dropping particle (e.g., "La" in "Jean de La Fontaine").
    #[serde(rename = "non-dropping-particle")]
    pub non_dropping_particle: Option<String>,

    /// Suffix (e.g., "Jr.", "III").
    pub suffix: Option<String>,

    /// A comma separates the suffix from the rest of an uninverted name.
    #[serde(rename = "comma-suffix", default, deserialize_with = "lenient_bool")]
    pub comma_suffix: bool,

    /// Institutional or otherwise unstructured name.
    pub literal: Option<String>,
}

impl Name {
    pub fn is_literal(&self) -> bool {
        self.literal.is_some()
    }

    /// A name needs a family name or a literal to be rendered.
    pub fn is_renderable(&self) -> bool {
        self.literal.as_deref().is_some_and(|s| !s.is_empty())
            || self.family.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// All name parts joined with spaces, for script detection.
    pub fn normalized(&self) -> String {
        [
            &self.given,
            &self.dropping_particle,
            &self.non_dropping_particle,
            &self.family,
            &self.suffix,
            &self.literal,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// A date variable in CSL-JSON format.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(from = "DateInput")]
pub struct DateVariable {
    /// `[[year, month, day]]`, or two entries for a range.
    pub date_parts: Vec<Vec<i32>>,

    /// Literal date string, rendered verbatim.
    pub literal: Option<String>,

    /// Unparsed date string.
    pub raw: Option<String>,

    /// Season (1=spring, 2=summer, 3=autumn, 4=winter).
    pub season: Option<i32>,

    /// Approximate date.
    pub circa: bool,
}

/// Wire shape of a date: either an object or a bare raw string.
#[derive(Deserialize)]
#[serde(untagged)]
enum DateInput {
    Raw(String),
    Object {
        #[serde(rename = "date-parts", default, deserialize_with = "deserialize_date_parts")]
        date_parts: Vec<Vec<i32>>,
        #[serde(default)]
        literal: Option<String>,
        #[serde(default)]
        raw: Option<String>,
        #[serde(default, deserialize_with = "lenient_int")]
        season: Option<i32>,
        #[serde(default, deserialize_with = "lenient_bool")]
        circa: bool,
    },
}

impl From<DateInput> for DateVariable {
    fn from(input: DateInput) -> Self {
        match input {
            DateInput::Raw(raw) => DateVariable {
                raw: Some(raw),
                ..Default::default()
            },
            DateInput::Object {
                date_parts,
                literal,
                raw,
                season,
                circa,
            } => DateVariable {
                date_parts,
                literal,
                raw,
                season,
                circa,
            },
        }
    }
}

/// Accepts integers, numeric strings and null inside date-parts.
fn deserialize_date_parts<'de, D>(deserializer: D) -> Result<Vec<Vec<i32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Vec<Value>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|part| part.iter().map_while(value_as_int).collect::<Vec<_>>())
        .filter(|part| !part.is_empty())
        .collect())
}

fn value_as_int(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_int(&value))
}

/// CSL-JSON producers write flags as booleans, numbers or strings.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => !s.is_empty() && s != "0" && s != "false",
        _ => false,
    })
}

impl DateVariable {
    /// Start date, with a season standing in for a missing month.
    pub fn parts(&self) -> Option<DateParts> {
        self.date_parts.first().map(|p| {
            let mut parts = DateParts::from_slice(p);
            if parts.month.is_none() {
                parts.month = self.season.map(|s| 20 + s);
            }
            parts
        })
    }

    /// End date of a range.
    pub fn end_parts(&self) -> Option<DateParts> {
        self.date_parts.get(1).map(|p| DateParts::from_slice(p))
    }

    pub fn is_range(&self) -> bool {
        self.date_parts.len() > 1
    }

    /// True when there is anything at all to render.
    pub fn has_content(&self) -> bool {
        !self.date_parts.is_empty()
            || self.literal.as_deref().is_some_and(|s| !s.is_empty())
            || self.raw.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Year, month and day of one date. Months 13-16 and 21-24 are seasons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateParts {
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub day: Option<i32>,
}

impl DateParts {
    pub fn from_slice(parts: &[i32]) -> Self {
        // Zero marks an absent month or day.
        let nonzero = |v: Option<&i32>| v.copied().filter(|v| *v != 0);
        DateParts {
            year: parts.first().copied(),
            month: nonzero(parts.get(1)),
            day: nonzero(parts.get(2)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_simple_item() {
        let item: Item = serde_json::from_value(json!({
            "id": "smith2020",
            "type": "book",
            "title": "A Great Book",
            "volume": 3,
            "author": [{"family": "Smith", "given": "John"}],
            "issued": {"date-parts": [[2020]]}
        }))
        .unwrap();

        assert_eq!(item.id, "smith2020");
        assert_eq!(item.item_type, "book");
        assert_eq!(item.get_variable("title").as_deref(), Some("A Great Book"));
        assert_eq!(item.get_variable("volume").as_deref(), Some("3"));

        let author = &item.get_names("author").unwrap()[0];
        assert_eq!(author.family.as_deref(), Some("Smith"));
        assert_eq!(author.given.as_deref(), Some("John"));

        let parts = item.get_date("issued").unwrap().parts().unwrap();
        assert_eq!(parts.year, Some(2020));
        assert_eq!(parts.month, None);
    }

    #[test]
    fn test_integer_id() {
        let item: Item = serde_json::from_value(json!({"id": 42})).unwrap();
        assert_eq!(item.id, "42");
    }

    #[test]
    fn test_missing_id_is_an_error() {
        assert!(serde_json::from_value::<Item>(json!({"title": "x"})).is_err());
    }

    #[test]
    fn test_unknown_fields_are_variables() {
        let item: Item =
            serde_json::from_value(json!({"id": "a", "title-short": "Short", "custom": "x"}))
                .unwrap();
        assert_eq!(item.get_variable("custom").as_deref(), Some("x"));
        assert!(item.has_variable("title-short"));
        assert!(!item.has_variable("title"));
    }

    #[test]
    fn test_parse_date_range_with_string_parts() {
        let item: Item = serde_json::from_value(json!({
            "id": "conf2020",
            "event-date": {"date-parts": [["2020", "6", "15"], [2020, 6, 17]], "circa": 1}
        }))
        .unwrap();

        let date = item.get_date("event-date").unwrap();
        assert!(date.is_range());
        assert!(date.circa);
        assert_eq!(
            date.parts(),
            Some(DateParts {
                year: Some(2020),
                month: Some(6),
                day: Some(15)
            })
        );
        assert_eq!(date.end_parts().unwrap().day, Some(17));
    }

    #[test]
    fn test_season_stands_in_for_month() {
        let item: Item = serde_json::from_value(json!({
            "id": "a",
            "issued": {"date-parts": [[1999]], "season": "2"}
        }))
        .unwrap();
        assert_eq!(item.get_date("issued").unwrap().parts().unwrap().month, Some(22));
    }

    #[test]
    fn test_raw_string_date() {
        let item: Item =
            serde_json::from_value(json!({"id": "a", "issued": "2004-03"})).unwrap();
        let date = item.get_date("issued").unwrap();
        assert_eq!(date.raw.as_deref(), Some("2004-03"));
        assert!(date.date_parts.is_empty());
    }

    #[test]
    fn test_name_flags() {
        let name: Name = serde_json::from_value(json!({
            "family": "King",
            "given": "Martin Luther",
            "suffix": "Jr.",
            "comma-suffix": "true"
        }))
        .unwrap();
        assert!(name.comma_suffix);
        assert!(name.is_renderable());
        assert!(!Name::default().is_renderable());
    }
}
