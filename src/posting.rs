//! # Posting Module
//!
//! A single scraped job listing and the identities derived from it.

use std::collections::BTreeMap;

use serde::{ Deserialize, Serialize };
use serde_json::Value;

/// Raw record as handed back by the external scraping capability.
pub type Record = serde_json::Map<String, Value>;

pub const TITLE: &str = "title";
pub const COMPANY: &str = "company";
pub const LOCATION: &str = "location";
pub const DESCRIPTION: &str = "description";
pub const JOB_URL: &str = "job_url";

/// One job listing.
///
/// Only the fields the pipeline reasons about are typed; everything else the
/// source provided rides along in `extra` and is written back out untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Posting {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub extra: BTreeMap<String, String>,
}

/// Normalized `(title, company, location)` triple used for heuristic dedup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuzzyKey {
    pub title: String,
    pub company: String,
    pub location: String,
}

/// The typed text fields a filter may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostingField {
    Title,
    Company,
    Location,
}

impl Posting {
    /// Builds a posting from an external record.
    ///
    /// Nulls become `None`; non-string values are kept as their JSON text.
    pub fn from_record(record: Record) -> Self {
        let mut posting = Posting::default();

        for (key, value) in record {
            let Some(text) = value_to_text(value) else {
                continue;
            };
            match key.as_str() {
                TITLE => {
                    posting.title = Some(text);
                }
                COMPANY => {
                    posting.company = Some(text);
                }
                LOCATION => {
                    posting.location = Some(text);
                }
                DESCRIPTION => {
                    posting.description = Some(text);
                }
                JOB_URL => {
                    posting.url = Some(text);
                }
                _ => {
                    posting.extra.insert(key, text);
                }
            }
        }

        posting
    }

    /// Exact identity: the url, when present and non-blank.
    pub fn exact_id(&self) -> Option<&str> {
        present(&self.url)
    }

    /// Fuzzy identity, defined only when title, company and location are all present.
    pub fn fuzzy_id(&self) -> Option<FuzzyKey> {
        let title = present(&self.title)?;
        let company = present(&self.company)?;
        let location = present(&self.location)?;

        Some(FuzzyKey {
            title: normalize(title),
            company: normalize(company),
            location: normalize(location),
        })
    }

    /// Value of a filterable field, with a missing field read as `""`.
    pub fn field(&self, field: PostingField) -> &str {
        let value = match field {
            PostingField::Title => &self.title,
            PostingField::Company => &self.company,
            PostingField::Location => &self.location,
        };
        value.as_deref().unwrap_or("")
    }
}

/// Lower-cases and trims a value for identity or filter comparison.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn from_record_maps_known_fields() {
        let raw = json!({
            "title": "Rust Engineer",
            "company": "Acme",
            "location": "NYC",
            "description": "Build things",
            "job_url": "https://jobs.example/1",
            "site": "indeed",
            "min_amount": 120000,
            "is_remote": null
        });
        let posting = Posting::from_record(record(raw));

        assert_eq!(posting.title.as_deref(), Some("Rust Engineer"));
        assert_eq!(posting.url.as_deref(), Some("https://jobs.example/1"));
        assert_eq!(posting.extra.get("site").map(String::as_str), Some("indeed"));
        assert_eq!(posting.extra.get("min_amount").map(String::as_str), Some("120000"));
        assert!(!posting.extra.contains_key("is_remote"));
    }

    #[test]
    fn fuzzy_id_is_trimmed_and_case_insensitive() {
        let a = Posting {
            title: Some("  Eng ".into()),
            company: Some("ACME".into()),
            location: Some("nyc".into()),
            ..Default::default()
        };
        let b = Posting {
            title: Some("eng".into()),
            company: Some("acme".into()),
            location: Some("NYC ".into()),
            ..Default::default()
        };
        assert_eq!(a.fuzzy_id(), b.fuzzy_id());
        assert!(a.fuzzy_id().is_some());
    }

    #[test]
    fn fuzzy_id_requires_all_three_fields() {
        let posting = Posting {
            title: Some("Eng".into()),
            company: Some("Acme".into()),
            location: Some("   ".into()),
            ..Default::default()
        };
        assert!(posting.fuzzy_id().is_none());
    }

    #[test]
    fn blank_url_has_no_exact_id() {
        let posting = Posting {
            url: Some(String::new()),
            ..Default::default()
        };
        assert!(posting.exact_id().is_none());
    }

    #[test]
    fn missing_field_reads_as_empty() {
        let posting = Posting::default();
        assert_eq!(posting.field(PostingField::Location), "");
    }
}
