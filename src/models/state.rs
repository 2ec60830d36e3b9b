//! Persisted state documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::Listing;

/// Contents of the seen-set file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SeenState {
    /// Canonical URLs observed by any earlier run
    #[serde(default, deserialize_with = "lenient_urls")]
    pub seen: Vec<String>,

    /// Time of the last successful commit
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SeenState {
    pub fn new(seen: Vec<String>) -> Self {
        Self {
            seen,
            updated_at: Some(Utc::now()),
        }
    }
}

/// Contents of the per-run new listings report.
///
/// Rewritten on every successful run, including runs with nothing new.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewReport {
    #[serde(rename = "newCars")]
    pub new_cars: Vec<Listing>,

    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub generated_at: Option<DateTime<Utc>>,
}

impl NewReport {
    pub fn new(new_cars: Vec<Listing>) -> Self {
        Self {
            new_cars,
            generated_at: Some(Utc::now()),
        }
    }
}

/// Keep the string entries of a `seen` array; anything else reads as empty.
fn lenient_urls<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let urls = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(url) => Some(url),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(urls)
}

/// Timestamps are informational; an unparseable one reads as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seen_state_tolerates_missing_fields() {
        let state: SeenState = serde_json::from_str("{}").unwrap();
        assert!(state.seen.is_empty());
        assert!(state.updated_at.is_none());
    }

    #[test]
    fn test_bad_timestamp_keeps_seen_urls() {
        let state: SeenState = serde_json::from_str(
            r#"{"seen":["https://x.test/a","https://x.test/b"],"updated_at":"yesterday"}"#,
        )
        .unwrap();
        assert_eq!(state.seen, vec!["https://x.test/a", "https://x.test/b"]);
        assert!(state.updated_at.is_none());
    }

    #[test]
    fn test_valid_timestamp_is_read() {
        let state: SeenState =
            serde_json::from_str(r#"{"seen":[],"updated_at":"2026-10-19T08:00:00Z"}"#).unwrap();
        assert!(state.updated_at.is_some());
    }

    #[test]
    fn test_non_string_entries_are_dropped() {
        let state: SeenState =
            serde_json::from_str(r#"{"seen":["https://x.test/a",42,null]}"#).unwrap();
        assert_eq!(state.seen, vec!["https://x.test/a"]);

        let state: SeenState = serde_json::from_str(r#"{"seen":"nope"}"#).unwrap();
        assert!(state.seen.is_empty());
    }

    #[test]
    fn test_report_uses_new_cars_key() {
        let report = NewReport {
            new_cars: vec![],
            generated_at: None,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"newCars":[]}"#);
    }
}
