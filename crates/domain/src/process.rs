use std::collections::BTreeSet;

use conforma_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A canonical business-process category.
///
/// Identified by both a numeric database id and a stable string slug; the
/// slug is the cross-system contract because stored audit selections and
/// question metadata reference processes by slug, display name, or id
/// interchangeably.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    id: i64,
    slug: NonEmptyString,
    name: NonEmptyString,
}

impl Process {
    /// Creates a validated process category.
    pub fn new(id: i64, slug: impl Into<String>, name: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            id,
            slug: NonEmptyString::new(slug)?,
            name: NonEmptyString::new(name)?,
        })
    }

    /// Returns the numeric database id.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Returns the stable slug.
    #[must_use]
    pub fn slug(&self) -> &str {
        self.slug.as_str()
    }

    /// Returns the human-readable display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}

/// A single process selection token as stored on an audit record.
///
/// Legacy rows mix numeric foreign keys, slugs, and display names in the
/// same column, so a token is either a resolved numeric id or opaque text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcessToken {
    /// Numeric process id, usable for exact foreign-key matches.
    Id(i64),
    /// Slug or display-name text, matched case-insensitively.
    Text(String),
}

impl ProcessToken {
    fn from_scalar(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.chars().all(|character| character.is_ascii_digit()) {
            if let Ok(id) = trimmed.parse::<i64>() {
                return Some(Self::Id(id));
            }
        }

        Some(Self::Text(trimmed.to_owned()))
    }
}

/// Flattens an already-parsed JSON value into process tokens.
///
/// Arrays are flattened recursively; objects contribute their `id`, `value`,
/// `processId`, or `slug` field; booleans and nulls are dropped. The output
/// is always a flat sequence of scalars.
#[must_use]
pub fn decode_tokens(value: &Value) -> Vec<ProcessToken> {
    match value {
        Value::Null | Value::Bool(_) => Vec::new(),
        Value::Number(number) => number
            .as_i64()
            .map(ProcessToken::Id)
            .or_else(|| ProcessToken::from_scalar(&number.to_string()))
            .into_iter()
            .collect(),
        Value::String(text) => ProcessToken::from_scalar(text).into_iter().collect(),
        Value::Array(items) => items.iter().flat_map(decode_tokens).collect(),
        Value::Object(fields) => ["id", "value", "processId", "slug"]
            .iter()
            .find_map(|key| fields.get(*key))
            .map(decode_tokens)
            .unwrap_or_default(),
    }
}

/// Decodes a raw stored column value that may be a JSON-encoded array, a
/// double-JSON-encoded array (a JSON string containing JSON text), or a
/// plain scalar.
///
/// Malformed input that looks like JSON degrades to an empty sequence;
/// input that does not look like JSON is kept as a single literal token.
#[must_use]
pub fn decode_stored_tokens(raw: &str) -> Vec<ProcessToken> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(trimmed) {
        // One level of extra encoding: the column held a JSON string whose
        // content is itself JSON text.
        Ok(Value::String(inner)) => decode_stored_tokens(&inner),
        Ok(parsed) => decode_tokens(&parsed),
        Err(_) => {
            if trimmed.starts_with(['[', '{', '"']) {
                Vec::new()
            } else {
                ProcessToken::from_scalar(trimmed).into_iter().collect()
            }
        }
    }
}

/// Dual candidate set resolved from an audit's process selection.
///
/// Numeric ids serve exact `process_id` column matches; lower-cased labels
/// serve membership tests against each question's `applicable_processes`
/// array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessCandidates {
    ids: BTreeSet<i64>,
    labels: BTreeSet<String>,
}

impl ProcessCandidates {
    /// Resolves tokens against the process table, expanding each token to
    /// every identifier the same process is known by.
    #[must_use]
    pub fn resolve(tokens: &[ProcessToken], processes: &[Process]) -> Self {
        let mut candidates = Self::default();

        for token in tokens {
            match token {
                ProcessToken::Id(id) => {
                    candidates.ids.insert(*id);
                    if let Some(process) = processes.iter().find(|process| process.id() == *id) {
                        candidates.insert_process_labels(process);
                    }
                }
                ProcessToken::Text(text) => {
                    let lowered = text.to_lowercase();
                    candidates.labels.insert(lowered.clone());

                    if let Some(process) = processes.iter().find(|process| {
                        process.slug().eq_ignore_ascii_case(&lowered)
                            || process.name().to_lowercase() == lowered
                    }) {
                        candidates.ids.insert(process.id());
                        candidates.insert_process_labels(process);
                    }
                }
            }
        }

        candidates
    }

    fn insert_process_labels(&mut self, process: &Process) {
        self.labels.insert(process.slug().to_lowercase());
        self.labels.insert(process.name().to_lowercase());
    }

    /// Returns whether no candidate was resolved (empty selection).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.labels.is_empty()
    }

    /// Returns whether the numeric id belongs to the selection.
    #[must_use]
    pub fn contains_id(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Tests one `applicable_processes` entry against the candidate set.
    ///
    /// Digit-only entries are compared against the numeric ids as well as
    /// the labels, matching how questions reference processes.
    #[must_use]
    pub fn matches_label(&self, entry: &str) -> bool {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            return false;
        }

        if trimmed.chars().all(|character| character.is_ascii_digit())
            && let Ok(id) = trimmed.parse::<i64>()
            && self.ids.contains(&id)
        {
            return true;
        }

        self.labels.contains(&trimmed.to_lowercase())
    }

    /// Returns the resolved numeric process ids.
    #[must_use]
    pub fn ids(&self) -> Vec<i64> {
        self.ids.iter().copied().collect()
    }

    /// Returns the resolved lower-cased label candidates.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.labels.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::{Process, ProcessCandidates, ProcessToken, decode_stored_tokens, decode_tokens};

    fn traceability() -> Process {
        Process::new(8, "traceability_udi", "Traçabilité UDI").unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn decodes_plain_json_array() {
        let tokens = decode_stored_tokens(r#"["ra", 8, "Traçabilité UDI"]"#);
        assert_eq!(
            tokens,
            vec![
                ProcessToken::Text("ra".to_owned()),
                ProcessToken::Id(8),
                ProcessToken::Text("Traçabilité UDI".to_owned()),
            ]
        );
    }

    #[test]
    fn decodes_double_encoded_array() {
        // The column held a JSON string whose content is JSON array text.
        let tokens = decode_stored_tokens("\"[\\\"ra\\\"]\"");
        assert_eq!(tokens, vec![ProcessToken::Text("ra".to_owned())]);
    }

    #[test]
    fn keeps_literal_scalar_as_single_token() {
        let tokens = decode_stored_tokens("hello");
        assert_eq!(tokens, vec![ProcessToken::Text("hello".to_owned())]);
    }

    #[test]
    fn malformed_json_looking_input_degrades_to_empty() {
        assert!(decode_stored_tokens(r#"["unterminated"#).is_empty());
        assert!(decode_stored_tokens(r#"{"id":"#).is_empty());
    }

    #[test]
    fn digit_only_strings_are_promoted_to_ids() {
        let tokens = decode_stored_tokens(r#"["8", "12"]"#);
        assert_eq!(tokens, vec![ProcessToken::Id(8), ProcessToken::Id(12)]);
    }

    #[test]
    fn objects_contribute_their_identifier_field() {
        let tokens = decode_tokens(&json!([{"processId": 3}, {"slug": "ra"}, {"other": true}]));
        assert_eq!(
            tokens,
            vec![ProcessToken::Id(3), ProcessToken::Text("ra".to_owned())]
        );
    }

    #[test]
    fn nested_arrays_flatten() {
        let tokens = decode_tokens(&json!([["ra", ["qa"]], "8"]));
        assert_eq!(
            tokens,
            vec![
                ProcessToken::Text("ra".to_owned()),
                ProcessToken::Text("qa".to_owned()),
                ProcessToken::Id(8),
            ]
        );
    }

    #[test]
    fn candidates_expand_id_token_to_slug_and_name() {
        let candidates = ProcessCandidates::resolve(&[ProcessToken::Id(8)], &[traceability()]);

        assert!(candidates.contains_id(8));
        assert!(candidates.matches_label("traceability_udi"));
        assert!(candidates.matches_label("TRAÇABILITÉ UDI"));
    }

    #[test]
    fn candidates_expand_slug_token_to_id() {
        let candidates = ProcessCandidates::resolve(
            &[ProcessToken::Text("Traceability_UDI".to_owned())],
            &[traceability()],
        );

        assert!(candidates.contains_id(8));
        assert!(candidates.matches_label("8"));
    }

    #[test]
    fn unknown_text_token_still_matches_itself() {
        let candidates = ProcessCandidates::resolve(
            &[ProcessToken::Text("Custom Process".to_owned())],
            &[traceability()],
        );

        assert!(!candidates.is_empty());
        assert!(candidates.matches_label("custom process"));
    }

    proptest! {
        /// Any JSON value decodes to a flat sequence of scalar tokens,
        /// never a nested structure and never an error.
        #[test]
        fn decoding_always_yields_flat_scalars(raw in "\\PC{0,60}") {
            let tokens = decode_stored_tokens(&raw);
            for token in tokens {
                match token {
                    ProcessToken::Id(_) => {}
                    ProcessToken::Text(text) => {
                        prop_assert!(!text.trim().is_empty());
                    }
                }
            }
        }

        #[test]
        fn encoded_arrays_of_strings_round_trip(items in proptest::collection::vec("[a-z_]{1,12}", 0..6)) {
            let encoded = serde_json::to_string(&items).unwrap_or_default();
            let double_encoded = serde_json::to_string(&encoded).unwrap_or_default();

            let expected: Vec<ProcessToken> = items
                .iter()
                .map(|item| ProcessToken::Text(item.clone()))
                .collect();

            prop_assert_eq!(decode_stored_tokens(&encoded), expected.clone());
            prop_assert_eq!(decode_stored_tokens(&double_encoded), expected);
        }
    }
}
