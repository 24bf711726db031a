//! Bundled JSON question catalog.
//!
//! Last-resort question source used when the database is unreachable.
//! The file is read from the first existing candidate path; entries are
//! decoded tolerantly and malformed ones are skipped with a warning, so
//! one bad row never empties the fallback.

use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use conforma_application::QuestionCatalog;
use conforma_core::{AppError, AppResult};
use conforma_domain::{Criticality, Question, question_key};

const CANDIDATE_PATHS: &[&str] = &[
    "data/question_catalog.json",
    "../data/question_catalog.json",
    "/app/data/question_catalog.json",
];

/// File-backed implementation of the question catalog port.
#[derive(Clone)]
pub struct JsonQuestionCatalog {
    override_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(default)]
    question_key: Option<String>,
    #[serde(default)]
    referential_id: Option<i64>,
    #[serde(default)]
    process_id: Option<i64>,
    #[serde(default)]
    clause: Option<String>,
    text: String,
    #[serde(default)]
    criticality: Option<String>,
    #[serde(default)]
    economic_role: Option<String>,
    #[serde(default)]
    applicable_processes: Vec<String>,
    #[serde(default)]
    process_name: Option<String>,
    #[serde(default)]
    expected_evidence: Option<String>,
}

impl JsonQuestionCatalog {
    /// Creates a catalog reader; the optional path overrides the built-in
    /// candidate locations.
    #[must_use]
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self { override_path }
    }

    fn resolve_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.override_path {
            return Some(path.clone());
        }
        CANDIDATE_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.is_file())
    }

    fn decode_entry(index: usize, entry: CatalogEntry) -> AppResult<Question> {
        let criticality = entry
            .criticality
            .as_deref()
            .and_then(|value| Criticality::from_str(value).ok());

        let key = match entry.question_key {
            Some(key) if !key.trim().is_empty() => key,
            _ => question_key(
                entry.clause.as_deref().unwrap_or_default(),
                entry.process_name.as_deref().unwrap_or_default(),
                &entry.text,
            ),
        };

        // Catalog entries have no database id; a synthetic negative id keeps
        // them distinct from persisted rows.
        Question::new(
            -(index as i64) - 1,
            key,
            entry.referential_id,
            entry.process_id,
            entry.clause,
            entry.text,
            criticality,
            entry.economic_role,
            entry.applicable_processes,
            entry.expected_evidence,
        )
    }
}

#[async_trait]
impl QuestionCatalog for JsonQuestionCatalog {
    async fn load(&self) -> AppResult<Vec<Question>> {
        let Some(path) = self.resolve_path() else {
            return Err(AppError::Internal(
                "no bundled question catalog file found".to_owned(),
            ));
        };

        let raw = tokio::fs::read_to_string(&path).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to read question catalog '{}': {error}",
                path.display()
            ))
        })?;

        let entries: Vec<serde_json::Value> = serde_json::from_str(&raw).map_err(|error| {
            AppError::Internal(format!(
                "failed to parse question catalog '{}': {error}",
                path.display()
            ))
        })?;

        let mut questions = Vec::with_capacity(entries.len());
        for (index, value) in entries.into_iter().enumerate() {
            let entry: CatalogEntry = match serde_json::from_value(value) {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(index, %error, "skipping malformed catalog entry");
                    continue;
                }
            };
            match Self::decode_entry(index, entry) {
                Ok(question) => questions.push(question),
                Err(error) => {
                    warn!(index, %error, "skipping invalid catalog entry");
                }
            }
        }

        Ok(questions)
    }
}
