//! PostgreSQL-backed question catalog repository.
//!
//! The applicability query reproduces the in-memory predicate clause by
//! clause: referential membership, the process disjunction, and the role
//! synonym match. Label candidates are compared lower-case on both sides;
//! numeric candidates additionally match their string spelling inside
//! `applicable_processes`, mirroring the tolerant in-memory matcher.

#[cfg(test)]
mod tests;

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use conforma_application::{QuestionQuery, QuestionRepository, RoleClause, SaveQuestionInput};
use conforma_core::{AppError, AppResult};
use conforma_domain::{Criticality, Process, Question, Referential, role_match_forms};

/// PostgreSQL implementation of the question repository port.
#[derive(Clone)]
pub struct PostgresQuestionRepository {
    pool: PgPool,
}

impl PostgresQuestionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct QuestionRow {
    id: i64,
    question_key: String,
    referential_id: Option<i64>,
    process_id: Option<i64>,
    clause: Option<String>,
    text: String,
    criticality: Option<String>,
    economic_role: Option<String>,
    applicable_processes: Vec<String>,
    expected_evidence: Option<String>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let criticality = row
            .criticality
            .as_deref()
            .map(Criticality::from_str)
            .transpose()?;

        Question::new(
            row.id,
            row.question_key,
            row.referential_id,
            row.process_id,
            row.clause,
            row.text,
            criticality,
            row.economic_role,
            row.applicable_processes,
            row.expected_evidence,
        )
    }
}

const QUESTION_COLUMNS: &str = "id, question_key, referential_id, process_id, clause, text, \
     criticality, economic_role, applicable_processes, expected_evidence";

#[async_trait]
impl QuestionRepository for PostgresQuestionRepository {
    async fn find_applicable(&self, query: &QuestionQuery) -> AppResult<Vec<Question>> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE TRUE"
        ));

        if !query.referential_ids.is_empty() {
            builder.push(" AND (referential_id IS NULL OR referential_id = ANY(");
            builder.push_bind(&query.referential_ids);
            builder.push("))");
        }

        if !query.process_ids.is_empty() || !query.process_labels.is_empty() {
            // String spellings of the candidate ids also count as labels,
            // matching digit entries stored in applicable_processes.
            let mut labels = query.process_labels.clone();
            labels.extend(query.process_ids.iter().map(i64::to_string));

            builder.push(" AND (cardinality(applicable_processes) = 0");
            if !query.process_ids.is_empty() {
                builder.push(" OR process_id = ANY(");
                builder.push_bind(&query.process_ids);
                builder.push(")");
            }
            // Stored entries are lowered on comparison, not trusted to have
            // been lowered on write. Candidates arrive lower-cased already.
            builder.push(
                " OR EXISTS (SELECT 1 FROM unnest(applicable_processes) AS entry \
                 WHERE lower(entry) = ANY(",
            );
            builder.push_bind(labels);
            builder.push(")))");
        }

        match &query.role_clause {
            RoleClause::Any => {}
            RoleClause::GenericOnly => {
                builder.push(
                    " AND (economic_role IS NULL OR economic_role = '' \
                     OR lower(economic_role) IN ('all', 'tous'))",
                );
            }
            RoleClause::Declared(role) => {
                builder.push(
                    " AND (economic_role IS NULL OR economic_role = '' \
                     OR lower(economic_role) IN ('all', 'tous') \
                     OR lower(economic_role) = ANY(",
                );
                builder.push_bind(role_match_forms(role));
                builder.push("))");
            }
        }

        builder.push(" ORDER BY referential_id NULLS LAST, clause, id");

        let rows = builder
            .build_query_as::<QuestionRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to filter questions: {error}"))
            })?;

        rows.into_iter().map(Question::try_from).collect()
    }

    async fn list_all(&self) -> AppResult<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions ORDER BY referential_id NULLS LAST, clause, id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list questions: {error}")))?;

        rows.into_iter().map(Question::try_from).collect()
    }

    async fn list_referentials(&self) -> AppResult<Vec<Referential>> {
        let rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, code, name FROM referentials ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to list referentials: {error}"))
                })?;

        rows.into_iter()
            .map(|(id, code, name)| Referential::new(id, code, name))
            .collect()
    }

    async fn list_processes(&self) -> AppResult<Vec<Process>> {
        let rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, slug, name FROM processes ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to list processes: {error}"))
                })?;

        rows.into_iter()
            .map(|(id, slug, name)| Process::new(id, slug, name))
            .collect()
    }

    async fn insert_question(
        &self,
        question_key: &str,
        input: &SaveQuestionInput,
    ) -> AppResult<Question> {
        let applicable: Vec<String> = input
            .applicable_processes
            .iter()
            .map(|label| label.to_lowercase())
            .collect();

        let result = sqlx::query_as::<_, QuestionRow>(&format!(
            r#"
            INSERT INTO questions
                (question_key, referential_id, process_id, clause, text, criticality,
                 economic_role, applicable_processes, expected_evidence)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(question_key)
        .bind(input.referential_id)
        .bind(input.process_id)
        .bind(&input.clause)
        .bind(&input.text)
        .bind(input.criticality.map(|value| value.as_str()))
        .bind(&input.economic_role)
        .bind(&applicable)
        .bind(&input.expected_evidence)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Question::try_from(row),
            Err(error) => {
                if let sqlx::Error::Database(database_error) = &error
                    && database_error.code().as_deref() == Some("23505")
                {
                    return Err(AppError::Conflict(format!(
                        "question '{question_key}' already exists"
                    )));
                }

                Err(AppError::Internal(format!(
                    "failed to insert question: {error}"
                )))
            }
        }
    }

    async fn update_question(&self, id: i64, input: &SaveQuestionInput) -> AppResult<Question> {
        let applicable: Vec<String> = input
            .applicable_processes
            .iter()
            .map(|label| label.to_lowercase())
            .collect();

        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            r#"
            UPDATE questions
            SET referential_id = $2, process_id = $3, clause = $4, text = $5,
                criticality = $6, economic_role = $7, applicable_processes = $8,
                expected_evidence = $9
            WHERE id = $1
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.referential_id)
        .bind(input.process_id)
        .bind(&input.clause)
        .bind(&input.text)
        .bind(input.criticality.map(|value| value.as_str()))
        .bind(&input.economic_role)
        .bind(&applicable)
        .bind(&input.expected_evidence)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update question: {error}")))?;

        row.map(Question::try_from)
            .transpose()?
            .ok_or_else(|| AppError::NotFound(format!("question '{id}' does not exist")))
    }
}
