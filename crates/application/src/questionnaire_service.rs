//! Question catalog ports and the applicability resolver service.
//!
//! Resolves which subset of the question bank applies to a given audit.
//! The fast path filters database-side; any storage failure degrades to an
//! in-memory pass over the full catalog (database first, bundled JSON file
//! last) applying the identical predicate.


use std::sync::Arc;

use async_trait::async_trait;
use conforma_core::{AppError, AppResult, UserIdentity};
use conforma_domain::{
    ApplicabilityFilter, Criticality, FilterOutcome, Process, ProcessCandidates, Question,
    Referential, question_key,
};
use tracing::warn;
use uuid::Uuid;

use crate::audit_service::AuditService;

/// Role clause of the database-side predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RoleClause {
    /// Only questions addressed to every role.
    #[default]
    GenericOnly,
    /// Generic questions plus those matching this role's synonym forms.
    Declared(String),
    /// No role restriction; used by the relaxed retry.
    Any,
}

/// Database-side applicability query derived from an audit's context.
#[derive(Debug, Clone, Default)]
pub struct QuestionQuery {
    /// Audit's referential id selection; empty matches everything.
    pub referential_ids: Vec<i64>,
    /// Resolved numeric process candidates.
    pub process_ids: Vec<i64>,
    /// Resolved lower-cased label candidates.
    pub process_labels: Vec<String>,
    /// Economic role clause.
    pub role_clause: RoleClause,
}

/// Incoming payload for catalog administration.
#[derive(Debug, Clone)]
pub struct SaveQuestionInput {
    /// Owning referential.
    pub referential_id: Option<i64>,
    /// Primary process scope.
    pub process_id: Option<i64>,
    /// Regulatory clause reference.
    pub clause: Option<String>,
    /// Audit question text.
    pub text: String,
    /// Criticality classification.
    pub criticality: Option<Criticality>,
    /// Targeted economic role; `None` or "all" is generic.
    pub economic_role: Option<String>,
    /// Process tokens the question applies to; empty is generic.
    pub applicable_processes: Vec<String>,
    /// Expected evidence description.
    pub expected_evidence: Option<String>,
}

/// Repository port for the question catalog and its reference tables.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Filters the catalog database-side with the resolver's predicate.
    async fn find_applicable(&self, query: &QuestionQuery) -> AppResult<Vec<Question>>;

    /// Loads the full catalog.
    async fn list_all(&self) -> AppResult<Vec<Question>>;

    /// Lists the regulatory referentials.
    async fn list_referentials(&self) -> AppResult<Vec<Referential>>;

    /// Lists the canonical process table.
    async fn list_processes(&self) -> AppResult<Vec<Process>>;

    /// Inserts a catalog question.
    async fn insert_question(&self, question_key: &str, input: &SaveQuestionInput)
    -> AppResult<Question>;

    /// Updates a catalog question in place.
    async fn update_question(&self, id: i64, input: &SaveQuestionInput) -> AppResult<Question>;
}

/// Port for the bundled last-resort question catalog.
#[async_trait]
pub trait QuestionCatalog: Send + Sync {
    /// Loads the bundled catalog.
    async fn load(&self) -> AppResult<Vec<Question>>;
}

/// Resolved questionnaire for one audit, with degradation flags.
#[derive(Debug, Clone)]
pub struct QuestionnaireResult {
    /// The applicable questions.
    pub questions: Vec<Question>,
    /// Set when the strict role clause matched nothing and was dropped.
    pub role_filter_relaxed: bool,
    /// Set when database-side filtering failed and the bundled catalog or
    /// an unfiltered load had to be re-filtered in memory.
    pub degraded_to_catalog: bool,
}

/// Application service resolving per-audit question applicability.
#[derive(Clone)]
pub struct QuestionnaireService {
    audit_service: AuditService,
    question_repository: Arc<dyn QuestionRepository>,
    question_catalog: Arc<dyn QuestionCatalog>,
}

impl QuestionnaireService {
    /// Creates a new questionnaire service.
    #[must_use]
    pub fn new(
        audit_service: AuditService,
        question_repository: Arc<dyn QuestionRepository>,
        question_catalog: Arc<dyn QuestionCatalog>,
    ) -> Self {
        Self {
            audit_service,
            question_repository,
            question_catalog,
        }
    }

    /// Resolves the applicable question set for an audit.
    ///
    /// Never fails for an audit without a process selection; that selection
    /// simply means "all processes".
    pub async fn questions_for_audit(
        &self,
        identity: &UserIdentity,
        audit_id: Uuid,
    ) -> AppResult<QuestionnaireResult> {
        let context = self
            .audit_service
            .get_audit_context(identity, audit_id)
            .await?;

        // The process table turns each token into every identifier the same
        // process is known by. Losing the table only narrows candidates; it
        // must not fail the questionnaire.
        let processes = match self.question_repository.list_processes().await {
            Ok(processes) => processes,
            Err(error) => {
                warn!(%audit_id, %error, "process table unavailable; resolving tokens as-is");
                Vec::new()
            }
        };

        let candidates = ProcessCandidates::resolve(&context.process_tokens, &processes);
        let filter = ApplicabilityFilter::new(
            context.referential_ids.clone(),
            candidates.clone(),
            context.economic_role.clone(),
        );

        match self.filter_database_side(&context.referential_ids, &candidates, &filter).await {
            Ok(result) => Ok(result),
            Err(error) => {
                warn!(
                    %audit_id,
                    %error,
                    "database-side question filtering failed; re-filtering full catalog in memory"
                );
                self.filter_in_memory(&filter).await
            }
        }
    }

    async fn filter_database_side(
        &self,
        referential_ids: &[i64],
        candidates: &ProcessCandidates,
        filter: &ApplicabilityFilter,
    ) -> AppResult<QuestionnaireResult> {
        let strict_query = QuestionQuery {
            referential_ids: referential_ids.to_vec(),
            process_ids: candidates.ids(),
            process_labels: candidates.labels(),
            role_clause: match filter.economic_role() {
                Some(role) => RoleClause::Declared(role.to_owned()),
                None => RoleClause::GenericOnly,
            },
        };

        let strict = self.question_repository.find_applicable(&strict_query).await?;

        if !strict.is_empty() {
            return Ok(QuestionnaireResult {
                questions: strict,
                role_filter_relaxed: false,
                degraded_to_catalog: false,
            });
        }

        // An overly strict role match is more likely wrong than the audit
        // having zero applicable questions. The retry also covers the
        // role-less audit, whose strict pass sees only generic questions.
        let relaxed_query = QuestionQuery {
            role_clause: RoleClause::Any,
            ..strict_query
        };
        let relaxed = self.question_repository.find_applicable(&relaxed_query).await?;

        if relaxed.is_empty() {
            return Ok(QuestionnaireResult {
                questions: relaxed,
                role_filter_relaxed: false,
                degraded_to_catalog: false,
            });
        }

        warn!(
            role = filter.economic_role().unwrap_or_default(),
            "role filter matched no questions; role clause dropped"
        );

        Ok(QuestionnaireResult {
            questions: relaxed,
            role_filter_relaxed: true,
            degraded_to_catalog: false,
        })
    }

    async fn filter_in_memory(&self, filter: &ApplicabilityFilter) -> AppResult<QuestionnaireResult> {
        let catalog = match self.question_repository.list_all().await {
            Ok(catalog) if !catalog.is_empty() => catalog,
            Ok(_) => {
                warn!("question table is empty; loading bundled catalog");
                self.question_catalog.load().await?
            }
            Err(error) => {
                warn!(%error, "question table unreachable; loading bundled catalog");
                self.question_catalog.load().await?
            }
        };

        let outcome = FilterOutcome::compute(&catalog, filter);
        if outcome.role_filter_relaxed {
            warn!(
                role = filter.economic_role().unwrap_or_default(),
                "role filter matched no questions in catalog; role clause dropped"
            );
        }

        Ok(QuestionnaireResult {
            questions: outcome.questions,
            role_filter_relaxed: outcome.role_filter_relaxed,
            degraded_to_catalog: true,
        })
    }

    /// Lists the regulatory referentials.
    pub async fn list_referentials(&self) -> AppResult<Vec<Referential>> {
        self.question_repository.list_referentials().await
    }

    /// Lists the canonical process table.
    pub async fn list_processes(&self) -> AppResult<Vec<Process>> {
        self.question_repository.list_processes().await
    }

    /// Lists the full catalog for administration.
    pub async fn list_catalog(&self, identity: &UserIdentity) -> AppResult<Vec<Question>> {
        Self::require_admin(identity)?;
        self.question_repository.list_all().await
    }

    /// Creates a catalog question (administrators only).
    ///
    /// The question key is derived from clause, process name, and text so
    /// re-imports keep existing responses attached.
    pub async fn create_question(
        &self,
        identity: &UserIdentity,
        input: SaveQuestionInput,
    ) -> AppResult<Question> {
        Self::require_admin(identity)?;

        if input.text.trim().is_empty() {
            return Err(AppError::Validation("question text is required".to_owned()));
        }

        let process_name = match input.process_id {
            Some(process_id) => self
                .question_repository
                .list_processes()
                .await?
                .into_iter()
                .find(|process| process.id() == process_id)
                .map(|process| process.name().to_owned())
                .ok_or_else(|| {
                    AppError::Validation(format!("unknown process id '{process_id}'"))
                })?,
            None => String::new(),
        };

        let key = question_key(
            input.clause.as_deref().unwrap_or_default(),
            &process_name,
            &input.text,
        );

        self.question_repository.insert_question(&key, &input).await
    }

    /// Updates a catalog question (administrators only).
    pub async fn update_question(
        &self,
        identity: &UserIdentity,
        id: i64,
        input: SaveQuestionInput,
    ) -> AppResult<Question> {
        Self::require_admin(identity)?;

        if input.text.trim().is_empty() {
            return Err(AppError::Validation("question text is required".to_owned()));
        }

        self.question_repository.update_question(id, &input).await
    }

    fn require_admin(identity: &UserIdentity) -> AppResult<()> {
        if !identity.is_admin() {
            return Err(AppError::Forbidden(
                "catalog administration requires the admin role".to_owned(),
            ));
        }
        Ok(())
    }
}
