//! Report assembly ports and application service.
//!
//! Re-fetches everything an audit report needs, computes the aggregate
//! metrics, renders charts through an external service, and hands the
//! assembled bundle to the document renderer. A chart failure degrades to
//! a placeholder block; it never fails the whole report.


use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use conforma_core::{AppResult, UserIdentity};
use conforma_domain::{FindingSeverity, Question, Referential, ResponseValue};
use tracing::warn;
use uuid::Uuid;

use crate::audit_service::{AuditRecord, AuditService, ResponseRecord};
use crate::directory_service::{DirectoryRepository, SiteRecord};
use crate::finding_service::{ActionRecord, FindingRecord, FindingRepository};
use crate::questionnaire_service::QuestionnaireService;

/// Declarative chart description sent to the rendering service.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    /// Chart title.
    pub title: String,
    /// Chart family understood by the renderer (`pie`, `bar`).
    pub chart_type: String,
    /// Category labels.
    pub labels: Vec<String>,
    /// One value per label.
    pub values: Vec<f64>,
}

/// Port for the external chart-rendering service.
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    /// Renders a chart specification to a PNG image.
    async fn render(&self, spec: &ChartSpec) -> AppResult<Vec<u8>>;
}

/// A rendered (or failed) chart carried into the document.
#[derive(Debug, Clone)]
pub struct ReportChart {
    /// Chart title, also used for the placeholder text.
    pub title: String,
    /// PNG bytes; `None` renders as a textual placeholder.
    pub image_png: Option<Vec<u8>>,
}

/// One row of the detailed results table.
#[derive(Debug, Clone)]
pub struct ReportRow {
    /// The applicable question.
    pub question: Question,
    /// The saved answer, if one exists.
    pub response: Option<ResponseRecord>,
}

/// Aggregate metrics for the executive summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportMetrics {
    /// Applicable question count.
    pub total_questions: usize,
    /// Answers counted as given (everything but in-progress).
    pub answered: usize,
    /// Compliant answers.
    pub compliant: usize,
    /// Non-compliant answers.
    pub non_compliant: usize,
    /// Partially compliant answers.
    pub partial: usize,
    /// Not-applicable answers.
    pub not_applicable: usize,
    /// Compliant over answered, in [0, 1]; zero when nothing is answered.
    pub conformity_rate: f64,
    /// Finding counts keyed by severity.
    pub findings_by_severity: BTreeMap<String, usize>,
    /// Actions past due and not completed.
    pub overdue_actions: usize,
}

impl ReportMetrics {
    /// Computes the metrics from assembled report data.
    #[must_use]
    pub fn compute(
        rows: &[ReportRow],
        findings: &[FindingRecord],
        actions: &[ActionRecord],
        today: NaiveDate,
    ) -> Self {
        let mut answered = 0_usize;
        let mut compliant = 0_usize;
        let mut non_compliant = 0_usize;
        let mut partial = 0_usize;
        let mut not_applicable = 0_usize;

        for row in rows {
            let Some(response) = &row.response else {
                continue;
            };
            if !response.value.is_answered() {
                continue;
            }

            answered += 1;
            match response.value {
                ResponseValue::Compliant => compliant += 1,
                ResponseValue::NonCompliant => non_compliant += 1,
                ResponseValue::Partial => partial += 1,
                ResponseValue::NotApplicable => not_applicable += 1,
                ResponseValue::InProgress => {}
            }
        }

        let conformity_rate = if answered == 0 {
            0.0
        } else {
            compliant as f64 / answered as f64
        };

        let mut findings_by_severity: BTreeMap<String, usize> = BTreeMap::new();
        for severity in [
            FindingSeverity::Minor,
            FindingSeverity::Major,
            FindingSeverity::Critical,
        ] {
            findings_by_severity.insert(severity.as_str().to_owned(), 0);
        }
        for finding in findings {
            *findings_by_severity
                .entry(finding.severity.as_str().to_owned())
                .or_default() += 1;
        }

        let overdue_actions = actions
            .iter()
            .filter(|action| action.is_overdue(today))
            .count();

        Self {
            total_questions: rows.len(),
            answered,
            compliant,
            non_compliant,
            partial,
            not_applicable,
            conformity_rate,
            findings_by_severity,
            overdue_actions,
        }
    }
}

/// Everything the document renderer needs, in section order.
#[derive(Debug, Clone)]
pub struct AuditReport {
    /// The audited engagement.
    pub audit: AuditRecord,
    /// The audited site, if linked.
    pub site: Option<SiteRecord>,
    /// Display name of the requesting user.
    pub requested_by: String,
    /// Referentials in scope.
    pub referentials: Vec<Referential>,
    /// Detailed results rows.
    pub rows: Vec<ReportRow>,
    /// Findings raised.
    pub findings: Vec<FindingRecord>,
    /// Remediation actions.
    pub actions: Vec<ActionRecord>,
    /// Evidence file references gathered from the responses.
    pub evidence: Vec<String>,
    /// Aggregate metrics.
    pub metrics: ReportMetrics,
    /// Rendered charts (or placeholders).
    pub charts: Vec<ReportChart>,
    /// Set when the questionnaire was resolved with a relaxed role clause.
    pub role_filter_relaxed: bool,
    /// Report generation time.
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

/// Port for the paginated document renderer.
pub trait ReportRenderer: Send + Sync {
    /// Renders the assembled report to document bytes.
    fn render(&self, report: &AuditReport) -> AppResult<Vec<u8>>;
}

/// Application service generating audit reports.
#[derive(Clone)]
pub struct ReportService {
    audit_service: AuditService,
    questionnaire_service: QuestionnaireService,
    directory_repository: Arc<dyn DirectoryRepository>,
    finding_repository: Arc<dyn FindingRepository>,
    chart_renderer: Arc<dyn ChartRenderer>,
    report_renderer: Arc<dyn ReportRenderer>,
}

impl ReportService {
    /// Creates a new report service.
    #[must_use]
    pub fn new(
        audit_service: AuditService,
        questionnaire_service: QuestionnaireService,
        directory_repository: Arc<dyn DirectoryRepository>,
        finding_repository: Arc<dyn FindingRepository>,
        chart_renderer: Arc<dyn ChartRenderer>,
        report_renderer: Arc<dyn ReportRenderer>,
    ) -> Self {
        Self {
            audit_service,
            questionnaire_service,
            directory_repository,
            finding_repository,
            chart_renderer,
            report_renderer,
        }
    }

    /// Generates the PDF report for an audit owned by the requester.
    pub async fn generate(&self, identity: &UserIdentity, audit_id: Uuid) -> AppResult<Vec<u8>> {
        let report = self.assemble(identity, audit_id).await?;
        self.report_renderer.render(&report)
    }

    /// Assembles the full report bundle without rendering it.
    pub async fn assemble(
        &self,
        identity: &UserIdentity,
        audit_id: Uuid,
    ) -> AppResult<AuditReport> {
        let audit = self.audit_service.get_audit(identity, audit_id).await?;

        let site = match audit.audit.site_id() {
            Some(site_id) => self.directory_repository.find_site(site_id).await?,
            None => None,
        };

        let questionnaire = self
            .questionnaire_service
            .questions_for_audit(identity, audit_id)
            .await?;
        let responses = self
            .audit_service
            .list_responses(identity, audit_id)
            .await?;

        let rows: Vec<ReportRow> = questionnaire
            .questions
            .into_iter()
            .map(|question| {
                let response = responses
                    .iter()
                    .find(|response| response.question_key == question.question_key())
                    .cloned();
                ReportRow { question, response }
            })
            .collect();

        let findings = self.finding_repository.list_findings(audit_id).await?;
        let actions = self
            .finding_repository
            .list_actions_for_audit(audit_id)
            .await?;

        // Sorted so the same file attached to non-adjacent responses still
        // collapses to one index entry.
        let mut evidence: Vec<String> = rows
            .iter()
            .filter_map(|row| row.response.as_ref())
            .flat_map(|response| response.evidence_files.iter().cloned())
            .collect();
        evidence.sort();
        evidence.dedup();

        let referential_ids = audit.audit.referential_ids().to_vec();
        let referentials = self
            .questionnaire_service
            .list_referentials()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|referential| {
                referential_ids.is_empty() || referential_ids.contains(&referential.id())
            })
            .collect();

        let now = Utc::now();
        let metrics = ReportMetrics::compute(&rows, &findings, &actions, now.date_naive());
        let charts = self.render_charts(&metrics).await;

        Ok(AuditReport {
            audit,
            site,
            requested_by: identity.display_name().to_owned(),
            referentials,
            rows,
            findings,
            actions,
            evidence,
            metrics,
            charts,
            role_filter_relaxed: questionnaire.role_filter_relaxed,
            generated_at: now,
        })
    }

    async fn render_charts(&self, metrics: &ReportMetrics) -> Vec<ReportChart> {
        let specs = vec![
            ChartSpec {
                title: "Conformity breakdown".to_owned(),
                chart_type: "pie".to_owned(),
                labels: vec![
                    "Compliant".to_owned(),
                    "Non-compliant".to_owned(),
                    "Partial".to_owned(),
                    "Not applicable".to_owned(),
                ],
                values: vec![
                    metrics.compliant as f64,
                    metrics.non_compliant as f64,
                    metrics.partial as f64,
                    metrics.not_applicable as f64,
                ],
            },
            ChartSpec {
                title: "Findings by severity".to_owned(),
                chart_type: "bar".to_owned(),
                labels: metrics.findings_by_severity.keys().cloned().collect(),
                values: metrics
                    .findings_by_severity
                    .values()
                    .map(|count| *count as f64)
                    .collect(),
            },
        ];

        let mut charts = Vec::with_capacity(specs.len());
        for spec in specs {
            let image_png = match self.chart_renderer.render(&spec).await {
                Ok(bytes) => Some(bytes),
                Err(error) => {
                    warn!(title = spec.title.as_str(), %error, "chart rendering failed; using placeholder");
                    None
                }
            };
            charts.push(ReportChart {
                title: spec.title,
                image_png,
            });
        }

        charts
    }
}
