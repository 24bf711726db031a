//! Question applicability predicate.
//!
//! Decides which subset of the question catalog applies to an audit, given
//! its referential selection, resolved process candidates, and declared
//! economic role. The process clause is deliberately a disjunction: a
//! conjunctive filter would wrongly exclude generic questions whenever any
//! process selection is present.

use crate::process::ProcessCandidates;
use crate::question::Question;
use crate::roles::{role_is_generic, roles_match};

/// Applicability conditions derived from one audit's stored context.
#[derive(Debug, Clone)]
pub struct ApplicabilityFilter {
    referential_ids: Vec<i64>,
    candidates: ProcessCandidates,
    economic_role: Option<String>,
}

impl ApplicabilityFilter {
    /// Creates a filter from the audit's resolved context.
    #[must_use]
    pub fn new(
        referential_ids: Vec<i64>,
        candidates: ProcessCandidates,
        economic_role: Option<String>,
    ) -> Self {
        Self {
            referential_ids,
            candidates,
            economic_role: economic_role.filter(|value| !value.trim().is_empty()),
        }
    }

    /// Returns the audit's referential id selection.
    #[must_use]
    pub fn referential_ids(&self) -> &[i64] {
        &self.referential_ids
    }

    /// Returns the resolved process candidate set.
    #[must_use]
    pub fn candidates(&self) -> &ProcessCandidates {
        &self.candidates
    }

    /// Returns the audit's economic role, if declared.
    #[must_use]
    pub fn economic_role(&self) -> Option<&str> {
        self.economic_role.as_deref()
    }

    /// Referential clause: unscoped questions always pass; an empty audit
    /// selection passes everything.
    #[must_use]
    pub fn matches_referential(&self, question: &Question) -> bool {
        match question.referential_id() {
            None => true,
            Some(id) => self.referential_ids.is_empty() || self.referential_ids.contains(&id),
        }
    }

    /// Process clause, an OR across three conditions: exact process id
    /// match, generic question (empty list), or any string candidate
    /// present in `applicable_processes`.
    ///
    /// An empty audit selection means "all processes" and passes everything.
    #[must_use]
    pub fn matches_process(&self, question: &Question) -> bool {
        if self.candidates.is_empty() {
            return true;
        }

        if let Some(process_id) = question.process_id()
            && self.candidates.contains_id(process_id)
        {
            return true;
        }

        if question.applicable_processes().is_empty() {
            return true;
        }

        question
            .applicable_processes()
            .iter()
            .any(|entry| self.candidates.matches_label(entry))
    }

    /// Role clause: generic question roles always pass; otherwise compare
    /// through the synonym table.
    #[must_use]
    pub fn matches_role(&self, question: &Question) -> bool {
        if role_is_generic(question.economic_role()) {
            return true;
        }

        match (&self.economic_role, question.economic_role()) {
            (Some(audit_role), Some(question_role)) => roles_match(audit_role, question_role),
            // Audit without a declared role sees only generic questions.
            (None, Some(_)) => false,
            (_, None) => true,
        }
    }

    /// Full strict predicate: referential AND process AND role.
    #[must_use]
    pub fn matches(&self, question: &Question) -> bool {
        self.matches_referential(question)
            && self.matches_process(question)
            && self.matches_role(question)
    }
}

/// Result of filtering a catalog, with degradation flags.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// The applicable questions, in catalog order.
    pub questions: Vec<Question>,
    /// Set when the strict role clause matched nothing and was dropped.
    pub role_filter_relaxed: bool,
}

impl FilterOutcome {
    /// Filters a catalog, relaxing the role clause when it would otherwise
    /// produce an empty questionnaire.
    ///
    /// An overly strict role match is treated as more likely wrong than the
    /// audit genuinely having zero applicable questions. The retry applies
    /// to role-less audits too: their strict pass sees only generic
    /// questions, which can just as well empty the result. The flag stays
    /// unset when dropping the clause changes nothing.
    #[must_use]
    pub fn compute(catalog: &[Question], filter: &ApplicabilityFilter) -> Self {
        let strict: Vec<Question> = catalog
            .iter()
            .filter(|question| filter.matches(question))
            .cloned()
            .collect();

        if !strict.is_empty() {
            return Self {
                questions: strict,
                role_filter_relaxed: false,
            };
        }

        let relaxed: Vec<Question> = catalog
            .iter()
            .filter(|question| {
                filter.matches_referential(question) && filter.matches_process(question)
            })
            .cloned()
            .collect();
        let role_filter_relaxed = !relaxed.is_empty();

        Self {
            questions: relaxed,
            role_filter_relaxed,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::process::{Process, ProcessCandidates, ProcessToken};
    use crate::question::Question;

    use super::{ApplicabilityFilter, FilterOutcome};

    fn question(
        id: i64,
        referential_id: Option<i64>,
        process_id: Option<i64>,
        economic_role: Option<&str>,
        applicable_processes: &[&str],
    ) -> Question {
        Question::new(
            id,
            format!("q_{id}"),
            referential_id,
            process_id,
            None,
            format!("Question {id}"),
            None,
            economic_role.map(str::to_owned),
            applicable_processes.iter().map(|s| (*s).to_owned()).collect(),
            None,
        )
        .unwrap_or_else(|_| unreachable!())
    }

    fn traceability_candidates() -> ProcessCandidates {
        ProcessCandidates::resolve(
            &[ProcessToken::Text("traceability_udi".to_owned())],
            &[Process::new(8, "traceability_udi", "Traçabilité UDI")
                .unwrap_or_else(|_| unreachable!())],
        )
    }

    #[test]
    fn generic_question_passes_despite_process_selection() {
        let filter = ApplicabilityFilter::new(vec![3], traceability_candidates(), None);
        let generic = question(1, Some(3), None, None, &[]);

        assert!(filter.matches(&generic));
    }

    #[test]
    fn role_synonyms_are_equivalent() {
        let filter = ApplicabilityFilter::new(
            vec![],
            ProcessCandidates::default(),
            Some("distributeur".to_owned()),
        );
        let distributor_question = question(1, None, None, Some("distributor"), &[]);
        let importer_question = question(2, None, None, Some("importer"), &[]);

        assert!(filter.matches(&distributor_question));
        assert!(!filter.matches(&importer_question));
    }

    #[test]
    fn role_filter_relaxes_when_it_would_empty_the_questionnaire() {
        let catalog = vec![
            question(1, Some(3), None, Some("manufacturer"), &[]),
            question(2, Some(3), None, Some("importer"), &[]),
        ];
        let filter = ApplicabilityFilter::new(
            vec![3],
            ProcessCandidates::default(),
            Some("notified body".to_owned()),
        );

        let outcome = FilterOutcome::compute(&catalog, &filter);

        assert!(outcome.role_filter_relaxed);
        assert_eq!(outcome.questions.len(), 2);

        // The relaxed output equals the filter with the role clause removed.
        let without_role: Vec<i64> = catalog
            .iter()
            .filter(|q| filter.matches_referential(q) && filter.matches_process(q))
            .map(Question::id)
            .collect();
        let relaxed: Vec<i64> = outcome.questions.iter().map(Question::id).collect();
        assert_eq!(relaxed, without_role);
    }

    #[test]
    fn role_less_audit_relaxes_against_a_role_scoped_catalog() {
        let catalog = vec![
            question(1, Some(3), None, Some("manufacturer"), &[]),
            question(2, Some(3), None, Some("importer"), &[]),
        ];
        let filter = ApplicabilityFilter::new(vec![3], ProcessCandidates::default(), None);

        let outcome = FilterOutcome::compute(&catalog, &filter);

        assert!(outcome.role_filter_relaxed);
        let ids: Vec<i64> = outcome.questions.iter().map(Question::id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn empty_relaxed_result_leaves_the_flag_unset() {
        // Emptiness caused by the referential clause, not the role clause.
        let catalog = vec![question(1, Some(9), None, Some("manufacturer"), &[])];
        let filter = ApplicabilityFilter::new(
            vec![3],
            ProcessCandidates::default(),
            Some("fabricant".to_owned()),
        );

        let outcome = FilterOutcome::compute(&catalog, &filter);

        assert!(outcome.questions.is_empty());
        assert!(!outcome.role_filter_relaxed);
    }

    #[test]
    fn strict_match_does_not_relax() {
        let catalog = vec![
            question(1, Some(3), None, Some("manufacturer"), &[]),
            question(2, Some(3), None, Some("importer"), &[]),
        ];
        let filter = ApplicabilityFilter::new(
            vec![3],
            ProcessCandidates::default(),
            Some("fabricant".to_owned()),
        );

        let outcome = FilterOutcome::compute(&catalog, &filter);

        assert!(!outcome.role_filter_relaxed);
        assert_eq!(outcome.questions.len(), 1);
        assert_eq!(outcome.questions[0].id(), 1);
    }

    #[test]
    fn end_to_end_referential_process_and_role() {
        // Audit: referentials [3], processes ["traceability_udi"], role fabricant.
        // Catalog: q1 scoped to referential 3 + process 8, generic role;
        // q2 scoped to referential 2. Only q1 applies.
        let catalog = vec![
            question(1, Some(3), Some(8), None, &[]),
            question(2, Some(2), None, None, &[]),
        ];
        let filter = ApplicabilityFilter::new(
            vec![3],
            traceability_candidates(),
            Some("fabricant".to_owned()),
        );

        let outcome = FilterOutcome::compute(&catalog, &filter);

        assert!(!outcome.role_filter_relaxed);
        let ids: Vec<i64> = outcome.questions.iter().map(Question::id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn applicable_processes_membership_matches_display_name() {
        let filter = ApplicabilityFilter::new(vec![], traceability_candidates(), None);
        let by_name = question(1, None, None, None, &["Traçabilité UDI"]);
        let by_slug = question(2, None, None, None, &["TRACEABILITY_UDI"]);
        let by_id = question(3, None, None, None, &["8"]);
        let other = question(4, None, None, None, &["design_control"]);

        assert!(filter.matches(&by_name));
        assert!(filter.matches(&by_slug));
        assert!(filter.matches(&by_id));
        assert!(!filter.matches(&other));
    }

    #[test]
    fn empty_selection_means_all_processes() {
        let filter = ApplicabilityFilter::new(vec![], ProcessCandidates::default(), None);
        let scoped = question(1, None, Some(12), None, &["design_control"]);

        assert!(filter.matches(&scoped));
    }
}
