use conforma_application::{
    AuditService, DirectoryService, FindingService, QuestionnaireService, ReportService,
    UserService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub directory_service: DirectoryService,
    pub audit_service: AuditService,
    pub questionnaire_service: QuestionnaireService,
    pub finding_service: FindingService,
    pub report_service: ReportService,
    pub frontend_url: String,
}
