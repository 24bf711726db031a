//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_service;
mod directory_service;
mod finding_service;
mod questionnaire_service;
mod report_service;
mod user_service;

pub use audit_service::{
    AuditContext, AuditDraftInput, AuditRecord, AuditRepository, AuditService, ResponseRecord,
    SaveResponseInput,
};
pub use directory_service::{
    DirectoryRepository, DirectoryService, OrganisationInput, OrganisationRecord, SiteInput,
    SiteRecord,
};
pub use finding_service::{
    ActionInput, ActionRecord, FindingInput, FindingRecord, FindingRepository, FindingService,
};
pub use questionnaire_service::{
    QuestionCatalog, QuestionQuery, QuestionRepository, QuestionnaireResult, QuestionnaireService,
    RoleClause, SaveQuestionInput,
};
pub use report_service::{
    AuditReport, ChartRenderer, ChartSpec, ReportChart, ReportMetrics, ReportRenderer, ReportRow,
    ReportService,
};
pub use user_service::{
    AuthOutcome, PasswordHasher, RegisterParams, SubscriptionTier, UserRecord, UserRepository,
    UserService,
};
