mod audits;
mod auth;
mod catalog;
mod common;
mod directory;
mod findings;

pub use audits::{
    AuditContextResponse, AuditResponse, ResponseRecordResponse, RoleQualificationResponse,
    SaveAuditRequest, SaveResponseRequest, SaveRoleQualificationRequest,
};
pub use auth::{AuthLoginRequest, AuthLoginResponse, AuthRegisterRequest};
pub use catalog::{
    ProcessResponse, QuestionResponse, QuestionnaireResponse, ReferentialResponse,
    SaveQuestionRequest,
};
pub use common::{GenericMessageResponse, HealthResponse, UserIdentityResponse};
pub use directory::{
    OrganisationResponse, SaveOrganisationRequest, SaveSiteRequest, SiteResponse,
};
pub use findings::{ActionResponse, FindingResponse, SaveActionRequest, SaveFindingRequest};
