//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod argon2_password_hasher;
mod json_question_catalog;
mod pdf_report_renderer;
mod postgres_audit_repository;
mod postgres_directory_repository;
mod postgres_finding_repository;
mod postgres_question_repository;
mod postgres_user_repository;
mod quickchart_chart_renderer;

pub use argon2_password_hasher::Argon2PasswordHasher;
pub use json_question_catalog::JsonQuestionCatalog;
pub use pdf_report_renderer::PdfReportRenderer;
pub use postgres_audit_repository::PostgresAuditRepository;
pub use postgres_directory_repository::PostgresDirectoryRepository;
pub use postgres_finding_repository::PostgresFindingRepository;
pub use postgres_question_repository::PostgresQuestionRepository;
pub use postgres_user_repository::PostgresUserRepository;
pub use quickchart_chart_renderer::QuickChartRenderer;
