//! Conforma API composition root.

#![forbid(unsafe_code)]

mod auth;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use conforma_application::{
    AuditRepository, AuditService, ChartRenderer, DirectoryRepository, DirectoryService,
    FindingRepository, FindingService, QuestionCatalog, QuestionRepository, QuestionnaireService,
    ReportRenderer, ReportService, UserService,
};
use conforma_core::AppError;
use conforma_infrastructure::{
    Argon2PasswordHasher, JsonQuestionCatalog, PdfReportRenderer, PostgresAuditRepository,
    PostgresDirectoryRepository, PostgresFindingRepository, PostgresQuestionRepository,
    PostgresUserRepository, QuickChartRenderer,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

    let database_url = required_env("DATABASE_URL")?;
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());

    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3001);

    let cookie_secure = env::var("SESSION_COOKIE_SECURE")
        .unwrap_or_else(|_| "false".to_owned())
        .eq_ignore_ascii_case("true");

    let chart_service_url =
        env::var("CHART_SERVICE_URL").unwrap_or_else(|_| "https://quickchart.io".to_owned());
    let chart_service_url = Url::parse(&chart_service_url)
        .map_err(|error| AppError::Validation(format!("invalid CHART_SERVICE_URL: {error}")))?;

    let question_catalog_path = env::var("QUESTION_CATALOG_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let session_store = PostgresStore::new(pool.clone())
        .with_table_name("tower_sessions")
        .map_err(|error| {
            AppError::Validation(format!("invalid session table name configuration: {error}"))
        })?;
    session_store.migrate().await.map_err(|error| {
        AppError::Internal(format!("failed to initialize session store: {error}"))
    })?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(cookie_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(30)));

    // User and auth services.
    let user_repository = Arc::new(PostgresUserRepository::new(pool.clone()));
    let password_hasher = Arc::new(Argon2PasswordHasher::new());
    let user_service = UserService::new(user_repository, password_hasher);

    // Directory, audit, and catalog services.
    let directory_repository: Arc<dyn DirectoryRepository> =
        Arc::new(PostgresDirectoryRepository::new(pool.clone()));
    let directory_service = DirectoryService::new(directory_repository.clone());

    let audit_repository: Arc<dyn AuditRepository> =
        Arc::new(PostgresAuditRepository::new(pool.clone()));
    let audit_service = AuditService::new(audit_repository);

    let question_repository: Arc<dyn QuestionRepository> =
        Arc::new(PostgresQuestionRepository::new(pool.clone()));
    let question_catalog: Arc<dyn QuestionCatalog> =
        Arc::new(JsonQuestionCatalog::new(question_catalog_path));
    let questionnaire_service = QuestionnaireService::new(
        audit_service.clone(),
        question_repository,
        question_catalog,
    );

    let finding_repository: Arc<dyn FindingRepository> =
        Arc::new(PostgresFindingRepository::new(pool.clone()));
    let finding_service = FindingService::new(audit_service.clone(), finding_repository.clone());

    // Report generation.
    let chart_renderer: Arc<dyn ChartRenderer> = Arc::new(QuickChartRenderer::new(
        reqwest::Client::new(),
        chart_service_url.to_string(),
    ));
    let report_renderer: Arc<dyn ReportRenderer> = Arc::new(PdfReportRenderer::new());
    let report_service = ReportService::new(
        audit_service.clone(),
        questionnaire_service.clone(),
        directory_repository,
        finding_repository,
        chart_renderer,
        report_renderer,
    );

    let app_state = AppState {
        user_service,
        directory_service,
        audit_service,
        questionnaire_service,
        finding_service,
        report_service,
        frontend_url: frontend_url.clone(),
    };

    let admin_routes = Router::new()
        .route(
            "/api/admin/questions",
            get(handlers::catalog::list_catalog_handler)
                .post(handlers::catalog::create_question_handler),
        )
        .route(
            "/api/admin/questions/{question_id}",
            put(handlers::catalog::update_question_handler),
        )
        .route_layer(from_fn(middleware::require_admin));

    let protected_routes = Router::new()
        .route(
            "/api/organisations",
            get(handlers::directory::list_organisations_handler)
                .post(handlers::directory::create_organisation_handler),
        )
        .route(
            "/api/organisations/{organisation_id}",
            get(handlers::directory::get_organisation_handler)
                .put(handlers::directory::update_organisation_handler)
                .delete(handlers::directory::delete_organisation_handler),
        )
        .route(
            "/api/sites",
            get(handlers::directory::list_sites_handler)
                .post(handlers::directory::create_site_handler),
        )
        .route(
            "/api/sites/{site_id}",
            get(handlers::directory::get_site_handler)
                .put(handlers::directory::update_site_handler)
                .delete(handlers::directory::delete_site_handler),
        )
        .route(
            "/api/referentials",
            get(handlers::catalog::list_referentials_handler),
        )
        .route(
            "/api/processes",
            get(handlers::catalog::list_processes_handler),
        )
        .route(
            "/api/role-qualification",
            get(handlers::audits::get_role_qualification_handler)
                .put(handlers::audits::save_role_qualification_handler),
        )
        .route(
            "/api/audits",
            get(handlers::audits::list_audits_handler)
                .post(handlers::audits::save_audit_handler),
        )
        .route(
            "/api/audits/{audit_id}",
            get(handlers::audits::get_audit_handler)
                .delete(handlers::audits::delete_audit_handler),
        )
        .route(
            "/api/audits/{audit_id}/complete",
            post(handlers::audits::complete_audit_handler),
        )
        .route(
            "/api/audits/{audit_id}/context",
            get(handlers::audits::audit_context_handler),
        )
        .route(
            "/api/audits/{audit_id}/questions",
            get(handlers::audits::audit_questions_handler),
        )
        .route(
            "/api/audits/{audit_id}/responses",
            get(handlers::audits::list_responses_handler)
                .put(handlers::audits::save_response_handler),
        )
        .route(
            "/api/audits/{audit_id}/findings",
            get(handlers::findings::list_findings_handler)
                .post(handlers::findings::create_finding_handler),
        )
        .route(
            "/api/findings/{finding_id}",
            put(handlers::findings::update_finding_handler),
        )
        .route(
            "/api/findings/{finding_id}/actions",
            get(handlers::findings::list_actions_handler)
                .post(handlers::findings::create_action_handler),
        )
        .route(
            "/api/actions/{action_id}",
            put(handlers::findings::update_action_handler),
        )
        .route(
            "/api/audits/{audit_id}/report",
            get(handlers::reports::audit_report_handler),
        )
        .route("/auth/me", get(auth::me_handler))
        .merge(admin_routes)
        .route_layer(from_fn(middleware::require_auth));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .merge(protected_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(session_layer)
        .with_state(app_state);

    let host = IpAddr::from_str(&api_host)
        .map_err(|error| AppError::Internal(format!("invalid API_HOST '{api_host}': {error}")))?;
    let address = SocketAddr::from((host, api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "conforma-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
