//! HTTP Layer
//!
//! axum router exposing the application services as a JSON API.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod openapi;

use crate::application::EbdApp;
use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};
pub use extract::{ApiJson, ApiPath, CurrentUser};

/// Shared state handed to every handler
pub type AppState = Arc<EbdApp>;

/// Build the API router
pub fn router(app: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/apispec.json", get(handlers::apispec))
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/protected", get(handlers::protected))
        .route(
            "/classes",
            get(handlers::list_classes).post(handlers::create_class),
        )
        .route(
            "/classes/{id}",
            put(handlers::update_class).delete(handlers::delete_class),
        )
        .route(
            "/alunos",
            get(handlers::list_students).post(handlers::create_student),
        )
        .route(
            "/alunos/{id}",
            put(handlers::update_student).delete(handlers::delete_student),
        )
        .route("/alunos/{id}/historico", get(handlers::student_history))
        .route("/aniversariantes", get(handlers::birthdays))
        .route(
            "/frequencias",
            get(handlers::list_attendance).post(handlers::create_attendance),
        )
        .route(
            "/frequencias/{id}",
            put(handlers::update_attendance).delete(handlers::delete_attendance),
        )
        .route("/relatorios/semanal", get(handlers::weekly_report))
        .route("/relatorios/mensal", get(handlers::monthly_report))
        .with_state(app)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
