//! Route handlers

use super::error::ApiResult;
use super::extract::{ApiJson, ApiPath, CurrentUser};
use super::openapi;
use super::AppState;
use crate::application::attendance::MSG_ATTENDANCE_DELETED;
use crate::application::classes::MSG_CLASS_DELETED;
use crate::application::students::MSG_STUDENT_DELETED;
use crate::application::{MonthlyQuery, WeeklyQuery};
use crate::domain::{
    Attendance, AttendancePayload, Class, ClassPayload, Credentials, HistoryRecord, Student,
    StudentPayload, User,
};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

pub const BANNER: &str =
    "Sistema de Gestão da EBD - API com melhorias (Autenticação, CRUD, Validações e Documentação)";

fn deleted(msg: &str) -> Json<Value> {
    Json(json!({ "msg": msg }))
}

pub async fn index() -> &'static str {
    BANNER
}

pub async fn health(State(app): State<AppState>) -> impl IntoResponse {
    match app.store.ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

pub async fn apispec() -> Json<Value> {
    Json(openapi::document())
}

// ---- Auth ----

pub async fn register(
    State(app): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = app.auth.register(credentials).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(app): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> ApiResult<Json<Value>> {
    let token = app.auth.login(credentials).await?;
    Ok(Json(json!({ "access_token": token })))
}

pub async fn protected(user: CurrentUser) -> Json<Value> {
    Json(json!({ "msg": format!("Usuário logado: {}", user.id) }))
}

// ---- Classes ----

pub async fn list_classes(
    _user: CurrentUser,
    State(app): State<AppState>,
) -> ApiResult<Json<Vec<Class>>> {
    Ok(Json(app.classes.list().await?))
}

pub async fn create_class(
    _user: CurrentUser,
    State(app): State<AppState>,
    ApiJson(payload): ApiJson<ClassPayload>,
) -> ApiResult<(StatusCode, Json<Class>)> {
    let class = app.classes.create(payload).await?;
    Ok((StatusCode::CREATED, Json(class)))
}

pub async fn update_class(
    _user: CurrentUser,
    State(app): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<ClassPayload>,
) -> ApiResult<Json<Class>> {
    Ok(Json(app.classes.update(id, payload).await?))
}

pub async fn delete_class(
    _user: CurrentUser,
    State(app): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<Value>> {
    app.classes.delete(id).await?;
    Ok(deleted(MSG_CLASS_DELETED))
}

// ---- Students ----

pub async fn list_students(
    _user: CurrentUser,
    State(app): State<AppState>,
) -> ApiResult<Json<Vec<Student>>> {
    Ok(Json(app.students.list().await?))
}

pub async fn create_student(
    _user: CurrentUser,
    State(app): State<AppState>,
    ApiJson(payload): ApiJson<StudentPayload>,
) -> ApiResult<(StatusCode, Json<Student>)> {
    let student = app.students.create(payload).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

pub async fn update_student(
    _user: CurrentUser,
    State(app): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<StudentPayload>,
) -> ApiResult<Json<Student>> {
    Ok(Json(app.students.update(id, payload).await?))
}

pub async fn delete_student(
    _user: CurrentUser,
    State(app): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<Value>> {
    app.students.delete(id).await?;
    Ok(deleted(MSG_STUDENT_DELETED))
}

pub async fn birthdays(
    _user: CurrentUser,
    State(app): State<AppState>,
) -> ApiResult<Json<Vec<Student>>> {
    let today = Utc::now().date_naive();
    Ok(Json(app.students.birthdays(today).await?))
}

pub async fn student_history(
    _user: CurrentUser,
    State(app): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<Vec<HistoryRecord>>> {
    Ok(Json(app.students.history(id).await?))
}

// ---- Attendance ----

pub async fn list_attendance(
    _user: CurrentUser,
    State(app): State<AppState>,
) -> ApiResult<Json<Vec<Attendance>>> {
    Ok(Json(app.attendance.list().await?))
}

pub async fn create_attendance(
    _user: CurrentUser,
    State(app): State<AppState>,
    ApiJson(payload): ApiJson<AttendancePayload>,
) -> ApiResult<(StatusCode, Json<Attendance>)> {
    let record = app.attendance.create(payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_attendance(
    _user: CurrentUser,
    State(app): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(payload): ApiJson<AttendancePayload>,
) -> ApiResult<Json<Attendance>> {
    Ok(Json(app.attendance.update(id, payload).await?))
}

pub async fn delete_attendance(
    _user: CurrentUser,
    State(app): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> ApiResult<Json<Value>> {
    app.attendance.delete(id).await?;
    Ok(deleted(MSG_ATTENDANCE_DELETED))
}

// ---- Reports ----

pub async fn weekly_report(
    _user: CurrentUser,
    State(app): State<AppState>,
    Query(query): Query<WeeklyQuery>,
) -> ApiResult<Json<Vec<Attendance>>> {
    Ok(Json(app.reports.weekly(&query).await?))
}

pub async fn monthly_report(
    _user: CurrentUser,
    State(app): State<AppState>,
    Query(query): Query<MonthlyQuery>,
) -> ApiResult<Json<Vec<Attendance>>> {
    Ok(Json(app.reports.monthly(&query).await?))
}
