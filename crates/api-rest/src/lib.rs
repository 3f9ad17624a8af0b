//! # API REST
//!
//! REST API implementation for HealthDesk.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, base64 uploads, CORS, status codes)
//!
//! Uses `api-shared` for request/response types. The server binary builds an [`AppState`]
//! and serves [`router`].

#![warn(rust_2018_idioms)]

mod error;

pub use error::ApiError;

use api_shared::{
    AttachmentRes, DashboardRes, ErrorRes, HealthRes, HealthService, ListPatientsRes, LoginReq,
    PatientRes, RegisterReq, UploadReq,
};
use axum::{
    extract::{Path as AxumPath, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use base64::Engine;
use healthdesk_core::{PatientService, RegistrationForm};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST API handlers.
///
/// One `PatientService` sits behind a mutex, so requests that touch the store run one at a
/// time.
#[derive(Clone)]
pub struct AppState {
    service: Arc<Mutex<PatientService>>,
}

impl AppState {
    pub fn new(service: PatientService) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_patients,
        register_patient,
        login,
        get_patient,
        get_dashboard,
        upload_attachment,
        download_attachment,
    ),
    components(schemas(
        HealthRes,
        RegisterReq,
        LoginReq,
        UploadReq,
        PatientRes,
        AttachmentRes,
        api_shared::TriageRes,
        DashboardRes,
        ListPatientsRes,
        ErrorRes,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/patients", get(list_patients).post(register_patient))
        .route("/login", post(login))
        .route("/patients/:id", get(get_patient))
        .route("/patients/:id/dashboard", get(get_dashboard))
        .route("/patients/:id/attachments", post(upload_attachment))
        .route("/patients/:id/attachments/:hash", get(download_attachment))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    let records = state.service.lock().await.list().len();
    Json(HealthService::check_health(records))
}

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "All records in registration order", body = ListPatientsRes)
    )
)]
#[axum::debug_handler]
async fn list_patients(State(state): State<AppState>) -> Json<ListPatientsRes> {
    let service = state.service.lock().await;
    Json(ListPatientsRes {
        patients: service.list().iter().map(PatientRes::from).collect(),
    })
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Record created", body = PatientRes),
        (status = 400, description = "Validation failed", body = ErrorRes),
        (status = 409, description = "Identity already registered", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Register a new patient or doctor record.
///
/// The identity is derived according to the server's identity scheme. BMI is returned when
/// both measurements are given.
#[axum::debug_handler]
async fn register_patient(
    State(state): State<AppState>,
    Json(req): Json<RegisterReq>,
) -> Result<(StatusCode, Json<PatientRes>), ApiError> {
    let form = RegistrationForm::from(req);
    let record = state.service.lock().await.register(&form)?;
    Ok((StatusCode::CREATED, Json(PatientRes::from(&record))))
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Dashboard of the first matching record", body = DashboardRes),
        (status = 404, description = "No record with that name and phone", body = ErrorRes)
    )
)]
/// Log in by name and phone.
#[axum::debug_handler]
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<Json<DashboardRes>, ApiError> {
    let dashboard = state.service.lock().await.login(&req.name, &req.phone)?;
    Ok(Json(DashboardRes::from(&dashboard)))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = String, Path, description = "Record identity (email, name|phone or generated id)")),
    responses(
        (status = 200, description = "The record", body = PatientRes),
        (status = 400, description = "Malformed identity", body = ErrorRes),
        (status = 404, description = "No such record", body = ErrorRes)
    )
)]
#[axum::debug_handler]
async fn get_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<PatientRes>, ApiError> {
    let service = state.service.lock().await;
    let record = service.record(&id)?;
    Ok(Json(PatientRes::from(record)))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/dashboard",
    params(("id" = String, Path, description = "Record identity")),
    responses(
        (status = 200, description = "Record with BMI triage", body = DashboardRes),
        (status = 400, description = "Malformed identity", body = ErrorRes),
        (status = 404, description = "No such record", body = ErrorRes)
    )
)]
/// Log in by identity and return the dashboard.
#[axum::debug_handler]
async fn get_dashboard(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<DashboardRes>, ApiError> {
    let dashboard = state.service.lock().await.login_by_id(&id)?;
    Ok(Json(DashboardRes::from(&dashboard)))
}

#[utoipa::path(
    post,
    path = "/patients/{id}/attachments",
    params(("id" = String, Path, description = "Record identity")),
    request_body = UploadReq,
    responses(
        (status = 201, description = "Upload stored and attached", body = AttachmentRes),
        (status = 400, description = "Bad base64, empty content or unsupported type", body = ErrorRes),
        (status = 404, description = "No such record", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Upload a file and attach it to a record.
///
/// Accepted types are pdf, png, jpg, jpeg and txt. Text uploads are scanned for the
/// configured keywords and tagged with the first match.
#[axum::debug_handler]
async fn upload_attachment(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<UploadReq>,
) -> Result<(StatusCode, Json<AttachmentRes>), ApiError> {
    let content = base64::engine::general_purpose::STANDARD
        .decode(req.content_base64.trim())
        .map_err(|e| ApiError::BadRequest(format!("content_base64: {e}")))?;

    let attachment = state.service.lock().await.upload(
        &id,
        &req.filename,
        req.content_type.as_deref(),
        &content,
    )?;
    Ok((StatusCode::CREATED, Json(AttachmentRes::from(&attachment))))
}

#[utoipa::path(
    get,
    path = "/patients/{id}/attachments/{hash}",
    params(
        ("id" = String, Path, description = "Record identity"),
        ("hash" = String, Path, description = "SHA-256 of the attachment, as lowercase hex")
    ),
    responses(
        (status = 200, description = "Stored content of the attachment", content_type = "application/octet-stream"),
        (status = 400, description = "Malformed identity or hash", body = ErrorRes),
        (status = 404, description = "No such record or attachment", body = ErrorRes)
    )
)]
/// Download the content of an attachment.
///
/// The response carries the sniffed media type, or the one implied by the upload kind.
#[axum::debug_handler]
async fn download_attachment(
    State(state): State<AppState>,
    AxumPath((id, hash)): AxumPath<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let (attachment, content) = state.service.lock().await.attachment_content(&id, &hash)?;
    let content_type = attachment
        .media_type
        .unwrap_or_else(|| attachment.kind.mime_type().to_owned());
    Ok(([(header::CONTENT_TYPE, content_type)], content))
}
