//! HTTP surface of the naming server
//!
//! One router serves both listeners: clients hit the service port, storage
//! nodes hit the registration port, and both see the same in-process
//! state. Every endpoint is a POST with a JSON body; failures carry an
//! `{exception_type, exception_info}` body with a 4xx status.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;

use atlasfs_core::error::DfsError;
use atlasfs_core::proto::{
    BooleanResponse, ExceptionBody, FilesResponse, LockRequest, PathRequest, RegisterRequest,
    RegisterResponse, StorageAddress,
};

use crate::config::NamingConfig;
use crate::service::NamingService;

type ApiError = (StatusCode, Json<ExceptionBody>);

fn api_error(err: DfsError) -> ApiError {
    let status = match err.http_status() {
        409 => StatusCode::CONFLICT,
        _ => StatusCode::NOT_FOUND,
    };
    (status, Json(ExceptionBody::from(&err)))
}

async fn register(
    State(service): State<Arc<NamingService>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let files = service
        .register(&req.storage_ip, req.client_port, req.command_port, &req.files)
        .await
        .map_err(api_error)?;
    Ok(Json(RegisterResponse { files }))
}

async fn is_directory(
    State(service): State<Arc<NamingService>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<BooleanResponse>, ApiError> {
    let success = service.is_directory(&req.path).map_err(api_error)?;
    Ok(Json(BooleanResponse { success }))
}

async fn list(
    State(service): State<Arc<NamingService>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<FilesResponse>, ApiError> {
    let files = service.list(&req.path).map_err(api_error)?;
    Ok(Json(FilesResponse { files }))
}

async fn create_directory(
    State(service): State<Arc<NamingService>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<BooleanResponse>, ApiError> {
    let success = service.create_directory(&req.path).await.map_err(api_error)?;
    Ok(Json(BooleanResponse { success }))
}

async fn create_file(
    State(service): State<Arc<NamingService>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<BooleanResponse>, ApiError> {
    let success = service.create_file(&req.path).await.map_err(api_error)?;
    Ok(Json(BooleanResponse { success }))
}

async fn delete(
    State(service): State<Arc<NamingService>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<BooleanResponse>, ApiError> {
    service.delete(&req.path).await.map_err(api_error)?;
    Ok(Json(BooleanResponse { success: true }))
}

async fn get_storage(
    State(service): State<Arc<NamingService>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<StorageAddress>, ApiError> {
    let addr = service.get_storage(&req.path).map_err(api_error)?;
    Ok(Json(addr))
}

async fn lock(
    State(service): State<Arc<NamingService>>,
    Json(req): Json<LockRequest>,
) -> Result<StatusCode, ApiError> {
    service
        .lock(&req.path, req.exclusive)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::OK)
}

async fn unlock(
    State(service): State<Arc<NamingService>>,
    Json(req): Json<LockRequest>,
) -> Result<StatusCode, ApiError> {
    service
        .unlock(&req.path, req.exclusive)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::OK)
}

/// All naming endpoints over the given service instance.
pub fn router(service: Arc<NamingService>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/is_directory", post(is_directory))
        .route("/list", post(list))
        .route("/create_directory", post(create_directory))
        .route("/create_file", post(create_file))
        .route("/delete", post(delete))
        .route("/get_storage", post(get_storage))
        .route("/lock", post(lock))
        .route("/unlock", post(unlock))
        .with_state(service)
}

/// Binds the service and registration listeners and serves until one of
/// them fails.
pub async fn serve(service: Arc<NamingService>, config: &NamingConfig) -> anyhow::Result<()> {
    let app = router(service);

    let service_listener =
        tokio::net::TcpListener::bind(("0.0.0.0", config.service_port)).await?;
    let registration_listener =
        tokio::net::TcpListener::bind(("0.0.0.0", config.registration_port)).await?;
    tracing::info!(
        service_port = config.service_port,
        registration_port = config.registration_port,
        "naming server listening"
    );

    let service_app = app.clone();
    tokio::try_join!(
        async { axum::serve(service_listener, service_app).await },
        async { axum::serve(registration_listener, app).await },
    )?;
    Ok(())
}
