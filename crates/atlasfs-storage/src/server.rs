//! HTTP surface of the storage server
//!
//! One router serves both listeners: DFS clients hit the client port for
//! size/read/write, the naming server hits the command port for
//! create/delete/copy. Every endpoint is a POST with a JSON body; file
//! contents travel base64-encoded, and failures carry an
//! `{exception_type, exception_info}` body with a 4xx status.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use atlasfs_core::error::DfsError;
use atlasfs_core::proto::{
    BooleanResponse, CopyRequest, DataResponse, ExceptionBody, PathRequest, ReadRequest,
    SizeResponse, WriteRequest,
};
use atlasfs_core::rpc::NodeAddr;

use crate::config::StorageConfig;
use crate::service::StorageService;

type ApiError = (StatusCode, Json<ExceptionBody>);

fn api_error(err: DfsError) -> ApiError {
    let status = match err.http_status() {
        409 => StatusCode::CONFLICT,
        _ => StatusCode::NOT_FOUND,
    };
    (status, Json(ExceptionBody::from(&err)))
}

async fn storage_size(
    State(service): State<Arc<StorageService>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<SizeResponse>, ApiError> {
    let size = service.size(&req.path).await.map_err(api_error)?;
    Ok(Json(SizeResponse { size }))
}

async fn storage_read(
    State(service): State<Arc<StorageService>>,
    Json(req): Json<ReadRequest>,
) -> Result<Json<DataResponse>, ApiError> {
    let data = service
        .read(&req.path, req.offset, req.length)
        .await
        .map_err(api_error)?;
    Ok(Json(DataResponse {
        data: BASE64.encode(data),
    }))
}

async fn storage_write(
    State(service): State<Arc<StorageService>>,
    Json(req): Json<WriteRequest>,
) -> Result<Json<BooleanResponse>, ApiError> {
    let data = BASE64.decode(req.data.as_bytes()).map_err(|_| {
        api_error(DfsError::IllegalArgument(
            "data is not valid base64.".to_string(),
        ))
    })?;
    let success = service
        .write(&req.path, req.offset, &data)
        .await
        .map_err(api_error)?;
    Ok(Json(BooleanResponse { success }))
}

async fn storage_create(
    State(service): State<Arc<StorageService>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<BooleanResponse>, ApiError> {
    let success = service.create(&req.path).await.map_err(api_error)?;
    Ok(Json(BooleanResponse { success }))
}

async fn storage_delete(
    State(service): State<Arc<StorageService>>,
    Json(req): Json<PathRequest>,
) -> Result<Json<BooleanResponse>, ApiError> {
    let success = service.delete(&req.path).await.map_err(api_error)?;
    Ok(Json(BooleanResponse { success }))
}

async fn storage_copy(
    State(service): State<Arc<StorageService>>,
    Json(req): Json<CopyRequest>,
) -> Result<Json<BooleanResponse>, ApiError> {
    let source = NodeAddr::new(req.server_ip, req.server_port);
    let success = service.copy(&req.path, &source).await.map_err(api_error)?;
    Ok(Json(BooleanResponse { success }))
}

/// All storage endpoints over the given service instance.
pub fn router(service: Arc<StorageService>) -> Router {
    Router::new()
        .route("/storage_size", post(storage_size))
        .route("/storage_read", post(storage_read))
        .route("/storage_write", post(storage_write))
        .route("/storage_create", post(storage_create))
        .route("/storage_delete", post(storage_delete))
        .route("/storage_copy", post(storage_copy))
        .with_state(service)
}

/// Binds the client and command listeners. Callers register with the
/// naming server between binding and serving, so the advertised ports are
/// already reachable when the registration lands.
pub async fn bind(
    config: &StorageConfig,
) -> anyhow::Result<(tokio::net::TcpListener, tokio::net::TcpListener)> {
    let client_listener = tokio::net::TcpListener::bind(("0.0.0.0", config.client_port)).await?;
    let command_listener = tokio::net::TcpListener::bind(("0.0.0.0", config.command_port)).await?;
    tracing::info!(
        client_port = config.client_port,
        command_port = config.command_port,
        "storage server listening"
    );
    Ok((client_listener, command_listener))
}

/// Serves the same routes on both listeners until one of them fails.
pub async fn serve(
    service: Arc<StorageService>,
    client_listener: tokio::net::TcpListener,
    command_listener: tokio::net::TcpListener,
) -> anyhow::Result<()> {
    let app = router(service);

    let client_app = app.clone();
    tokio::try_join!(
        async { axum::serve(client_listener, client_app).await },
        async { axum::serve(command_listener, app).await },
    )?;
    Ok(())
}
