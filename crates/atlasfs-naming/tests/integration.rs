//! Integration tests driving the naming server through its HTTP router.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use atlasfs_core::mock_rpc::{MockStorageRpc, RpcCall};
use atlasfs_core::rpc::{NodeAddr, StorageRpc};
use atlasfs_naming::server::router;
use atlasfs_naming::service::NamingService;

fn test_router() -> (Router, Arc<MockStorageRpc>) {
    let rpc = Arc::new(MockStorageRpc::new());
    let service = Arc::new(NamingService::new(
        8090,
        Arc::clone(&rpc) as Arc<dyn StorageRpc>,
    ));
    (router(service), rpc)
}

async fn post(app: &Router, endpoint: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(endpoint)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register_node(
    app: &Router,
    client_port: u16,
    command_port: u16,
    files: &[&str],
) -> (StatusCode, Value) {
    post(
        app,
        "/register",
        json!({
            "storage_ip": "127.0.0.1",
            "client_port": client_port,
            "command_port": command_port,
            "files": files,
        }),
    )
    .await
}

#[tokio::test]
async fn test_register_then_query_namespace() {
    let (app, _) = test_router();

    let (status, body) = register_node(&app, 9000, 9001, &["/x.txt"]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["files"], json!([]));

    let (status, body) = post(&app, "/is_directory", json!({"path": "/x.txt"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));

    let (status, body) = post(&app, "/list", json!({"path": "/"})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["files"].as_array().unwrap().contains(&json!("x.txt")));

    let (status, body) = post(&app, "/get_storage", json!({"path": "/x.txt"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"server_ip": "127.0.0.1", "server_port": 9000}));
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let (app, _) = test_router();
    register_node(&app, 9000, 9001, &["/"]).await;

    let (status, body) = register_node(&app, 9100, 9001, &["/"]).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["exception_type"], json!("IllegalStateException"));
    assert_eq!(
        body["exception_info"],
        json!("This storage server is already registered.")
    );
}

#[tokio::test]
async fn test_registration_reports_known_files_for_deletion() {
    let (app, _) = test_router();
    register_node(&app, 9000, 9001, &["/x.txt"]).await;

    let (status, body) = register_node(&app, 9002, 9003, &["/x.txt", "/y.txt"]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["files"], json!(["/x.txt"]));

    // /y.txt was new, so it belongs to the second node.
    let (_, body) = post(&app, "/get_storage", json!({"path": "/y.txt"})).await;
    assert_eq!(body["server_port"], json!(9002));
}

#[tokio::test]
async fn test_create_file_without_storage_nodes_is_illegal_state() {
    let (app, _) = test_router();

    let (status, body) = post(&app, "/create_file", json!({"path": "/new.txt"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["exception_type"], json!("IllegalStateException"));
    assert_eq!(
        body["exception_info"],
        json!("no storage servers are registered with the naming server.")
    );
}

#[tokio::test]
async fn test_create_file_places_bytes_on_first_node() {
    let (app, rpc) = test_router();
    register_node(&app, 9000, 9001, &["/"]).await;
    register_node(&app, 9002, 9003, &["/"]).await;

    let (status, body) = post(&app, "/create_file", json!({"path": "/new.txt"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(
        rpc.calls(),
        vec![RpcCall::Create {
            node: NodeAddr::new("127.0.0.1", 9001),
            path: "/new.txt".to_string(),
        }]
    );

    // Creating the same path again is a soft failure.
    let (status, body) = post(&app, "/create_file", json!({"path": "/new.txt"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));

    let (status, body) = post(&app, "/create_file", json!({"path": "/missing/f.txt"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["exception_type"], json!("FileNotFoundException"));
}

#[tokio::test]
async fn test_create_directory() {
    let (app, _) = test_router();

    let (status, body) = post(&app, "/create_directory", json!({"path": "/docs"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let (status, body) = post(&app, "/create_directory", json!({"path": "/docs"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(false));

    let (status, body) = post(&app, "/create_directory", json!({"path": ""})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["exception_type"], json!("IllegalArgumentException"));
}

#[tokio::test]
async fn test_delete_fans_out_and_keeps_namespace_entry() {
    let (app, rpc) = test_router();
    register_node(&app, 9000, 9001, &["/x.txt"]).await;
    register_node(&app, 9002, 9003, &["/"]).await;

    let (status, body) = post(&app, "/delete", json!({"path": "/x.txt"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let targets: Vec<u16> = rpc
        .delete_calls()
        .iter()
        .filter_map(|c| match c {
            RpcCall::Delete { node, .. } => Some(node.port),
            _ => None,
        })
        .collect();
    assert_eq!(targets, vec![9001, 9003]);

    // The tree still knows the path even though the bytes are gone.
    let (status, _) = post(&app, "/is_directory", json!({"path": "/x.txt"})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(&app, "/delete", json!({"path": "/ghost"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["exception_type"], json!("FileNotFoundException"));
}

#[tokio::test]
async fn test_lock_and_unlock_return_empty_200() {
    let (app, _) = test_router();
    register_node(&app, 9000, 9001, &["/x.txt"]).await;

    let (status, body) = post(&app, "/lock", json!({"path": "/x.txt", "exclusive": false})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    let (status, body) =
        post(&app, "/unlock", json!({"path": "/x.txt", "exclusive": false})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);

    let (status, body) = post(&app, "/lock", json!({"path": "/ghost", "exclusive": false})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["exception_type"], json!("FileNotFoundException"));

    let (status, body) =
        post(&app, "/unlock", json!({"path": "/ghost", "exclusive": false})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["exception_type"], json!("IllegalArgumentException"));

    let (status, body) = post(&app, "/lock", json!({"path": "", "exclusive": false})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["exception_type"], json!("IllegalArgumentException"));
}

#[tokio::test]
async fn test_twenty_shared_locks_replicate_to_second_node() {
    let (app, rpc) = test_router();
    register_node(&app, 9000, 9001, &["/x.txt"]).await;
    register_node(&app, 9002, 9003, &["/"]).await;

    for i in 0..19 {
        let (status, _) =
            post(&app, "/lock", json!({"path": "/x.txt", "exclusive": false})).await;
        assert_eq!(status, StatusCode::OK, "lock {i} failed");
        post(&app, "/unlock", json!({"path": "/x.txt", "exclusive": false})).await;
    }
    assert!(rpc.copy_calls().is_empty());

    // The twentieth shared grant crosses the threshold.
    post(&app, "/lock", json!({"path": "/x.txt", "exclusive": false})).await;
    post(&app, "/unlock", json!({"path": "/x.txt", "exclusive": false})).await;
    assert_eq!(
        rpc.copy_calls(),
        vec![RpcCall::Copy {
            node: NodeAddr::new("127.0.0.1", 9003),
            path: "/x.txt".to_string(),
            source: NodeAddr::new("127.0.0.1", 9000),
        }]
    );

    // The primary is unchanged; the replica is a read-side extra.
    let (_, body) = post(&app, "/get_storage", json!({"path": "/x.txt"})).await;
    assert_eq!(body["server_port"], json!(9000));

    // A write invalidates the replica on the second node.
    post(&app, "/lock", json!({"path": "/x.txt", "exclusive": true})).await;
    post(&app, "/unlock", json!({"path": "/x.txt", "exclusive": true})).await;
    assert_eq!(
        rpc.delete_calls(),
        vec![RpcCall::Delete {
            node: NodeAddr::new("127.0.0.1", 9003),
            path: "/x.txt".to_string(),
        }]
    );
    let (_, body) = post(&app, "/get_storage", json!({"path": "/x.txt"})).await;
    assert_eq!(body["server_port"], json!(9000));
}

#[tokio::test]
async fn test_conflicting_lock_waits_for_unlock() {
    let (app, _) = test_router();
    register_node(&app, 9000, 9001, &["/x.txt"]).await;

    post(&app, "/lock", json!({"path": "/x.txt", "exclusive": true})).await;

    let contender_app = app.clone();
    let contender = tokio::spawn(async move {
        post(
            &contender_app,
            "/lock",
            json!({"path": "/x.txt", "exclusive": true}),
        )
        .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!contender.is_finished());

    post(&app, "/unlock", json!({"path": "/x.txt", "exclusive": true})).await;
    let (status, _) = contender.await.unwrap();
    assert_eq!(status, StatusCode::OK);

    post(&app, "/unlock", json!({"path": "/x.txt", "exclusive": true})).await;
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (app, _) = test_router();

    let request = Request::builder()
        .method("POST")
        .uri("/is_directory")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
