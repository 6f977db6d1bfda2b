use super::*;
use crate::downloader::test_helpers::MockFetcher;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use std::time::Duration;
use tower::ServiceExt;


/// Helper to create a test MediaDownloader instance wrapped in Arc
async fn create_test_downloader(
    fetcher: Arc<MockFetcher>,
) -> (Arc<MediaDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) = crate::downloader::test_helpers::test_downloader(fetcher).await;
    (Arc::new(downloader), temp_dir)
}

/// Build a router over a fresh downloader with default API settings
async fn create_test_router(
    fetcher: Arc<MockFetcher>,
) -> (Router, Arc<MediaDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) = create_test_downloader(fetcher).await;
    let config = downloader.get_config();
    let router = create_router(downloader.clone(), config);
    (router, downloader, temp_dir)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn api_server_spawns_on_an_os_assigned_port() {
    let (downloader, _temp_dir) = create_test_downloader(MockFetcher::new()).await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let downloader = downloader.clone();
        let config = config.clone();
        async move { start_api_server(downloader, config).await }
    });

    // Give it a moment to bind
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be serving");

    api_handle.abort();
}

#[tokio::test]
async fn spawn_api_server_method_runs_in_the_background() {
    let (downloader, _temp_dir) = create_test_downloader(MockFetcher::new()).await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let downloader = Arc::new(
        MediaDownloader::with_fetcher(config, MockFetcher::new())
            .await
            .unwrap(),
    );

    let api_handle = downloader.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;

    api_handle.abort();
}

#[tokio::test]
async fn cors_headers_are_present_when_enabled() {
    let (downloader, _temp_dir) = create_test_downloader(MockFetcher::new()).await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers().contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn cors_headers_are_absent_when_disabled() {
    let (downloader, _temp_dir) = create_test_downloader(MockFetcher::new()).await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn swagger_ui_routes_exist_only_when_enabled() {
    let (downloader, _temp_dir) = create_test_downloader(MockFetcher::new()).await;

    let mut enabled = (*downloader.get_config()).clone();
    enabled.server.api.swagger_ui = true;
    let app = create_router(downloader.clone(), Arc::new(enabled));
    let response = app.oneshot(get("/swagger-ui")).await.unwrap();
    assert_ne!(response.status(), StatusCode::NOT_FOUND);

    let mut disabled = (*downloader.get_config()).clone();
    disabled.server.api.swagger_ui = false;
    let app = create_router(downloader, Arc::new(disabled));
    let response = app.oneshot(get("/swagger-ui")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
