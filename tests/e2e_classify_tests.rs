//! End-to-end tests for the classification helpers and server basics

mod common;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::{TestClient, TestServer, CRYING_IMAGE, FAILING_IMAGE, FUNNY_IMAGE, SMILE_IMAGE};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_home_reports_running() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.home().await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert!(body["uptime"].is_string());
}

#[tokio::test]
async fn test_unknown_route_returns_error_envelope() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .get_url(&format!("{}/nothing/here", server.base_url))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"status": "error", "message": "Not found"}));
}

#[tokio::test]
async fn test_classify_multipart_image() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.classify_multipart(CRYING_IMAGE).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"status": "success", "category": "crying"}));
}

#[tokio::test]
async fn test_classify_base64_image_and_data_url() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.classify_base64(&BASE64.encode(SMILE_IMAGE)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["category"], "smile");

    let data_url = format!("data:image/jpeg;base64,{}", BASE64.encode(FUNNY_IMAGE));
    let body: Value = client.classify_base64(&data_url).await.json().await.unwrap();
    assert_eq!(body["category"], "funny");
}

#[tokio::test]
async fn test_classify_does_not_touch_albums() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    client.classify_multipart(SMILE_IMAGE).await;

    assert!(server.album_store.list_albums().unwrap().is_empty());
    let stored = std::fs::read_dir(&server.media_dir).unwrap().count();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_classify_without_image_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .client
        .post(format!("{}/classify", server.base_url))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "No image provided");
    assert_eq!(server.gemini.calls(), 0);
}

#[tokio::test]
async fn test_classify_invalid_base64_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.classify_base64("not base64 at all!").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_classify_model_failure_is_server_error() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.classify_multipart(FAILING_IMAGE).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_analyze_forwards_text_to_model() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.analyze(Some("How does this feel?")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({"status": "success", "response": "echo: How does this feel?"})
    );
}

#[tokio::test]
async fn test_analyze_without_text_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    for text in [None, Some("   ")] {
        let response = client.analyze(text).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], "No text provided");
    }
    assert_eq!(server.gemini.calls(), 0);
}
