//! API documentation endpoints and JSON fallbacks.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::Value;

#[tokio::test]
async fn openapi_document_is_served_on_both_paths() {
    let app = spawn_app();

    for path in ["/api-docs", "/doc"] {
        let response = app.server.get(path).await;
        response.assert_status_ok();

        let doc: Value = response.json();
        assert!(doc["openapi"].as_str().unwrap().starts_with("3."));
        assert_eq!(doc["info"]["title"], "File Upload API");
        assert!(doc["paths"]["/api/upload"]["post"].is_object());
        assert!(doc["paths"]["/api/files"]["get"].is_object());
        assert!(doc["paths"]["/api/files/{filename}"]["delete"].is_object());
    }
}

#[tokio::test]
async fn documentation_ui_is_served() {
    let app = spawn_app();

    let response = app.server.get("/ui").await;
    response.assert_status_ok();
    assert!(response.text().contains("<html"));

    let root = app.server.get("/").await;
    root.assert_status(StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(root.header("location"), "/ui");
}

#[tokio::test]
async fn unknown_route_returns_json_404() {
    let app = spawn_app();

    let response = app.server.get("/api/nothing-here").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Not found");
}
