/// Authentication and route guard tests
///
/// Missing or invalid tokens answer 401 before any guard runs; a guard that
/// evaluates false answers 403.

mod common;

use axum::http::{Method, StatusCode};
use common::TestContext;
use serde_json::json;

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.send(Method::GET, "/projects", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = ctx.send(Method::GET, "/roles", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let ctx = TestContext::new().await;

    let (status, _) = ctx
        .send(Method::GET, "/projects", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_read_guard() {
    let ctx = TestContext::new().await;

    for token in [&ctx.reader.token, &ctx.insider.token, &ctx.admin.token] {
        let (status, _) = ctx.send(Method::GET, "/projects", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = ctx
        .send(Method::GET, "/projects", Some(&ctx.nobody.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_manage_guard() {
    let ctx = TestContext::new().await;
    let payload = json!({ "title": "Launch", "description": "Go live" });

    for token in [&ctx.reader.token, &ctx.insider.token, &ctx.nobody.token] {
        let (status, _) = ctx
            .send(Method::POST, "/projects", Some(token), Some(payload.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, _) = ctx
        .send(Method::GET, "/permissions", Some(&ctx.reader.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send(Method::POST, "/projects", Some(&ctx.admin.token), Some(payload))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_public_routes_need_no_token() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let ctx = TestContext::new().await;

    let (status, _) = ctx.send(Method::GET, "/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
