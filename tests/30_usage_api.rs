mod common;

use axum::http::StatusCode;
use serde_json::json;

use client_portal_api::types::Role;

#[tokio::test]
async fn client_is_never_over_limit() {
    let token = common::token_for(Role::Client);
    let (status, body) = common::send(common::test_app(), common::get("/api/usage/over-limit", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isOverLimit"], false);
    assert_eq!(body["data"]["overLimitTypes"], json!([]));
}

#[tokio::test]
async fn usage_report_is_for_freelancers_only() {
    let token = common::token_for(Role::Client);
    let (status, body) = common::send(common::test_app(), common::get("/api/usage", Some(&token))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn client_cannot_create_portals() {
    let token = common::token_for(Role::Client);
    let request = common::post_json("/api/portals", Some(&token), json!({ "name": "Sneaky" }));
    let (status, _) = common::send(common::test_app(), request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn negative_upload_size_is_a_validation_error() {
    let token = common::token_for(Role::Freelancer);
    let request = common::post_json("/api/usage/check-upload", Some(&token), json!({ "fileSize": -1 }));
    let (status, body) = common::send(common::test_app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["fieldErrors"]["fileSize"].is_string());
}

#[tokio::test]
async fn usage_report_without_database_is_unavailable() {
    let token = common::token_for(Role::Freelancer);
    let (status, body) = common::send(common::test_app(), common::get("/api/usage", Some(&token))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
}
