mod common;

use anyhow::Result;
use axum::http::StatusCode;

#[tokio::test]
async fn root_describes_the_service() {
    let (status, body) = common::send(common::test_app(), common::get("/", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Client Portal API");
}

#[tokio::test]
async fn health_reports_unreachable_database() {
    let (status, body) = common::send(common::test_app(), common::get("/health", None)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (status, _) = common::send(common::test_app(), common::get("/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn spawned_server_answers_health() -> Result<()> {
    let server = common::start_server().await?;
    let client = reqwest::Client::new();

    let res = client.get(format!("{}/health", server.base_url)).send().await?;

    // Database is deliberately unreachable
    assert_eq!(res.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);
    Ok(())
}

#[tokio::test]
async fn spawned_server_stops_with_its_handle() -> Result<()> {
    let mut server = common::start_server().await?;
    let base_url = server.base_url.clone();
    assert!(server.is_running());

    drop(server);

    let client = reqwest::Client::builder().timeout(std::time::Duration::from_secs(2)).build()?;
    assert!(client.get(&base_url).send().await.is_err());
    Ok(())
}
