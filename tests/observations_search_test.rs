use httpmock::prelude::*;
use redbiom::{run_search, RedbiomConfig, RedbiomError, SearchRequest};
use serde_json::json;

fn config_for(server: &MockServer) -> RedbiomConfig {
    RedbiomConfig {
        hostname: server.base_url(),
        ..RedbiomConfig::default()
    }
}

fn observations(exact: bool, ids: &[&str]) -> SearchRequest {
    SearchRequest::Observations {
        context: "ctx1".to_string(),
        exact,
        observations: ids.iter().map(|i| i.to_string()).collect(),
    }
}

async fn mock_valid_context(server: &MockServer) -> httpmock::Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/HEXISTS/state:contexts/ctx1");
            then.status(200).json_body(json!({"HEXISTS": 1}));
        })
        .await
}

async fn mock_members<'a>(server: &'a MockServer, key: &str, members: &[&str]) -> httpmock::Mock<'a> {
    let path = format!("/SMEMBERS/{}", key);
    let body = json!({ "SMEMBERS": members });
    server
        .mock_async(|when, then| {
            when.method(GET).path(path);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(body);
        })
        .await
}

#[tokio::test]
async fn test_any_observation_returns_union() {
    let server = MockServer::start_async().await;
    let context = mock_valid_context(&server).await;
    let a = mock_members(&server, "ctx1:samples:A", &["s3", "s1", "s2"]).await;
    let b = mock_members(&server, "ctx1:samples:B", &["s2", "s4"]).await;

    let mut out = Vec::new();
    let written = run_search(&config_for(&server), &observations(false, &["A", "B"]), &mut out)
        .await
        .unwrap();

    assert_eq!(written, 4);
    assert_eq!(String::from_utf8(out).unwrap(), "s1\ns2\ns3\ns4\n");
    context.assert_async().await;
    a.assert_async().await;
    b.assert_async().await;
}

#[tokio::test]
async fn test_exact_returns_intersection() {
    let server = MockServer::start_async().await;
    mock_valid_context(&server).await;
    mock_members(&server, "ctx1:samples:A", &["s1", "s2", "s3"]).await;
    mock_members(&server, "ctx1:samples:B", &["s2", "s3", "s4"]).await;

    let mut out = Vec::new();
    run_search(&config_for(&server), &observations(true, &["A", "B"]), &mut out)
        .await
        .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "s2\ns3\n");
}

#[tokio::test]
async fn test_exact_stops_once_intersection_is_empty() {
    let server = MockServer::start_async().await;
    mock_valid_context(&server).await;
    mock_members(&server, "ctx1:samples:A", &["s1"]).await;
    mock_members(&server, "ctx1:samples:B", &["s2"]).await;
    let c = mock_members(&server, "ctx1:samples:C", &["s1", "s2"]).await;

    let mut out = Vec::new();
    let written = run_search(&config_for(&server), &observations(true, &["A", "B", "C"]), &mut out)
        .await
        .unwrap();

    assert_eq!(written, 0);
    assert!(out.is_empty());
    assert_eq!(c.hits_async().await, 0);
}

#[tokio::test]
async fn test_unknown_context_never_searches() {
    let server = MockServer::start_async().await;
    let context = server
        .mock_async(|when, then| {
            when.method(GET).path("/HEXISTS/state:contexts/missing");
            then.status(200).json_body(json!({"HEXISTS": 0}));
        })
        .await;
    let search = mock_members(&server, "missing:samples:A", &["s1"]).await;

    let request = SearchRequest::Observations {
        context: "missing".to_string(),
        exact: false,
        observations: vec!["A".to_string()],
    };
    let mut out = Vec::new();
    let err = run_search(&config_for(&server), &request, &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, RedbiomError::UnknownContext { ref context } if context == "missing"));
    context.assert_async().await;
    assert_eq!(search.hits_async().await, 0);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_store_failure_is_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/HEXISTS/state:contexts/ctx1");
            then.status(500);
        })
        .await;

    let err = run_search(&config_for(&server), &observations(false, &["A"]), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RedbiomError::Store { .. }));
}

#[tokio::test]
async fn test_malformed_reply_is_reported() {
    let server = MockServer::start_async().await;
    mock_valid_context(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/SMEMBERS/ctx1:samples:A");
            then.status(200).json_body(json!({"GET": "oops"}));
        })
        .await;

    let err = run_search(&config_for(&server), &observations(false, &["A"]), &mut Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RedbiomError::Store { .. }));
}
