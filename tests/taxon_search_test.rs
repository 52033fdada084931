use httpmock::prelude::*;
use redbiom::{run_search, RedbiomConfig, RedbiomError, SearchRequest};
use serde_json::json;

fn config_for(server: &MockServer) -> RedbiomConfig {
    RedbiomConfig {
        hostname: server.base_url(),
        ..RedbiomConfig::default()
    }
}

fn taxon(query: &str) -> SearchRequest {
    SearchRequest::Taxon {
        context: "ctx1".to_string(),
        query: query.to_string(),
    }
}

async fn mock_children<'a>(
    server: &'a MockServer,
    node: &str,
    children: &[&str],
) -> httpmock::Mock<'a> {
    let path = format!("/SMEMBERS/ctx1:taxonomy-children:{}", node);
    let body = json!({ "SMEMBERS": children });
    server
        .mock_async(|when, then| {
            when.method(GET).path(path);
            then.status(200).json_body(body);
        })
        .await
}

#[tokio::test]
async fn test_walks_down_to_features_in_order() {
    let server = MockServer::start_async().await;
    mock_children(&server, "g__Foo", &["s__b", "s__a"]).await;
    mock_children(&server, "s__a", &["feat2", "feat1"]).await;
    mock_children(&server, "s__b", &[]).await;
    mock_children(&server, "feat1", &[]).await;
    mock_children(&server, "feat2", &[]).await;

    let mut out = Vec::new();
    let written = run_search(&config_for(&server), &taxon("g__Foo"), &mut out)
        .await
        .unwrap();

    assert_eq!(written, 3);
    assert_eq!(String::from_utf8(out).unwrap(), "feat1\nfeat2\ns__b\n");
}

#[tokio::test]
async fn test_unknown_taxon_prints_nothing() {
    let server = MockServer::start_async().await;
    let root = mock_children(&server, "g__Foo", &[]).await;

    let mut out = Vec::new();
    let written = run_search(&config_for(&server), &taxon("g__Foo"), &mut out)
        .await
        .unwrap();

    assert_eq!(written, 0);
    assert!(out.is_empty());
    root.assert_async().await;
}

#[tokio::test]
async fn test_shared_nodes_visited_once() {
    let server = MockServer::start_async().await;
    mock_children(&server, "f__Bar", &["g__x", "g__y"]).await;
    mock_children(&server, "g__x", &["feat1"]).await;
    mock_children(&server, "g__y", &["feat1", "f__Bar"]).await;
    let leaf = mock_children(&server, "feat1", &[]).await;

    let mut out = Vec::new();
    run_search(&config_for(&server), &taxon("f__Bar"), &mut out)
        .await
        .unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "feat1\n");
    assert_eq!(leaf.hits_async().await, 1);
}

#[tokio::test]
async fn test_walk_stops_at_failing_lookup() {
    let server = MockServer::start_async().await;
    mock_children(&server, "g__Foo", &["s__a", "s__b", "s__c"]).await;
    mock_children(&server, "s__a", &["f1", "f2"]).await;
    let f1 = mock_children(&server, "f1", &[]).await;
    let f2 = mock_children(&server, "f2", &[]).await;
    let failing = server
        .mock_async(|when, then| {
            when.method(GET).path("/SMEMBERS/ctx1:taxonomy-children:s__b");
            then.status(500);
        })
        .await;
    let after = mock_children(&server, "s__c", &["f3"]).await;

    let mut out = Vec::new();
    let err = run_search(&config_for(&server), &taxon("g__Foo"), &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, RedbiomError::Store { .. }));
    assert_eq!(String::from_utf8(out).unwrap(), "f1\nf2\n");
    assert_eq!(f1.hits_async().await, 1);
    assert_eq!(f2.hits_async().await, 1);
    assert_eq!(failing.hits_async().await, 1);
    assert_eq!(after.hits_async().await, 0);
}
