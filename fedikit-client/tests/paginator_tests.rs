// Pagination cursor behavior against a mock server: continuation links,
// exhaustion and in-place reset.

use std::sync::Arc;

use futures::StreamExt;
use mockito::Matcher;
use serde_json::json;

use fedikit_transport::{ClientConfig, ReqwestTransport};

use fedikit_client::Client;

fn client(server: &mockito::ServerGuard) -> Client {
    let config = ClientConfig::new(&server.url()).unwrap();
    let transport = ReqwestTransport::new(config.clone()).unwrap();
    Client::from_transport(Arc::new(transport), config)
}

#[tokio::test]
async fn list_fetches_pages_through_continuation_links() {
    let mut server = mockito::Server::new_async().await;
    let url = server.url();

    let first = server
        .mock("GET", "/api/v1/lists/9/accounts")
        .match_query(Matcher::UrlEncoded("limit".into(), "40".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header(
            "link",
            &format!("<{url}/api/v1/lists/9/accounts?max_id=3>; rel=\"next\""),
        )
        .with_body(r#"[{"id":"1"},{"id":"2"}]"#)
        .create_async()
        .await;

    let second = server
        .mock("GET", "/api/v1/lists/9/accounts")
        .match_query(Matcher::UrlEncoded("max_id".into(), "3".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id":"3"}]"#)
        .create_async()
        .await;

    let mut paginator = client(&server)
        .rest()
        .path("api")
        .path("v1")
        .path("lists")
        .select(["9"])
        .path("accounts")
        .list(Some(json!({ "limit": "40" })))
        .unwrap();

    let page = paginator.next_page().await.unwrap().unwrap();
    assert_eq!(page, json!([{ "id": "1" }, { "id": "2" }]));

    let page = paginator.next_page().await.unwrap().unwrap();
    assert_eq!(page, json!([{ "id": "3" }]));

    // No continuation link on the second page: exhausted for good.
    assert!(paginator.next_page().await.unwrap().is_none());
    assert!(paginator.next_page().await.unwrap().is_none());

    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn no_link_header_means_single_page() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/timelines/home")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    let mut paginator = client(&server)
        .rest()
        .path("api")
        .path("v1")
        .path("timelines")
        .path("home")
        .list(None)
        .unwrap();

    assert!(paginator.next_page().await.unwrap().is_some());
    assert!(paginator.next_page().await.unwrap().is_none());
}

#[tokio::test]
async fn reset_rearms_at_the_original_page() {
    let mut server = mockito::Server::new_async().await;
    let url = server.url();

    let first = server
        .mock("GET", "/api/v1/notifications")
        .match_query(Matcher::UrlEncoded("limit".into(), "10".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header(
            "link",
            &format!("<{url}/api/v1/notifications?max_id=5>; rel=\"next\""),
        )
        .with_body(r#"[{"id":"10"}]"#)
        .expect(2)
        .create_async()
        .await;

    server
        .mock("GET", "/api/v1/notifications")
        .match_query(Matcher::UrlEncoded("max_id".into(), "5".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id":"5"}]"#)
        .create_async()
        .await;

    let mut paginator = client(&server)
        .rest()
        .path("api")
        .path("v1")
        .path("notifications")
        .list(Some(json!({ "limit": "10" })))
        .unwrap();

    let page1 = paginator.next_page().await.unwrap().unwrap();
    let page2 = paginator.next_page().await.unwrap().unwrap();
    assert_eq!(page1, json!([{ "id": "10" }]));
    assert_eq!(page2, json!([{ "id": "5" }]));

    // A long-lived cursor can jump back without being rebuilt.
    paginator.reset();
    let again = paginator.next_page().await.unwrap().unwrap();
    assert_eq!(again, page1);

    first.assert_async().await;
}

#[tokio::test]
async fn take_collects_up_to_n_pages() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/bookmarks")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id":"1"}]"#)
        .create_async()
        .await;

    let mut paginator = client(&server)
        .rest()
        .path("api")
        .path("v1")
        .path("bookmarks")
        .list(None)
        .unwrap();

    let pages = paginator.take(5).await.unwrap();
    assert_eq!(pages.len(), 1);
}

#[tokio::test]
async fn stream_adapter_iterates_sequentially() {
    let mut server = mockito::Server::new_async().await;
    let url = server.url();

    server
        .mock("GET", "/api/v1/favourites")
        .match_query(Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_header(
            "link",
            &format!("<{url}/api/v1/favourites?max_id=2>; rel=\"next\""),
        )
        .with_body(r#"[{"id":"4"}]"#)
        .create_async()
        .await;

    server
        .mock("GET", "/api/v1/favourites")
        .match_query(Matcher::UrlEncoded("max_id".into(), "2".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id":"2"}]"#)
        .create_async()
        .await;

    let paginator = client(&server)
        .rest()
        .path("api")
        .path("v1")
        .path("favourites")
        .list(None)
        .unwrap();

    let pages: Vec<_> = paginator.into_stream().collect().await;
    assert_eq!(pages.len(), 2);
    assert!(pages.iter().all(|page| page.is_ok()));
}
