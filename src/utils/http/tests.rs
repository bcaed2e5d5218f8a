use super::*;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn limited_body_returns_full_response_under_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello".to_vec()))
        .mount(&server)
        .await;

    let resp = default_http_client().get(server.uri()).send().await.unwrap();
    let (bytes, truncated) = limited_body(resp, 1024).await.unwrap();
    assert_eq!(bytes, b"hello");
    assert!(!truncated);
}

#[tokio::test]
async fn limited_body_truncates_over_limit_without_content_length_mismatch() {
    let server = MockServer::start().await;
    let body = vec![b'x'; 100];
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&server)
        .await;

    let resp = default_http_client().get(server.uri()).send().await.unwrap();
    let (bytes, truncated) = limited_body(resp, 10).await.unwrap();
    assert_eq!(bytes.len(), 10);
    assert!(truncated);
}

#[tokio::test]
async fn limited_text_appends_truncation_marker() {
    let server = MockServer::start().await;
    let body = vec![b'x'; 100];
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&server)
        .await;

    let resp = default_http_client().get(server.uri()).send().await.unwrap();
    let text = limited_text(resp, 10).await.unwrap();
    assert!(text.ends_with("[truncated]"));
}
