//! End-to-end tests for the relay route
//!
//! The router is driven with `tower::ServiceExt::oneshot`; upstream origins
//! are `wiremock` servers.
//!
//! Run with: cargo test -p vidrelay-api --test relay_http

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use vidrelay_api::{create_router, AppState};
use vidrelay_core::{config::RelayConfig, TracingObserver};
use wiremock::matchers::{header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app() -> Router {
    let state = AppState::new(&RelayConfig::default(), Arc::new(TracingObserver)).unwrap();
    create_router(state, "/proxy")
}

fn encode(target: &str) -> String {
    url::form_urlencoded::byte_serialize(target.as_bytes()).collect()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_missing_url_is_bad_request() {
    for uri in ["/proxy", "/proxy?url=", "/proxy?other=1"] {
        let response = app().oneshot(get(uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body_text(response).await, "Missing 'url' query param");
    }
}

#[tokio::test]
async fn test_invalid_url_is_bad_request() {
    let response = app().oneshot(get("/proxy?url=not-a-url")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(body_text(response).await, "Invalid URL");
}

#[tokio::test]
async fn test_non_http_scheme_is_bad_request() {
    for target in ["ftp://example.com/a.ts", "file:///etc/passwd", "data:text/plain,hi"] {
        let uri = format!("/proxy?url={}", encode(target));
        let response = app().oneshot(get(&uri)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{target}");
        assert_eq!(body_text(response).await, "Only HTTP/HTTPS allowed");
    }
}

#[tokio::test]
async fn test_preflight_skips_upstream() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/proxy")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .contains("range"));
    assert!(body_text(response).await.is_empty());
}

#[tokio::test]
async fn test_transport_stream_defaults() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"TSDATA".to_vec()))
        .expect(1)
        .mount(&upstream)
        .await;

    let target = format!("{}/a.ts", upstream.uri());
    let response = app()
        .oneshot(get(&format!("/proxy?url={}", encode(&target))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "video/mp2t");
    assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(body_text(response).await, "TSDATA");
}

#[tokio::test]
async fn test_content_type_inference_by_extension() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&upstream)
        .await;

    let cases = [
        ("/live/index.m3u8", "application/vnd.apple.mpegurl"),
        ("/live/seg-001.ts", "video/mp2t"),
        ("/live/video.bin", "application/octet-stream"),
    ];
    for (target_path, expected) in cases {
        let target = format!("{}{target_path}", upstream.uri());
        let response = app()
            .oneshot(get(&format!("/proxy?url={}", encode(&target))))
            .await
            .unwrap();

        assert_eq!(response.headers()[header::CONTENT_TYPE], expected, "{target_path}");
    }
}

#[tokio::test]
async fn test_upstream_content_type_is_kept() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/aac")
                .insert_header("x-upstream", "yes"),
        )
        .mount(&upstream)
        .await;

    let target = format!("{}/a.ts", upstream.uri());
    let response = app()
        .oneshot(get(&format!("/proxy?url={}", encode(&target))))
        .await
        .unwrap();

    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/aac");
    assert_eq!(response.headers()["x-upstream"], "yes");
}

#[tokio::test]
async fn test_range_request_is_forwarded_and_partial_content_preserved() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie.ts"))
        .and(header_eq("range", "bytes=0-3"))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("content-range", "bytes 0-3/1000")
                .set_body_bytes(b"GGGG".to_vec()),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let target = format!("{}/movie.ts", upstream.uri());
    let request = Request::builder()
        .uri(format!("/proxy?url={}", encode(&target)))
        .header(header::RANGE, "bytes=0-3")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-3/1000");
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(body_text(response).await, "GGGG");
}

#[tokio::test]
async fn test_upstream_error_status_passes_through() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
        .mount(&upstream)
        .await;

    let target = format!("{}/missing.ts", upstream.uri());
    let response = app()
        .oneshot(get(&format!("/proxy?url={}", encode(&target))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(body_text(response).await, "gone");
}

#[tokio::test]
async fn test_redirects_are_followed() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old.ts"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", format!("{}/new.ts", upstream.uri())),
        )
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/new.ts"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .mount(&upstream)
        .await;

    let target = format!("{}/old.ts", upstream.uri());
    let response = app()
        .oneshot(get(&format!("/proxy?url={}", encode(&target))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "moved");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway_with_cors() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let target = format!("http://127.0.0.1:{port}/a.ts");
    let response = app()
        .oneshot(get(&format!("/proxy?url={}", encode(&target))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(body_text(response).await.starts_with("Proxy error: "));
}

#[tokio::test]
async fn test_health() {
    let response = app().oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "OK");
}
