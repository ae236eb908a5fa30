//! HTTP router integration tests.
//!
//! Requests are driven through the router with `tower::ServiceExt::oneshot`;
//! no socket is opened. The success case requires fixture files from
//! `tests/fixtures/generate_fixtures.sh`.

use std::path::Path;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use hardsub::{RenderOptions, ServerConfig, server::router};
use tower::ServiceExt;

const BOUNDARY: &str = "hardsub-test-boundary";
const SAMPLE_SRT: &[u8] = b"1\n00:00:00,500 --> 00:00:01,500\nHi there\n";

/// A multipart part: field name, optional filename, contents.
type Part<'a> = (&'a str, Option<&'a str>, &'a [u8]);

fn file<'a>(name: &'a str, file_name: &'a str, contents: &'a [u8]) -> Part<'a> {
    (name, Some(file_name), contents)
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, contents) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match file_name {
            Some(file_name) => {
                format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n")
            }
            None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n"),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(contents);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/add_subtitles")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

async fn send(config: ServerConfig, request: Request<Body>) -> Response {
    router(config).oneshot(request).await.unwrap()
}

async fn error_message(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).expect("Expected a JSON body");
    json["error"].as_str().expect("Expected an error field").to_string()
}

// ── Health and CORS ────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let response = send(ServerConfig::default(), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn cross_origin_requests_are_allowed() {
    let request = Request::get("/health")
        .header(header::ORIGIN, "https://example.com")
        .body(Body::empty())
        .unwrap();
    let response = send(ServerConfig::default(), request).await;

    assert!(
        response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
}

// ── Validation ─────────────────────────────────────────────────────

#[tokio::test]
async fn missing_srt_part_is_rejected() {
    let request = upload_request(&[file("video", "input.mp4", b"video bytes")]);
    let response = send(ServerConfig::default(), request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "No video or SRT file part");
}

#[tokio::test]
async fn missing_video_part_is_rejected() {
    let request = upload_request(&[file("srt", "input.srt", SAMPLE_SRT)]);
    let response = send(ServerConfig::default(), request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "No video or SRT file part");
}

#[tokio::test]
async fn plain_form_value_is_not_a_file_part() {
    let request = upload_request(&[
        ("video", None, &b"not a file"[..]),
        file("srt", "input.srt", SAMPLE_SRT),
    ]);
    let response = send(ServerConfig::default(), request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "No video or SRT file part");
}

#[tokio::test]
async fn empty_filename_is_rejected() {
    let request = upload_request(&[
        file("video", "", b""),
        file("srt", "input.srt", SAMPLE_SRT),
    ]);
    let response = send(ServerConfig::default(), request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "No selected file");
}

#[tokio::test]
async fn non_utf8_srt_is_rejected() {
    let request = upload_request(&[
        file("video", "input.mp4", b"video bytes"),
        file("srt", "input.srt", &[0xff, 0xfe, 0x00, 0x31]),
    ]);
    let response = send(ServerConfig::default(), request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "SRT file is not valid UTF-8");
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let config = ServerConfig::default().with_max_upload_bytes(64);
    let large = vec![b'x'; 4096];
    let request = upload_request(&[
        file("video", "input.mp4", &large),
        file("srt", "input.srt", SAMPLE_SRT),
    ]);
    let response = send(config, request).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

// ── Rendering ──────────────────────────────────────────────────────

#[tokio::test]
async fn undecodable_video_is_a_server_error() {
    let request = upload_request(&[
        file("video", "input.mp4", b"this is not a media file"),
        file("srt", "input.srt", SAMPLE_SRT),
    ]);
    let response = send(ServerConfig::default(), request).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!error_message(response).await.is_empty());
}

#[tokio::test]
async fn upload_returns_captioned_attachment() {
    let path = "tests/fixtures/sample_video.mp4";
    if !Path::new(path).exists() {
        return;
    }

    let video = std::fs::read(path).unwrap();
    let config = ServerConfig::default()
        .with_render_options(RenderOptions::new().with_preset("ultrafast"));
    let request = upload_request(&[
        file("video", "sample_video.mp4", &video),
        file("srt", "sample.srt", SAMPLE_SRT),
    ]);
    let response = send(config, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"subtitled_video.mp4\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(!bytes.is_empty());
}
