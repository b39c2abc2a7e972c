use image::Rgb;
use serde_json::json;
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rust_infer::overlay::{compose_overlay, PALETTE};
use rust_infer::render::save_segmentation_map;
use rust_infer::types::segmentation::Mask;
use rust_infer::Error;

mod support;
use support::{build_client, gray_png, write_uniform_png};

const MODEL_PATH: &str = "/models/nvidia/segformer-b0-finetuned-ade-512-512";

#[tokio::test]
async fn query_posts_raw_bytes_with_required_headers() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("road.jpg");
    std::fs::write(&image_path, b"raw-image").unwrap();

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .and(header("authorization", "Bearer hf-test"))
        .and(header("x-wait-for-model", "true"))
        .and(header("content-type", "application/octet-stream"))
        .and(body_bytes(b"raw-image".to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"label": "road", "score": 1.0, "mask": "AAAA"},
            {"label": "road", "mask": {"width": 1, "height": 1, "pixels": [0]}},
            {"label": "sky", "mask": null}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server.uri());
    let entries = client.segmentation().query(&image_path).await.unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].label, "road");
    assert_eq!(entries[0].mask, Mask::Base64("AAAA".into()));
    assert_eq!(entries[1].label, "road");
    assert_eq!(entries[2].mask.kind(), "null");
}

#[tokio::test]
async fn query_failure_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("server error"))
        .mount(&server)
        .await;

    let client = build_client(&server.uri());
    let err = client
        .segmentation()
        .query_bytes(vec![1, 2, 3])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ApiError { status: 500, .. }));
    let text = err.to_string();
    assert!(text.contains("500"));
    assert!(text.contains("server error"));
}

#[tokio::test]
async fn non_200_success_status_is_still_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(202).set_body_string("loading"))
        .mount(&server)
        .await;

    let client = build_client(&server.uri());
    let err = client.segmentation().query_bytes(vec![]).await.unwrap_err();
    assert!(matches!(err, Error::ApiError { status: 202, .. }));
}

#[tokio::test]
async fn query_then_compose_and_save() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let image_path = write_uniform_png(dir.path(), "original.png", 2, 2, 100);
    let grass = gray_png(2, 2, vec![255, 255, 0, 0]);

    Mock::given(method("POST"))
        .and(path(MODEL_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"label": "grass", "mask": Mask::from_image_bytes(&grass)},
            {"label": "broken", "mask": 12}
        ])))
        .mount(&server)
        .await;

    let client = build_client(&server.uri());
    let entries = client.segmentation().query(&image_path).await.unwrap();
    let original = image::open(&image_path).unwrap();
    let map = compose_overlay(&original, &entries);

    assert_eq!(map.skipped, 1);
    assert_eq!(map.legend.len(), 1);
    assert_eq!(map.blended.get_pixel(0, 0), &Rgb([165, 63, 88]));
    assert_eq!(map.blended.get_pixel(1, 1), &Rgb([50, 50, 50]));

    let output = dir.path().join("segmentation_map.png");
    save_segmentation_map(&map, &output).unwrap();
    let written = image::open(&output).unwrap().to_rgb8();
    assert_eq!(written.get_pixel(0, 0), &Rgb([165, 63, 88]));
    assert!(written.width() > 2);
    assert!(written.pixels().any(|p| *p == PALETTE[0]));
}

#[tokio::test]
async fn query_missing_image_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = build_client(&server.uri());
    let err = client
        .segmentation()
        .query(dir.path().join("missing.jpg"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}
