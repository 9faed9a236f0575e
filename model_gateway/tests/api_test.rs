mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{
    body_bytes, body_json, get, jpeg_base64, jpeg_bytes, json_request, FakeGateway, TestHarness,
    PUBLIC_BASE,
};
use data_connector::{ChatTurn, HistoryStore};
use serde_json::json;

const CHAT: &str = "/api/v1/chat";

fn local_path(url: &str) -> &str {
    url.strip_prefix(PUBLIC_BASE).unwrap()
}

#[tokio::test]
async fn test_text_chat_returns_envelope() {
    let harness = TestHarness::new(FakeGateway::new());

    let response = harness
        .send(json_request(
            "POST",
            &format!("{CHAT}/text"),
            json!({"question": "hello"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = body_json(response).await;
    assert_eq!(body["response"], "answer to: hello");
    assert_eq!(body["message_type"], "text");
    assert_eq!(body["model_used"], "fake-text");
    assert_eq!(body["tokens_used"], 10);
    assert!(!body["session_id"].as_str().unwrap().is_empty());
    assert_eq!(
        body["metadata"]["step_trace"],
        json!(["input_processing", "routing", "text_generation", "response_synthesis"])
    );
}

#[tokio::test]
async fn test_multimodal_chat_with_inline_image() {
    let harness = TestHarness::new(FakeGateway::new());

    let response = harness
        .send(json_request(
            "POST",
            &format!("{CHAT}/multimodal"),
            json!({
                "question": "What is in this picture?",
                "image_data": jpeg_base64(20, 10),
                "message_type": "multimodal",
                "session_id": "web-1"
            }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["session_id"], "web-1");
    assert_eq!(body["message_type"], "multimodal");
    assert_eq!(body["metadata"]["intent"], "analyze_image");
    assert_eq!(body["metadata"]["image_analysis"], "a 20x10 picture");
}

#[tokio::test]
async fn test_multimodal_without_image_is_rejected_before_workflow() {
    let harness = TestHarness::new(FakeGateway::new());

    let response = harness
        .send(json_request(
            "POST",
            &format!("{CHAT}/multimodal"),
            json!({"question": "what is this?", "message_type": "multimodal"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
    assert!(harness.gateway.text_prompts().is_empty());
}

#[tokio::test]
async fn test_bad_image_url_scheme_is_rejected() {
    let harness = TestHarness::new(FakeGateway::new());

    let response = harness
        .send(json_request(
            "POST",
            &format!("{CHAT}/multimodal"),
            json!({"question": "what is this?", "image_url": "ftp://example.com/cat.png"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_workflow_error_maps_to_500_with_apology() {
    let harness = TestHarness::new(FakeGateway::failing_text("provider down"));

    let response = harness
        .send(json_request(
            "POST",
            &format!("{CHAT}/text"),
            json!({"question": "hello", "session_id": "s-err"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers()["x-mmchat-error-code"],
        "workflow_error"
    );
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "workflow_error");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("provider down"));
    assert!(body["response"]
        .as_str()
        .unwrap()
        .starts_with("I apologize"));
    assert_eq!(body["session_id"], "s-err");
}

#[tokio::test]
async fn test_analyze_image_endpoint() {
    let harness = TestHarness::new(FakeGateway::new());

    let response = harness
        .send(json_request(
            "POST",
            &format!("{CHAT}/analyze-image"),
            json!({"image_data": jpeg_base64(8, 8)}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["analysis"], "a 8x8 picture");
    assert_eq!(body["metadata"]["model_used"], "fake-vision");
    assert_eq!(harness.gateway.analysis_prompts(), ["Analyze this image"]);

    let missing = harness
        .send(json_request(
            "POST",
            &format!("{CHAT}/analyze-image"),
            json!({"prompt": "describe"}),
        ))
        .await;
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let not_found = harness
        .send(json_request(
            "POST",
            &format!("{CHAT}/analyze-image"),
            json!({"image_url": "blob://uploads/nope.jpg"}),
        ))
        .await;
    assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generate_image_endpoint_expands_prompt() {
    let harness = TestHarness::new(FakeGateway::new());

    let response = harness
        .send(json_request(
            "POST",
            &format!("{CHAT}/generate-image"),
            json!({"prompt": "a castle", "generation_type": "style_transfer", "style": "", "num_images": 2}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["prompt_used"], "a castle");
    assert_eq!(body["model_used"], "fake-image");
    assert_eq!(body["images"].as_array().unwrap().len(), 2);

    let invalid = harness
        .send(json_request(
            "POST",
            &format!("{CHAT}/generate-image"),
            json!({"prompt": "a castle", "width": 64}),
        ))
        .await;
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_presigned_upload_round_trip() {
    let harness = TestHarness::new(FakeGateway::new());

    let response = harness
        .send(json_request(
            "POST",
            &format!("{CHAT}/upload-image"),
            json!({"filename": "cat.jpg", "content_type": "image/jpeg"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let upload_url = body["upload_url"].as_str().unwrap().to_string();
    let image_url = body["image_url"].as_str().unwrap().to_string();
    assert!(image_url.starts_with(&format!("{PUBLIC_BASE}/blobs/uploads/")));
    assert!(image_url.ends_with(".jpg"));

    let image = jpeg_bytes(10, 10);
    let put = |content_type: &'static str, uri: String| {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header("content-type", content_type)
            .body(Body::from(image.clone()))
            .unwrap()
    };

    // The signed content type must match.
    let wrong_type = harness
        .send(put("image/png", local_path(&upload_url).to_string()))
        .await;
    assert_eq!(wrong_type.status(), StatusCode::FORBIDDEN);

    let tampered = format!("{}x", local_path(&upload_url));
    let tampered = harness.send(put("image/jpeg", tampered)).await;
    assert_eq!(tampered.status(), StatusCode::FORBIDDEN);

    let accepted = harness
        .send(put("image/jpeg", local_path(&upload_url).to_string()))
        .await;
    assert_eq!(accepted.status(), StatusCode::OK);

    let fetched = harness.send(get(local_path(&image_url))).await;
    assert_eq!(fetched.status(), StatusCode::OK);
    assert_eq!(fetched.headers()["content-type"], "image/jpeg");
    assert_eq!(body_bytes(fetched).await, image);

    // The uploaded image can now be referenced in chat.
    let chat = harness
        .send(json_request(
            "POST",
            &format!("{CHAT}/multimodal"),
            json!({"question": "what is this?", "image_url": image_url}),
        ))
        .await;
    assert_eq!(chat.status(), StatusCode::OK);
    assert_eq!(body_json(chat).await["metadata"]["image_analysis"], "a 10x10 picture");
}

#[tokio::test]
async fn test_upload_rejects_unsupported_type_and_unsigned_put() {
    let harness = TestHarness::new(FakeGateway::new());

    let response = harness
        .send(json_request(
            "POST",
            &format!("{CHAT}/upload-image"),
            json!({"filename": "notes.txt", "content_type": "text/plain"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let unsigned = harness
        .send(
            Request::builder()
                .method("PUT")
                .uri("/blobs/uploads/x.jpg")
                .header("content-type", "image/jpeg")
                .body(Body::from(jpeg_bytes(4, 4)))
                .unwrap(),
        )
        .await;
    assert_eq!(unsigned.status(), StatusCode::FORBIDDEN);
    assert_eq!(harness.storage.len(), 0);
}

fn multipart_request(parts: &[(&str, Option<(&str, &str)>, Vec<u8>)]) -> Request<Body> {
    const BOUNDARY: &str = "mmchat-test-boundary";
    let mut body = Vec::new();
    for (name, file, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file {
            Some((filename, content_type)) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                     Content-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(format!("{CHAT}/upload-image-direct"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_direct_upload() {
    let harness = TestHarness::new(FakeGateway::new());
    let image = jpeg_bytes(6, 6);

    let response = harness
        .send(multipart_request(&[
            ("file", Some(("photo.jpg", "image/jpeg")), image.clone()),
            ("session_id", None, b"sess-7".to_vec()),
        ]))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Image uploaded successfully");
    assert_eq!(body["session_id"], "sess-7");
    let image_url = body["image_url"].as_str().unwrap();
    assert!(image_url.ends_with(".jpg"));

    let fetched = harness.send(get(local_path(image_url))).await;
    assert_eq!(body_bytes(fetched).await, image);

    let wrong_type = harness
        .send(multipart_request(&[(
            "file",
            Some(("notes.txt", "text/plain")),
            b"hello".to_vec(),
        )]))
        .await;
    assert_eq!(wrong_type.status(), StatusCode::BAD_REQUEST);

    let no_file = harness
        .send(multipart_request(&[("session_id", None, b"s".to_vec())]))
        .await;
    assert_eq!(no_file.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_history_and_clear() {
    let harness = TestHarness::new(FakeGateway::new());
    harness
        .history
        .append("s-hist", ChatTurn::user("hi"))
        .await
        .unwrap();
    harness
        .history
        .append("s-hist", ChatTurn::assistant("hello!"))
        .await
        .unwrap();

    let response = harness
        .send(get(&format!("{CHAT}/session/s-hist/history")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["session_id"], "s-hist");
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "hello!");

    let cleared = harness
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("{CHAT}/session/s-hist"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(cleared.status(), StatusCode::OK);
    let body = body_json(cleared).await;
    assert_eq!(body["message"], "Session s-hist cleared successfully");
    assert_eq!(body["cleared"], true);

    let empty = body_json(
        harness
            .send(get(&format!("{CHAT}/session/s-hist/history")))
            .await,
    )
    .await;
    assert_eq!(empty["messages"], json!([]));
}

#[tokio::test]
async fn test_models_listing() {
    let harness = TestHarness::new(FakeGateway::new());

    let body = body_json(harness.send(get(&format!("{CHAT}/models"))).await).await;
    let names: Vec<&str> = body["models"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["text", "vision", "image"]);
    assert_eq!(body["default_text_model"], "text");
    assert_eq!(body["models"][2]["capabilities"]["image_generation"], true);
}

#[tokio::test]
async fn test_health_endpoints() {
    let harness = TestHarness::new(FakeGateway::new());

    let live = body_json(harness.send(get("/health")).await).await;
    assert_eq!(live["status"], "healthy");

    let root = body_json(harness.send(get("/")).await).await;
    assert_eq!(root["message"], "Multimodal Chatbot API");

    let report = body_json(harness.send(get(&format!("{CHAT}/health"))).await).await;
    assert_eq!(report["status"], "healthy");
    assert_eq!(report["services"]["fake"], "healthy");
    assert_eq!(report["services"]["storage"], "healthy");

    let degraded = TestHarness::new(FakeGateway {
        unhealthy: true,
        ..FakeGateway::default()
    });
    let response = degraded.send(get(&format!("{CHAT}/health"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["status"], "degraded");
    assert_eq!(report["services"]["fake"], "unhealthy");
}
