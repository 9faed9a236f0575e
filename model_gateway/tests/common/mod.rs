//! Shared fixtures: a scriptable model gateway and in-memory collaborators.

#![allow(dead_code)]

use std::{
    io::Cursor,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response, Router};
use blob_storage::{MemoryBlobStore, UrlSigner};
use data_connector::{HistoryStore, MemoryHistoryStore};
use http_body_util::BodyExt;
use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use llm_multimodal::{encode_base64, EncodedImage, ImageNormalizer, MediaConnector, MediaConnectorConfig};
use mmchat::{
    config::GatewayConfig,
    gateway::{
        GatewayError, GatewayResult, GeneratedImages, ImageAnalysis, ImageGenParams, ModelGateway,
        TextCompletion, TextParams,
    },
    server::{build_app, AppState},
    workflow::{SharedComponents, WorkflowDefaults, WorkflowEngine},
};
use serde_json::Value;
use tower::ServiceExt;

pub const PUBLIC_BASE: &str = "http://localhost:8000";
pub const SIGNING_KEY: &str = "test-signing-key";

/// Which gateway calls should fail, and what they saw.
#[derive(Default)]
pub struct FakeGateway {
    pub fail_text: Option<String>,
    pub fail_analysis: Option<String>,
    pub fail_generation: Option<String>,
    pub unhealthy: bool,
    pub text_prompts: Mutex<Vec<String>>,
    pub analysis_prompts: Mutex<Vec<String>>,
    pub generation_prompts: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_text(message: &str) -> Self {
        Self {
            fail_text: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_analysis(message: &str) -> Self {
        Self {
            fail_analysis: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_generation(message: &str) -> Self {
        Self {
            fail_generation: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn text_prompts(&self) -> Vec<String> {
        self.text_prompts.lock().unwrap().clone()
    }

    pub fn analysis_prompts(&self) -> Vec<String> {
        self.analysis_prompts.lock().unwrap().clone()
    }

    pub fn generation_prompts(&self) -> Vec<String> {
        self.generation_prompts.lock().unwrap().clone()
    }
}

fn upstream(message: &str) -> GatewayError {
    GatewayError::Upstream {
        status: 500,
        message: message.to_string(),
    }
}

/// The question a prompt ends on, with any conversation context stripped.
fn latest_question(prompt: &str) -> &str {
    prompt
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix("User: "))
        .unwrap_or(prompt)
}

#[async_trait]
impl ModelGateway for FakeGateway {
    async fn generate_text(
        &self,
        prompt: &str,
        _params: &TextParams,
    ) -> GatewayResult<TextCompletion> {
        self.text_prompts.lock().unwrap().push(prompt.to_string());
        if let Some(message) = &self.fail_text {
            return Err(upstream(message));
        }
        Ok(TextCompletion {
            text: format!("answer to: {}", latest_question(prompt)),
            model_id: "fake-text".to_string(),
            tokens_used: Some(10),
        })
    }

    async fn analyze_image(
        &self,
        image: &EncodedImage,
        prompt: &str,
    ) -> GatewayResult<ImageAnalysis> {
        self.analysis_prompts.lock().unwrap().push(prompt.to_string());
        if let Some(message) = &self.fail_analysis {
            return Err(upstream(message));
        }
        Ok(ImageAnalysis {
            analysis: format!("a {}x{} picture", image.width, image.height),
            model_id: "fake-vision".to_string(),
            tokens_used: Some(5),
        })
    }

    async fn generate_image(
        &self,
        prompt: &str,
        params: &ImageGenParams,
    ) -> GatewayResult<GeneratedImages> {
        self.generation_prompts
            .lock()
            .unwrap()
            .push(prompt.to_string());
        if let Some(message) = &self.fail_generation {
            return Err(upstream(message));
        }
        let png = encode_base64(&png_bytes(4, 4));
        Ok(GeneratedImages {
            images: vec![png; params.num_images as usize],
            model_id: "fake-image".to_string(),
        })
    }

    async fn health_check(&self) -> GatewayResult<()> {
        if self.unhealthy {
            Err(GatewayError::Connection("refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

pub struct TestHarness {
    pub gateway: Arc<FakeGateway>,
    pub storage: Arc<MemoryBlobStore>,
    pub history: Arc<MemoryHistoryStore>,
    pub components: Arc<SharedComponents>,
    pub engine: WorkflowEngine,
    pub app: Router,
}

impl TestHarness {
    pub fn new(gateway: FakeGateway) -> Self {
        let mut config = GatewayConfig::default();
        config.storage.public_base_url = PUBLIC_BASE.to_string();

        let gateway = Arc::new(gateway);
        let storage = Arc::new(MemoryBlobStore::new(UrlSigner::new(
            SIGNING_KEY,
            PUBLIC_BASE,
            config.storage.presign_expiry_secs,
        )));
        let history = Arc::new(MemoryHistoryStore::new(
            config.history.max_turns,
            config.history.max_sessions,
        ));

        let components = Arc::new(SharedComponents {
            gateway: gateway.clone(),
            normalizer: ImageNormalizer::default(),
            media: MediaConnector::new(
                reqwest::Client::new(),
                MediaConnectorConfig {
                    allowed_domains: None,
                    fetch_timeout: std::time::Duration::from_secs(1),
                    max_bytes: config.images.max_file_size,
                    allowed_content_types: config.images.allowed_types.clone(),
                },
            ),
            storage: storage.clone(),
            history: history.clone() as Arc<dyn HistoryStore>,
            defaults: WorkflowDefaults::default(),
        });
        let engine = WorkflowEngine::new(components.clone());
        let app = build_app(Arc::new(AppState::new(engine.clone(), config)));

        Self {
            gateway,
            storage,
            history,
            components,
            engine,
            app,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Jpeg).unwrap();
    out.into_inner()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([0, 120, 255, 128]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn jpeg_base64(width: u32, height: u32) -> String {
    encode_base64(&jpeg_bytes(width, height))
}
