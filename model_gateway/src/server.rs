use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode},
    routing::{delete, get, post},
    Router,
};
use blob_storage::{LocalBlobStore, MemoryBlobStore, ObjectStorage, UrlSigner};
use data_connector::create_history_store;
use llm_multimodal::{ImageNormalizer, MediaConnector, MediaConnectorConfig, NormalizerConfig};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::{GatewayConfig, StorageBackend},
    gateway::{ImageGenParams, ModelGateway, OpenAiGateway, OpenAiGatewayConfig, TextParams},
    routers::{blobs, chat, health},
    workflow::{SharedComponents, WorkflowDefaults, WorkflowEngine},
};

/// State shared by every handler.
pub struct AppState {
    pub engine: WorkflowEngine,
    pub config: GatewayConfig,
}

impl AppState {
    pub fn new(engine: WorkflowEngine, config: GatewayConfig) -> Self {
        Self { engine, config }
    }
}

/// Construct the collaborators once at startup.
pub async fn build_components(config: &GatewayConfig) -> anyhow::Result<Arc<SharedComponents>> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")?;

    let gateway: Arc<dyn ModelGateway> = Arc::new(OpenAiGateway::new(
        client.clone(),
        OpenAiGatewayConfig::from(&config.models),
    ));

    let images = &config.images;
    let normalizer = ImageNormalizer::new(NormalizerConfig {
        max_width: images.max_width,
        max_height: images.max_height,
        jpeg_quality: images.jpeg_quality,
        max_input_bytes: images.max_file_size,
    });
    let media = MediaConnector::new(
        client,
        MediaConnectorConfig {
            allowed_domains: images.allowed_domains.clone(),
            fetch_timeout: Duration::from_secs(images.fetch_timeout_secs),
            max_bytes: images.max_file_size,
            allowed_content_types: images.allowed_types.clone(),
        },
    );

    let storage_config = &config.storage;
    let signing_key = match &storage_config.signing_key {
        Some(key) => key.clone(),
        None => {
            warn!("No storage signing key configured; upload URLs will not survive a restart");
            Uuid::new_v4().to_string()
        }
    };
    let signer = UrlSigner::new(
        &signing_key,
        &storage_config.public_base_url,
        storage_config.presign_expiry_secs,
    );
    let storage: Arc<dyn ObjectStorage> = match storage_config.backend {
        StorageBackend::Local => Arc::new(
            LocalBlobStore::open(&storage_config.root, signer)
                .await
                .with_context(|| {
                    format!(
                        "failed to open blob store at {}",
                        storage_config.root.display()
                    )
                })?,
        ),
        StorageBackend::Memory => Arc::new(MemoryBlobStore::new(signer)),
    };

    let history = create_history_store(&config.history);

    info!(
        gateway = gateway.name(),
        storage = storage.backend_name(),
        history = history.backend_name(),
        "Collaborators initialized"
    );

    Ok(Arc::new(SharedComponents {
        gateway,
        normalizer,
        media,
        storage,
        history,
        defaults: WorkflowDefaults {
            text: TextParams::from(&config.models.text_defaults),
            image: ImageGenParams::from(&config.models.image_defaults),
            context_window: config.history.context_window,
        },
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

pub fn build_app(state: Arc<AppState>) -> Router {
    let server = &state.config.server;
    let chat_routes = Router::new()
        .route("/multimodal", post(chat::chat_multimodal))
        .route("/text", post(chat::chat_text))
        .route("/analyze-image", post(chat::analyze_image))
        .route("/generate-image", post(chat::generate_image))
        .route("/upload-image", post(chat::upload_image))
        .route("/upload-image-direct", post(chat::upload_image_direct))
        .route("/session/{session_id}/history", get(chat::session_history))
        .route("/session/{session_id}", delete(chat::clear_session))
        .route("/models", get(chat::list_models))
        .route("/health", get(health::chat_health));

    Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::liveness))
        .route("/blobs/{*key}", get(blobs::get_blob).put(blobs::put_blob))
        .nest("/api/v1/chat", chat_routes)
        .layer(DefaultBodyLimit::max(server.max_payload_size))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.request_timeout_secs),
        ))
        .layer(cors_layer(&server.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

pub async fn startup(config: GatewayConfig) -> anyhow::Result<()> {
    let components = build_components(&config).await?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(WorkflowEngine::new(components), config));
    let app = build_app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Multimodal chat gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated with error")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
