//! `/api/v1/chat/*` handlers.
//!
//! The two chat endpoints run the workflow; the rest call collaborators
//! directly and map their errors with `routers::error`.

use std::{sync::Arc, time::Instant};

use axum::{
    extract::{Multipart, Path, State},
    response::{IntoResponse, Response},
    Json,
};
use blob_storage::upload_key;
use bytes::Bytes;
use chrono::Utc;
use llm_multimodal::is_allowed_content_type;
use mmchat_protocol::{
    session::{ClearSessionResponse, HistoryMessage, SessionHistoryResponse, TurnRole},
    validated::ValidatedJson,
    ChatRequest, ChatResponse, DirectUploadResponse, ImageAnalysisRequest, ImageAnalysisResponse,
    ImageGenerationRequest, ImageGenerationResponse, TextChatRequest, UploadImageRequest,
    UploadImageResponse,
};
use serde_json::{json, Map};
use tracing::{info, warn};

use super::error;
use crate::{
    gateway::{model_catalog, ImageGenParams},
    server::AppState,
    workflow::{
        image_source::load_normalized, prompts, Envelope, ImageRef, WorkflowRequest,
    },
};

// ============================================================================
// Workflow endpoints
// ============================================================================

/// `POST /api/v1/chat/multimodal`
pub async fn chat_multimodal(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ChatRequest>,
) -> Response {
    info!(
        message_type = %request.message_type,
        has_image = request.has_image(),
        "Processing chat request"
    );
    run_workflow(&state, request).await
}

/// `POST /api/v1/chat/text`
pub async fn chat_text(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<TextChatRequest>,
) -> Response {
    run_workflow(&state, request.into()).await
}

async fn run_workflow(state: &AppState, request: ChatRequest) -> Response {
    let defaults = &state.engine.components().defaults.text;
    let envelope = state
        .engine
        .run(WorkflowRequest::from_chat(request, defaults))
        .await;
    if envelope.is_error() {
        return error::workflow_error(&envelope);
    }
    Json(chat_response(envelope, &state.config.models.text_model)).into_response()
}

fn chat_response(envelope: Envelope, fallback_model: &str) -> ChatResponse {
    ChatResponse {
        response: envelope.response,
        session_id: envelope.session_id,
        message_type: envelope.message_type,
        timestamp: Utc::now(),
        model_used: envelope
            .model_used
            .unwrap_or_else(|| fallback_model.to_string()),
        tokens_used: envelope.tokens_used,
        processing_time: Some(envelope.processing_time_seconds),
        metadata: envelope.metadata,
    }
}

// ============================================================================
// Standalone image operations
// ============================================================================

/// `POST /api/v1/chat/analyze-image`
pub async fn analyze_image(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ImageAnalysisRequest>,
) -> Response {
    let components = state.engine.components();
    let image = match (request.image_data, request.image_url) {
        (Some(data), _) => ImageRef::Inline(data),
        (None, Some(url)) => ImageRef::Url(url),
        (None, None) => return error::bad_request("missing_image", "No image provided"),
    };

    let started = Instant::now();
    let encoded = match load_normalized(components, &image).await {
        Ok(encoded) => encoded,
        Err(e) => {
            warn!(error = %e, "Failed to load image for analysis");
            return error::from_image_load_error(&e);
        }
    };

    match components.gateway.analyze_image(&encoded, &request.prompt).await {
        Ok(analysis) => {
            let mut metadata = Map::new();
            metadata.insert("model_used".into(), json!(analysis.model_id));
            metadata.insert("tokens_used".into(), json!(analysis.tokens_used));
            metadata.insert(
                "processing_time_seconds".into(),
                json!(started.elapsed().as_secs_f64()),
            );
            Json(ImageAnalysisResponse {
                analysis: analysis.analysis,
                confidence: None,
                detected_objects: None,
                metadata,
            })
            .into_response()
        }
        Err(e) => error::from_gateway_error(&e),
    }
}

/// `POST /api/v1/chat/generate-image`
pub async fn generate_image(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ImageGenerationRequest>,
) -> Response {
    let components = state.engine.components();
    let prompt_used = prompts::expand_generation_prompt(
        &request.prompt,
        request.generation_type.as_deref(),
        request.style.as_deref(),
    );
    let params = ImageGenParams {
        width: request.width,
        height: request.height,
        num_images: request.num_images,
        quality: request.quality.clone(),
        negative_prompt: request.negative_prompt.clone(),
    };

    let started = Instant::now();
    match components.gateway.generate_image(&prompt_used, &params).await {
        Ok(generated) => {
            let generation_time = started.elapsed().as_secs_f64();
            let mut metadata = Map::new();
            metadata.insert("original_prompt".into(), json!(request.prompt));
            metadata.insert("generation_type".into(), json!(request.generation_type));
            metadata.insert("style".into(), json!(request.style));
            metadata.insert("width".into(), json!(request.width));
            metadata.insert("height".into(), json!(request.height));
            Json(ImageGenerationResponse {
                images: generated.images,
                prompt_used,
                model_used: generated.model_id,
                generation_time: Some(generation_time),
                metadata,
            })
            .into_response()
        }
        Err(e) => error::from_gateway_error(&e),
    }
}

// ============================================================================
// Uploads
// ============================================================================

/// `POST /api/v1/chat/upload-image`
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UploadImageRequest>,
) -> Response {
    if !is_allowed_content_type(&request.content_type, &state.config.images.allowed_types) {
        return error::bad_request("invalid_image_format", "Invalid image format");
    }

    let storage = &state.engine.components().storage;
    match storage
        .presign_upload(&request.filename, &request.content_type)
        .await
    {
        Ok(presigned) => {
            info!(upload_id = %presigned.upload_id, key = %presigned.key, "Issued upload URL");
            Json(UploadImageResponse {
                upload_url: presigned.upload_url,
                image_url: presigned.access_url,
                expires_at: presigned.expires_at,
                upload_id: presigned.upload_id,
            })
            .into_response()
        }
        Err(e) => error::from_blob_error(&e),
    }
}

struct UploadedFile {
    filename: String,
    content_type: String,
    bytes: Bytes,
}

/// `POST /api/v1/chat/upload-image-direct` (multipart: `file`, optional `session_id`)
pub async fn upload_image_direct(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let mut file: Option<UploadedFile> = None;
    let mut session_id: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error::bad_request("invalid_multipart", e.body_text()),
        };
        match field.name().unwrap_or_default() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload.jpg").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                let bytes = match field.bytes().await {
                    Ok(bytes) => bytes,
                    Err(e) => return error::bad_request("invalid_multipart", e.body_text()),
                };
                file = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            "session_id" => match field.text().await {
                Ok(text) if !text.trim().is_empty() => session_id = Some(text),
                Ok(_) => {}
                Err(e) => return error::bad_request("invalid_multipart", e.body_text()),
            },
            _ => {}
        }
    }

    let Some(file) = file else {
        return error::bad_request("missing_file", "Multipart field 'file' is required");
    };
    info!(filename = %file.filename, size = file.bytes.len(), "Received direct image upload");

    let images = &state.config.images;
    if !is_allowed_content_type(&file.content_type, &images.allowed_types) {
        return error::bad_request("invalid_image_format", "Invalid image format");
    }
    if file.bytes.len() > images.max_file_size {
        return error::bad_request("image_too_large", "Image too large");
    }

    let (upload_id, key) = upload_key(&file.filename);
    let storage = &state.engine.components().storage;
    match storage
        .put_object(file.bytes, &key, &file.content_type)
        .await
    {
        Ok(stored) => Json(DirectUploadResponse {
            message: "Image uploaded successfully".to_string(),
            image_url: stored.url,
            upload_id,
            session_id,
        })
        .into_response(),
        Err(e) => {
            warn!(key = %key, error = %e, "Direct upload failed");
            error::from_blob_error(&e)
        }
    }
}

// ============================================================================
// Sessions and catalog
// ============================================================================

/// `GET /api/v1/chat/session/{session_id}/history`
pub async fn session_history(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Response {
    let history = &state.engine.components().history;
    match history.history(&session_id).await {
        Ok(turns) => Json(SessionHistoryResponse {
            session_id,
            messages: turns
                .into_iter()
                .map(|turn| HistoryMessage {
                    role: match turn.role {
                        data_connector::TurnRole::User => TurnRole::User,
                        data_connector::TurnRole::Assistant => TurnRole::Assistant,
                    },
                    content: turn.content,
                    created_at: turn.created_at,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => error::bad_request("invalid_session", e.to_string()),
    }
}

/// `DELETE /api/v1/chat/session/{session_id}`
pub async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Response {
    let history = &state.engine.components().history;
    match history.clear(&session_id).await {
        Ok(cleared) => {
            info!(session_id = %session_id, cleared, "Cleared session");
            Json(ClearSessionResponse {
                message: format!("Session {session_id} cleared successfully"),
                cleared,
            })
            .into_response()
        }
        Err(e) => error::bad_request("invalid_session", e.to_string()),
    }
}

/// `GET /api/v1/chat/models`
pub async fn list_models(State(state): State<Arc<AppState>>) -> Response {
    Json(model_catalog(&state.config.models)).into_response()
}
