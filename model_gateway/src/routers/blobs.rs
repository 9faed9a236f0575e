//! `/blobs/{*key}`: signed uploads and object downloads.
//!
//! Uploads are only accepted with the `expires`/`signature` pair issued by
//! `POST /api/v1/chat/upload-image`, and the request `Content-Type` must be
//! the one that was signed.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use blob_storage::{sanitize_key, UploadSignature};
use serde::Deserialize;
use tracing::{debug, info};

use super::error;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct SignedUploadQuery {
    pub expires: i64,
    pub signature: String,
}

/// `PUT /blobs/{*key}?expires=..&signature=..`
pub async fn put_blob(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    query: Result<Query<SignedUploadQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Ok(Query(query)) = query else {
        return error::forbidden("missing_signature", "Upload URL is not signed");
    };
    if let Err(e) = sanitize_key(&key) {
        return error::from_blob_error(&e);
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let storage = &state.engine.components().storage;
    let signature = UploadSignature {
        key: key.clone(),
        content_type: content_type.clone(),
        expires: query.expires,
        signature: query.signature,
    };
    if let Err(e) = storage.verify_upload(&signature) {
        debug!(key = %key, error = %e, "Rejected upload");
        return error::from_blob_error(&e);
    }
    if body.len() > state.config.images.max_file_size {
        return error::bad_request("image_too_large", "Image too large");
    }

    match storage.put_object(body, &key, &content_type).await {
        Ok(stored) => {
            info!(key = %stored.key, size = stored.size, "Stored signed upload");
            StatusCode::OK.into_response()
        }
        Err(e) => error::from_blob_error(&e),
    }
}

/// `GET /blobs/{*key}`
pub async fn get_blob(State(state): State<Arc<AppState>>, Path(key): Path<String>) -> Response {
    let storage = &state.engine.components().storage;
    match storage.get_object(&key).await {
        Ok(Some(object)) => (
            [(header::CONTENT_TYPE, object.content_type)],
            object.bytes,
        )
            .into_response(),
        Ok(None) => error::not_found("blob_not_found", format!("No object at '{key}'")),
        Err(e) => error::from_blob_error(&e),
    }
}
