use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use blob_storage::BlobStorageError;
use serde::Serialize;
use serde_json::json;

use crate::{
    gateway::GatewayError,
    workflow::{image_source::ImageLoadError, Envelope},
};

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    #[serde(rename = "type")]
    error_type: &'static str,
    code: &'a str,
    message: &'a str,
    param: Option<String>,
}

pub const HEADER_X_MMCHAT_ERROR_CODE: &str = "X-Mmchat-Error-Code";

pub fn internal_error(code: impl Into<String>, message: impl Into<String>) -> Response {
    create_error(StatusCode::INTERNAL_SERVER_ERROR, code, message)
}

pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Response {
    create_error(StatusCode::BAD_REQUEST, code, message)
}

pub fn forbidden(code: impl Into<String>, message: impl Into<String>) -> Response {
    create_error(StatusCode::FORBIDDEN, code, message)
}

pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Response {
    create_error(StatusCode::NOT_FOUND, code, message)
}

pub fn service_unavailable(code: impl Into<String>, message: impl Into<String>) -> Response {
    create_error(StatusCode::SERVICE_UNAVAILABLE, code, message)
}

pub fn bad_gateway(code: impl Into<String>, message: impl Into<String>) -> Response {
    create_error(StatusCode::BAD_GATEWAY, code, message)
}

pub fn gateway_timeout(code: impl Into<String>, message: impl Into<String>) -> Response {
    create_error(StatusCode::GATEWAY_TIMEOUT, code, message)
}

pub fn create_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> Response {
    let code_str = code.into();
    let message_str = message.into();

    let mut headers = HeaderMap::with_capacity(1);
    if let Ok(val) = HeaderValue::from_str(&code_str) {
        headers.insert(HEADER_X_MMCHAT_ERROR_CODE, val);
    }

    (
        status,
        headers,
        Json(ErrorResponse {
            error: ErrorDetail {
                error_type: status_code_to_str(status),
                code: &code_str,
                message: &message_str,
                param: None,
            },
        }),
    )
        .into_response()
}

fn status_code_to_str(status_code: StatusCode) -> &'static str {
    status_code
        .canonical_reason()
        .unwrap_or("Unknown Status Code")
}

/// A workflow that trapped a failure still produced an apology; clients get
/// both it and the error detail, with a 500 regardless of the failure kind.
pub fn workflow_error(envelope: &Envelope) -> Response {
    let message = envelope.error.as_deref().unwrap_or("Workflow failed");
    let mut headers = HeaderMap::with_capacity(1);
    headers.insert(
        HEADER_X_MMCHAT_ERROR_CODE,
        HeaderValue::from_static("workflow_error"),
    );
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        headers,
        Json(json!({
            "error": {
                "type": status_code_to_str(StatusCode::INTERNAL_SERVER_ERROR),
                "code": "workflow_error",
                "message": message,
                "param": null,
            },
            "response": envelope.response,
            "session_id": envelope.session_id,
        })),
    )
        .into_response()
}

pub fn from_gateway_error(err: &GatewayError) -> Response {
    let message = err.to_string();
    match err {
        GatewayError::Timeout(_) => gateway_timeout(err.code(), message),
        GatewayError::Connection(_)
        | GatewayError::Upstream { .. }
        | GatewayError::InvalidResponse(_) => bad_gateway(err.code(), message),
        GatewayError::Request(_) => internal_error(err.code(), message),
    }
}

pub fn from_image_load_error(err: &ImageLoadError) -> Response {
    let message = err.to_string();
    match err {
        ImageLoadError::NotFound(_) => not_found("image_not_found", message),
        ImageLoadError::Unresolvable(_) => bad_request("invalid_image_url", message),
        ImageLoadError::Storage(inner) => from_blob_error(inner),
        ImageLoadError::Media(_) => bad_request("image_fetch_failed", message),
        ImageLoadError::Normalize(_) => bad_request("image_processing_failed", message),
    }
}

pub fn from_blob_error(err: &BlobStorageError) -> Response {
    let message = err.to_string();
    match err {
        BlobStorageError::InvalidKey(_) => bad_request("invalid_key", message),
        BlobStorageError::InvalidSignature | BlobStorageError::Expired(_) => {
            forbidden("invalid_signature", message)
        }
        BlobStorageError::ContentTypeMismatch { .. } => {
            forbidden("content_type_mismatch", message)
        }
        BlobStorageError::Unavailable(_) => service_unavailable("storage_unavailable", message),
        BlobStorageError::Io(_) | BlobStorageError::Serialization(_) => {
            internal_error("storage_error", message)
        }
    }
}

pub fn extract_error_code_from_response<B>(response: &Response<B>) -> &str {
    response
        .headers()
        .get(HEADER_X_MMCHAT_ERROR_CODE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
