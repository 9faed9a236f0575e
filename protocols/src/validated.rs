// Validated JSON extractor for automatic request validation
//
// Request bodies are deserialized, normalized, then checked with the
// validator crate's Validate trait before a handler ever sees them.

/// Trait for request types that need post-deserialization normalization
pub trait Normalizable {
    /// Normalize the request by applying defaults and transformations
    fn normalize(&mut self) {
        // Default: no-op
    }
}

#[cfg(feature = "axum")]
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
#[cfg(feature = "axum")]
use serde::de::DeserializeOwned;
#[cfg(feature = "axum")]
use serde_json::json;
#[cfg(feature = "axum")]
use validator::Validate;

/// A JSON extractor that deserializes, normalizes and validates the body
///
/// Validation failures never reach the handler: the extractor rejects them
/// with a 400 in the gateway's error shape.
///
/// ```rust,ignore
/// async fn chat(ValidatedJson(request): ValidatedJson<ChatRequest>) -> Response {
///     // request.message_type == Multimodal implies an image is present
///     run(request).await
/// }
/// ```
#[cfg(feature = "axum")]
pub struct ValidatedJson<T>(pub T);

#[cfg(feature = "axum")]
fn rejection(code: &'static str, message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": {
                "type": "Bad Request",
                "code": code,
                "message": message,
                "param": null
            }
        })),
    )
        .into_response()
}

#[cfg(feature = "axum")]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Normalizable + Send,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(mut data) =
            Json::<T>::from_request(req, state)
                .await
                .map_err(|err: JsonRejection| {
                    let error_message = match err {
                        JsonRejection::JsonDataError(e) => {
                            format!("Invalid JSON data: {e}")
                        }
                        JsonRejection::JsonSyntaxError(e) => {
                            format!("JSON syntax error: {e}")
                        }
                        JsonRejection::MissingJsonContentType(_) => {
                            "Missing Content-Type: application/json header".to_string()
                        }
                        _ => format!("Failed to parse JSON: {err}"),
                    };
                    rejection("json_parse_error", error_message)
                })?;

        data.normalize();

        data.validate()
            .map_err(|errors| rejection("validation_error", errors.to_string()))?;

        Ok(ValidatedJson(data))
    }
}

#[cfg(feature = "axum")]
impl<T> std::ops::Deref for ValidatedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(feature = "axum")]
impl<T> std::ops::DerefMut for ValidatedJson<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
