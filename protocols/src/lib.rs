//! Wire types for the multimodal chat gateway.
//!
//! Every HTTP request body is a `serde` type with `validator` rules; the
//! `validated` module provides the axum extractor that applies them.

pub mod chat;
pub mod health;
pub mod images;
pub mod model_card;
pub mod session;
pub mod uploads;
pub mod validated;

pub use chat::{ChatRequest, ChatResponse, MessageType, TextChatRequest};
pub use images::{
    ImageAnalysisRequest, ImageAnalysisResponse, ImageGenerationRequest, ImageGenerationResponse,
};
pub use model_card::{ModelCapabilities, ModelCard, ModelsResponse};
pub use uploads::{DirectUploadResponse, UploadImageRequest, UploadImageResponse};
