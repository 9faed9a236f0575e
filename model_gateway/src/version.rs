//! Version information module

pub const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const SERVICE_NAME: &str = "Multimodal Chatbot API";

/// Get simple version string (default for --version)
pub fn get_version_string() -> String {
    format!("{} {}", PROJECT_NAME, VERSION)
}

/// Get version number only
pub fn get_version() -> &'static str {
    VERSION
}
