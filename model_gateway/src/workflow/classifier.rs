//! Intent Classifier.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Phrases that mark a request as image generation. Checked before the
/// image-presence rule, so "create a caption for this photo" still generates.
pub const GENERATION_KEYWORDS: &[&str] = &["generate", "create", "draw", "make an image"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    AnalyzeImage,
    GenerateText,
    GenerateImage,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::AnalyzeImage => "analyze_image",
            Intent::GenerateText => "generate_text",
            Intent::GenerateImage => "generate_image",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First match wins: generation keyword, then image presence, then text.
pub fn classify(question: &str, has_image: bool) -> Intent {
    let question = question.to_lowercase();
    if GENERATION_KEYWORDS.iter().any(|k| question.contains(k)) {
        Intent::GenerateImage
    } else if has_image {
        Intent::AnalyzeImage
    } else {
        Intent::GenerateText
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_keywords_any_case() {
        for q in [
            "please generate image of a cat",
            "Please GENERATE IMAGE of a cat",
            "Create a logo",
            "can you draw a horse",
            "Make An Image of the sea",
        ] {
            assert_eq!(classify(q, false), Intent::GenerateImage, "{q}");
        }
    }

    #[test]
    fn test_generation_beats_image_presence() {
        assert_eq!(
            classify("create a caption for this photo", true),
            Intent::GenerateImage
        );
    }

    #[test]
    fn test_image_without_keywords_is_analysis() {
        assert_eq!(classify("What is in this picture?", true), Intent::AnalyzeImage);
        assert_eq!(classify("", true), Intent::AnalyzeImage);
    }

    #[test]
    fn test_fallback_is_text() {
        assert_eq!(classify("What is the capital of France?", false), Intent::GenerateText);
        assert_eq!(classify("", false), Intent::GenerateText);
        assert_eq!(classify("make a sandwich", false), Intent::GenerateText);
    }
}
