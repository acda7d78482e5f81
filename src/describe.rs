use crate::{
    backend::{ChatBackend, ChatRequest},
    error::Result,
};

/// Sentinel the vision model returns when the image contains no body
/// modification. Callers short-circuit on it before retrieval.
pub const NO_CONTENT: &str = "none";

const DESCRIPTION_MAX_TOKENS: u32 = 256;

const VISION_PROMPT: &str = "Describe the visual content for tagging a \
body-modification social app. If it's a tattoo, specify the style and \
location. If it's a piercing, try to specify the type and location. Make \
sure your description pertains to just the body modification, not the \
person or the background. If the image is not a body modification, return \
'none'.";

/// Ask the vision model for a tagging-oriented description of the image
/// behind `image_url` (a signed, time-limited URL).
pub fn describe_image(
    chat: &dyn ChatBackend,
    image_url: &str,
) -> Result<String> {
    chat.complete(&ChatRequest {
        prompt: VISION_PROMPT.to_string(),
        image_url: Some(image_url.to_string()),
        max_tokens: DESCRIPTION_MAX_TOKENS,
        temperature: None,
    })
}

/// Whether a description is the "no relevant content" sentinel.
pub fn is_no_content(description: &str) -> bool {
    description.trim().eq_ignore_ascii_case(NO_CONTENT)
}
