//! Oracle-based candidate filtering.
//!
//! A chat model is asked to pick the relevant tags out of the retrieved
//! candidates. The model is untrusted free text, so its output is sanitized
//! unconditionally: only tags that actually appear in the candidate list can
//! survive, and at most [`FINAL_K`] of them. Unusable output degrades to an
//! empty selection rather than an error.

use crate::{
    backend::{ChatBackend, ChatRequest},
    error::Result,
};

/// Tags written back per image, after filtering.
pub const FINAL_K: usize = 3;

const FILTER_MAX_TOKENS: u32 = 32;

/// Ask the oracle to select relevant tags for `description` out of
/// `candidates`, then sanitize its answer. Returned tags are lower-cased.
pub fn select_tags(
    chat: &dyn ChatBackend,
    description: &str,
    candidates: &[String],
) -> Result<Vec<String>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let response = chat.complete(&ChatRequest {
        prompt: filter_prompt(description, candidates),
        image_url: None,
        max_tokens: FILTER_MAX_TOKENS,
        temperature: Some(0.0),
    })?;

    Ok(sanitize_selection(&response, candidates, FINAL_K))
}

fn filter_prompt(description: &str, candidates: &[String]) -> String {
    format!(
        "You must select at most {FINAL_K} relevant tags from the provided \
         list for an image described as: '{description}'\n\n\
         Available tags: {}\n\n\
         CRITICAL: Respond with ONLY the selected tags, comma-separated, no \
         explanations. If no tags are relevant, respond with 'none'. Do not \
         include any reasoning, descriptions, or additional text.",
        candidates.join(", ")
    )
}

/// Reduce a free-text oracle response to valid tags.
///
/// Parses a comma-separated list, trims and lower-cases each entry, keeps
/// only entries present in `candidates` (compared case-insensitively), and
/// truncates to `limit`. A response of "none" (any case) or nothing usable
/// yields an empty list.
pub fn sanitize_selection(
    response: &str,
    candidates: &[String],
    limit: usize,
) -> Vec<String> {
    let response = response.trim().to_lowercase();
    if response.is_empty() || response == "none" {
        return Vec::new();
    }

    let allowed: Vec<String> =
        candidates.iter().map(|c| c.to_lowercase()).collect();

    let mut selected: Vec<String> = response
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| allowed.contains(t))
        .collect();
    selected.truncate(limit);
    selected
}
