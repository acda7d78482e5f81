//! Embedding and chat/vision backends.
//!
//! Both backends are narrow, synchronous request/response seams. The bundled
//! implementation speaks the OpenAI-compatible HTTP API (`/embeddings` and
//! `/chat/completions`), which also covers self-hosted gateways via a base
//! URL override. Calls are unretried; a transient failure is fatal for the
//! invocation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Embedding model shared by the builder and the retrieval path. The two
/// paths must use the same model: index and query vectors are only comparable
/// when they come from the same embedding space.
pub const EMBED_MODEL: &str = "text-embedding-ada-002";

/// Chat model used for both the vision description and the filtering oracle.
pub const CHAT_MODEL: &str = "gpt-4o-mini";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Computes embedding vectors for a batch of texts, one vector per input, in
/// input order.
pub trait EmbeddingBackend {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Produces a free-text completion for a prompt, optionally grounded in an
/// image.
pub trait ChatBackend {
    fn complete(&self, request: &ChatRequest) -> Result<String>;
}

/// A single chat/vision call.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub prompt: String,
    pub image_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

/// OpenAI-compatible HTTP client implementing both backends.
pub struct OpenAiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// Build a client from `OPENAI_API_KEY` (or the legacy `OPENAI_KEY`),
    /// with an optional `OPENAI_BASE_URL` override. A missing key is a
    /// configuration error, not a backend error: nothing was called yet.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .or_else(|_| std::env::var("OPENAI_KEY"))
            .map_err(|_| {
                Error::Config(
                    "OpenAI API key not set; provide OPENAI_API_KEY".into(),
                )
            })?;
        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(api_key, base_url)
    }

    pub fn new(api_key: String, base_url: String) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &Req,
    ) -> Result<Resp> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(Error::Backend(format!(
                "{endpoint} call failed with {status}: {detail}"
            )));
        }

        Ok(response.json()?)
    }
}

impl EmbeddingBackend for OpenAiClient {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingApiRequest {
            model: EMBED_MODEL,
            input: texts,
        };
        let response: EmbeddingApiResponse =
            self.post("embeddings", &request)?;

        if response.data.len() != texts.len() {
            return Err(Error::Backend(format!(
                "embedding response has {} vectors for {} inputs",
                response.data.len(),
                texts.len()
            )));
        }

        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

impl ChatBackend for OpenAiClient {
    fn complete(&self, request: &ChatRequest) -> Result<String> {
        let mut content = vec![ContentPart::Text {
            text: request.prompt.clone(),
        }];
        if let Some(ref url) = request.image_url {
            content.push(ContentPart::ImageUrl {
                image_url: ImageUrl { url: url.clone() },
            });
        }

        let api_request = ChatApiRequest {
            model: CHAT_MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };
        let response: ChatApiResponse =
            self.post("chat/completions", &api_request)?;

        let completion = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::Backend("chat response contained no choices".into())
            })?
            .message
            .content;

        Ok(completion.trim().to_string())
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

// -- Wire types --

#[derive(Serialize)]
struct EmbeddingApiRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingApiVector>,
}

#[derive(Deserialize)]
struct EmbeddingApiVector {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatApiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: Vec<ContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatApiResponse {
    choices: Vec<ChatApiChoice>,
}

#[derive(Deserialize)]
struct ChatApiChoice {
    message: ChatApiMessage,
}

#[derive(Deserialize)]
struct ChatApiMessage {
    content: String,
}
