use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::reply::error::GenerateError;
use crate::reply::model::ItemData;
use crate::settings::expose;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Drafts a reply for one post.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(
        &self,
        item: &ItemData,
        api_key: &SecretString,
        model_id: &str,
    ) -> Result<String, GenerateError>;
}

// ============================================================================
// Gemini wire types
// ============================================================================

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

// ============================================================================
// Gemini backend
// ============================================================================

pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new(GEMINI_BASE_URL)
    }
}

impl GeminiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Prompt asking for one short, human-sounding reply to `item`.
pub fn build_prompt(item: &ItemData) -> String {
    format!(
r#"You are replying to a post on a social network. Write ONE reply that reads like a real person wrote it.

GUIDELINES:
- Stay under 280 characters.
- Casual tone, contractions welcome, no corporate phrasing.
- Match the post's tone and topic. Pick whichever fits best: congratulate or encourage,
  share a relatable take, or ask a thoughtful follow-up question.
- No hashtags, no emoji walls, nothing that sounds automated.

POST:
- Text: "{}"
- Author: @{}
- Engagement: {} likes, {} reposts

Respond with the reply text only."#,
        item.text_or_placeholder(),
        item.author_or_placeholder(),
        item.likes,
        item.reposts
    )
}

/// First candidate's first text part, trimmed.
fn extract_reply(response: GenerateResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

pub fn parse_generate_body(body: &str) -> Result<String, GenerateError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|_| GenerateError::MalformedResponse)?;
    extract_reply(response).ok_or(GenerateError::MalformedResponse)
}

#[async_trait]
impl ReplyGenerator for GeminiClient {
    async fn generate(
        &self,
        item: &ItemData,
        api_key: &SecretString,
        model_id: &str,
    ) -> Result<String, GenerateError> {
        let url = format!("{}/{}:generateContent", self.base_url, model_id);
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(build_prompt(item)),
                }],
            }],
        };

        debug!(model = model_id, "requesting reply");

        let response = self
            .client
            .post(&url)
            .query(&[("key", expose(api_key))])
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerateError::Unknown(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Gemini API error");
            return Err(match status.as_u16() {
                400 | 401 | 403 => GenerateError::InvalidCredential { status: status.as_u16() },
                code => GenerateError::Unknown(format!(
                    "{} {}",
                    code,
                    status.canonical_reason().unwrap_or("")
                )),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| GenerateError::Unknown(e.to_string()))?;

        parse_generate_body(&body)
    }
}
