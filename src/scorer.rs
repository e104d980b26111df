//! Generative-model scoring client.
//!
//! Sends a fixed evaluation prompt to a Gemini-compatible
//! `generateContent` endpoint and turns the free-text reply into a
//! [`ScoreResult`].
//!
//! # Wire format
//!
//! ```text
//! POST {endpoint}/v1beta/models/{model}:generateContent?key={api_key}
//! {"contents":[{"parts":[{"text": "<prompt>"}]}]}
//!
//! 200 {"candidates":[{"content":{"parts":[{"text": "<reply>"}]}}]}
//!     {"error":{"message":"..."}}
//! ```
//!
//! # Reply handling
//!
//! The model is asked for bare JSON but often wraps it in a fenced code
//! block or adds commentary. [`extract_json`] cuts the object out before
//! parsing. `resonance` and `total` are recomputed locally, never trusted
//! from the reply.
//!
//! There is no retry: a failed call is terminal for that item in the
//! current cycle.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ScoringConfig;
use crate::error::ScoringError;
use crate::models::{Item, ScoreResult};
use crate::traits::Scorer;

/// Build the evaluation prompt for an item.
pub fn build_score_prompt(item: &Item) -> String {
    format!(
        r#"You are an expert at judging the value of information. Score the item below on four dimensions.

## Rubric

1. **Scarcity** (0-25): how many people already know this?
   - first report / early spread = 20-25
   - known in a small circle = 10-19
   - already widely discussed = 0-9

2. **Actionability** (0-25): what can a reader do with it within 24 hours?
   - a concrete action is possible right away = 20-25
   - action needs some preparation = 10-19
   - nothing to do beyond "good to know" = 0-9

3. **Leverage** (0-25): how does the payoff compare to the effort?
   - small effort, large potential return = 20-25
   - moderate effort, moderate return = 10-19
   - large effort, small return = 0-9

4. **Resonance** (0-25): based on Carnegie's "How to Win Friends and Influence People", split into:
   - **importance** (0-8): does sharing this make the sharer look ahead of the curve?
   - **benefit** (0-9): does it save money, make money, or save time?
   - **noble** (0-8): does it carry a story of changing the world or helping others?

## Item

Title: {title}
Source: {source}
Description: {description}

## Output

Reply with exactly this JSON and nothing else:
{{"scarcity": <0-25>, "actionable": <0-25>, "leverage": <0-25>, "importance": <0-8>, "benefit": <0-9>, "noble": <0-8>, "reason": "<one sentence explaining the score>"}}"#,
        title = item.title,
        source = item.source,
        description = item.description,
    )
}

/// Build the question-answering prompt for an item.
pub fn build_ask_prompt(item: &Item, question: &str) -> String {
    format!(
        r#"You are an information analysis assistant. A user has a question about the item below; answer it in detail based on the item.

## Item

Title: {title}
Source: {source}
Description: {description}
Link: {url}

## Question

{question}

## Guidelines

1. Base the answer on the item content.
2. If the item does not contain enough information, say so honestly.
3. Answer concisely and clearly.
4. Add relevant background knowledge where it helps."#,
        title = item.title,
        source = item.source,
        description = item.description,
        url = item.url,
        question = question,
    )
}

/// Cut the JSON payload out of a model reply.
///
/// Starts just past the first ```` ```json ```` opener (or a plain fence
/// when there is no tagged one), ends at the last fence if it lies after
/// the start, and trims surrounding spaces and newlines.
pub fn extract_json(text: &str) -> &str {
    let start = if let Some(idx) = text.find("```json") {
        idx + "```json".len()
    } else if let Some(idx) = text.find("```") {
        idx + "```".len()
    } else {
        0
    };

    let end = match text.rfind("```") {
        Some(idx) if idx > start => idx,
        _ => text.len(),
    };

    text[start..end].trim_matches(|c| c == '\n' || c == ' ')
}

/// Parse a model reply into a finalized [`ScoreResult`].
pub fn parse_score_reply(reply: &str) -> Result<ScoreResult, ScoringError> {
    let content = extract_json(reply);
    let raw: ScoreResult = serde_json::from_str(content).map_err(|e| ScoringError::Parse {
        content: content.to_string(),
        cause: e.to_string(),
    })?;
    Ok(raw.finalize())
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<RemoteError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    #[serde(default)]
    message: String,
}

/// Scoring client for the Gemini `generateContent` API.
///
/// Holds one pooled HTTP client; cheap to share behind an `Arc` between
/// the ingestion task and HTTP handlers.
pub struct GeminiScorer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiScorer {
    pub fn new(config: &ScoringConfig) -> Result<Self, ScoringError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        )
    }

    /// Send one prompt and return the first candidate's first text part.
    async fn generate(&self, prompt: &str) -> Result<String, ScoringError> {
        if self.api_key.is_empty() {
            return Err(ScoringError::MissingApiKey);
        }

        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(self.request_url())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(ScoringError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| ScoringError::Parse {
                content: text.clone(),
                cause: format!("failed to parse response: {}", e),
            })?;

        if let Some(err) = parsed.error {
            return Err(ScoringError::Remote(err.message));
        }

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or(ScoringError::EmptyResponse)
    }
}

#[async_trait]
impl Scorer for GeminiScorer {
    async fn score(&self, item: &Item) -> Result<ScoreResult, ScoringError> {
        let reply = self.generate(&build_score_prompt(item)).await?;
        parse_score_reply(&reply)
    }

    async fn ask(&self, item: &Item, question: &str) -> Result<String, ScoringError> {
        self.generate(&build_ask_prompt(item, question)).await
    }
}
