// src/services/ai.rs
//! Gemini text-generation client used for document analysis and chat

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::insights::models::AnalysisResult;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("AI API key not configured")]
    NotConfigured,

    #[error("AI request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid AI response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
    total_token_count: Option<u32>,
}

/// Thin client over the Gemini generateContent endpoint
#[derive(Debug, Clone)]
pub struct AiService {
    http: Client,
    api_key: Option<String>,
    model: String,
}

impl AiService {
    pub fn new(http: Client, api_key: Option<String>, model: String) -> Self {
        Self {
            http,
            api_key,
            model,
        }
    }

    /// Send a prompt and return the model's text output
    pub async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::NotConfigured)?;

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, api_key
        );

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "Sending prompt to AI");

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP error contacting AI service");
                AiError::RequestFailed(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            error!(http_status = %status, detail = %detail, "AI service returned error status");
            return Err(AiError::RequestFailed(format!(
                "AI service returned status {}",
                status
            )));
        }

        let parsed: GenerateContentResponse = resp.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse AI response envelope");
            AiError::InvalidResponse(e.to_string())
        })?;

        if let Some(usage) = &parsed.usage_metadata {
            info!(
                prompt_tokens = ?usage.prompt_token_count,
                completion_tokens = ?usage.candidates_token_count,
                total_tokens = ?usage.total_token_count,
                "AI token usage"
            );
        }

        let text = parsed
            .candidates
            .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
            .and_then(|c| c.content)
            .and_then(|mut content| {
                if content.parts.is_empty() {
                    None
                } else {
                    Some(content.parts.remove(0).text)
                }
            })
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                error!("AI service returned an empty response");
                AiError::InvalidResponse("empty response from AI service".to_string())
            })?;

        debug!(response_chars = text.len(), "Received AI response");
        Ok(text)
    }

    /// Run an analysis prompt and coerce the response into the structured
    /// analysis shape. Models often wrap JSON in markdown fences; those are
    /// stripped before parsing.
    pub async fn analyze(&self, prompt: &str) -> Result<AnalysisResult, AiError> {
        let raw = self.generate(prompt).await?;
        let cleaned = strip_json_fences(&raw);

        if cleaned.is_empty() {
            error!("AI analysis response was empty after cleaning");
            return Err(AiError::InvalidResponse(
                "empty analysis response after cleaning".to_string(),
            ));
        }

        let result: AnalysisResult = serde_json::from_str(cleaned).map_err(|e| {
            error!(error = %e, raw = %raw, "Failed to parse analysis JSON from AI");
            AiError::InvalidResponse(format!("analysis JSON did not parse: {}", e))
        })?;

        if result.match_score.is_none() || result.ats_score.is_none() {
            warn!("Analysis response parsed but is missing matchScore or atsScore");
        }

        Ok(result)
    }
}

/// Strip markdown code fences (``` or ```json) wrapping a JSON payload
pub fn strip_json_fences(response: &str) -> &str {
    let mut cleaned = response.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence_with_language_tag() {
        let raw = "```json\n{\"matchScore\": 80}\n```";
        assert_eq!(strip_json_fences(raw), "{\"matchScore\": 80}");
    }

    #[test]
    fn strips_bare_fence() {
        let raw = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_json_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn leaves_unfenced_json_alone() {
        let raw = "  {\"a\": 1}  ";
        assert_eq!(strip_json_fences(raw), "{\"a\": 1}");
    }
}
