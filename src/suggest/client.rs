use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Text generation backend
#[async_trait::async_trait]
pub trait TextModel: Send + Sync {
    /// Free-form text for `prompt`
    async fn generate_text(&self, prompt: &str) -> Result<String>;

    /// A list of strings, requested as structured JSON output
    async fn generate_list(&self, prompt: &str) -> Result<Vec<String>>;
}

/// `generateContent` client for the Gemini REST API
#[derive(Clone)]
pub struct GeminiTextClient {
    api_base: String,
    model: String,
    api_key: Option<String>,
    http: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl GeminiTextClient {
    pub fn new(api_base: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            api_base: api_base.into(),
            model: model.into(),
            api_key,
            http: Client::new(),
        }
    }

    async fn generate(&self, prompt: &str, generation_config: Option<serde_json::Value>) -> Result<String> {
        let Some(key) = &self.api_key else {
            bail!("No API key configured");
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        );
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config,
        };

        debug!("Requesting completion from {}", self.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&request)
            .send()
            .await
            .context("Text model request failed")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} - {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        let body: GenerateResponse = response.json().await.context("Malformed text model response")?;
        body.text().ok_or_else(|| anyhow!("Text model returned no text"))
    }
}

#[async_trait::async_trait]
impl TextModel for GeminiTextClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        self.generate(prompt, None).await
    }

    async fn generate_list(&self, prompt: &str) -> Result<Vec<String>> {
        let config = json!({
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        });
        let text = self.generate(prompt, Some(config)).await?;
        serde_json::from_str(&text).context("Expected a JSON list of strings")
    }
}
