use std::time::Duration;

use gleaner_core::error::{AppError, SchemaError};
use gleaner_core::job::ExtractedJobData;
use gleaner_core::traits::Extractor;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_SYSTEM_PROMPT: &str = "You extract job postings. Read the page content and return the posting's fields as JSON matching the requested schema. Copy values as they appear on the page. Omit fields the page does not state. Respond ONLY with JSON.";

/// OpenAI-compatible chat client for structured job extraction.
///
/// Works with any OpenAI-compatible API, including:
/// - OpenAI directly (`https://api.openai.com/v1`)
/// - Gemini via compatibility layer (`https://generativelanguage.googleapis.com/v1beta/openai`)
/// - Local servers such as Ollama (`http://localhost:11434/v1`)
#[derive(Clone)]
pub struct OpenAiExtractor {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl OpenAiExtractor {
    pub fn new(api_key: &str, model: &str) -> Result<Self, AppError> {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Result<Self, AppError> {
        Self::build(api_key, model, base_url, DEFAULT_LLM_TIMEOUT)
    }

    pub fn with_timeout(self, timeout: Duration) -> Result<Self, AppError> {
        let prompt = self.system_prompt.clone();
        Ok(Self::build(&self.api_key, &self.model, &self.base_url, timeout)?
            .with_system_prompt(prompt))
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build(
        api_key: &str,
        model: &str,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        if model.trim().is_empty() {
            return Err(AppError::ConfigError("Model name must not be empty".into()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        })
    }

    fn request_for(
        &self,
        document_text: &str,
        url: &str,
        schema: &serde_json::Value,
    ) -> Result<ChatRequest, SchemaError> {
        let pretty = serde_json::to_string_pretty(schema).map_err(|e| {
            SchemaError::conversion(format!("Target schema is not serializable: {e}")).with_cause(e)
        })?;

        Ok(ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                Message {
                    role: "user".to_string(),
                    content: format!(
                        "Extract the job posting according to this JSON schema:\n```json\n{pretty}\n```\n\nSource URL: {url}\n\nPage content:\n\n{document_text}"
                    ),
                },
            ],
            response_format: Some(ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: Some(JsonSchemaWrapper {
                    name: "job_posting".to_string(),
                    // Optional fields are omitted rather than null, which
                    // strict mode does not allow.
                    strict: false,
                    schema: schema.clone(),
                }),
            }),
        })
    }
}

// ---- OpenAI API types ----

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    json_schema: Option<JsonSchemaWrapper>,
}

#[derive(Serialize)]
struct JsonSchemaWrapper {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl Extractor for OpenAiExtractor {
    async fn extract_structured(
        &self,
        document_text: &str,
        url: &str,
        schema: &serde_json::Value,
    ) -> Result<ExtractedJobData, SchemaError> {
        let endpoint = format!("{}/chat/completions", self.base_url);
        let request = self.request_for(document_text, url, schema)?;

        tracing::debug!(
            model = %self.model,
            %endpoint,
            chars = document_text.len(),
            "Calling AI extractor"
        );

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("AI request to {endpoint} timed out")
                } else if e.is_connect() {
                    format!("Connection to {endpoint} failed")
                } else {
                    format!("AI request to {endpoint} failed")
                };
                SchemaError::network(message).with_cause(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {status_code}: {body}"));
            return Err(status_error(status_code, &self.model, message));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            SchemaError::parse("Failed to parse AI response envelope").with_cause(e)
        })?;

        let content = chat_response
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| SchemaError::api("Empty response from AI model"))?;

        let value = parse_json_content(content)?;
        ExtractedJobData::from_ai_value(value)
    }
}

/// Map a non-success HTTP status onto the closed [`SchemaError`] set.
fn status_error(status_code: u16, model: &str, message: String) -> SchemaError {
    let mentions_model = message.to_lowercase().contains("model");
    match status_code {
        401 | 403 => SchemaError::configuration(format!(
            "AI API rejected credentials (HTTP {status_code}): {message}"
        )),
        404 => SchemaError::model_not_supported(format!("Model '{model}' not found: {message}")),
        400 if mentions_model => {
            SchemaError::model_not_supported(format!("Model '{model}' rejected: {message}"))
        }
        429 | 500..=599 => SchemaError::network(format!("HTTP {status_code}: {message}")),
        _ => SchemaError::api(format!("HTTP {status_code}: {message}")),
    }
}

/// Parse the model's JSON, tolerating a surrounding Markdown code fence.
fn parse_json_content(content: &str) -> Result<serde_json::Value, SchemaError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    serde_json::from_str(unfenced).map_err(|e| {
        let preview: String = unfenced.chars().take(200).collect();
        SchemaError::parse(format!("AI returned invalid JSON: {e}. Raw: {preview}")).with_cause(e)
    })
}
