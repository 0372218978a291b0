//! Gemini API client
//!
//! Talks to the `generateContent` REST endpoint with function declarations.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::config::GeminiConfig;
use crate::error::AssistantError;
use crate::llm::LanguageModel;
use crate::models::{GenerationRequest, ModelOutput, Speaker};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    endpoint: String,
    max_output_tokens: Option<u32>,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn build_request(&self, request: &GenerationRequest) -> GeminiRequest {
        let contents = request
            .turns
            .iter()
            .filter(|turn| !turn.text.trim().is_empty())
            .map(|turn| Content {
                role: Some(
                    match turn.speaker {
                        Speaker::User => "user",
                        Speaker::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: vec![Part::Text {
                    text: turn.text.clone(),
                }],
            })
            .collect();

        let system_instruction = request.system.as_ref().map(|system| Content {
            role: None,
            parts: vec![Part::Text {
                text: system.clone(),
            }],
        });

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(vec![Tool {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| FunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }])
        };

        GeminiRequest {
            contents,
            system_instruction,
            tools,
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: self.max_output_tokens,
                response_mime_type: request.response_mime_type.clone(),
            },
        }
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<ModelOutput> {
        if self.api_key.is_empty() {
            return Err(AssistantError::ConfigError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let body = self.build_request(request);

        info!(turns = body.contents.len(), tools = request.tools.len(), "Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                if e.is_timeout() {
                    AssistantError::LlmError(format!("Gemini request timed out: {}", e))
                } else {
                    AssistantError::LlmError(format!("Gemini API error: {}", e))
                }
            })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            error!(%status, "Gemini API error response: {}", message);
            return Err(AssistantError::LlmError(format!(
                "Gemini API returned {}: {}",
                status, message
            )));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&text).map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            AssistantError::MalformedResponse(format!("Gemini parse error: {}", e))
        })?;

        if let Some(usage) = &gemini_response.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini usage"
            );
        }

        parse_output(gemini_response)
    }
}

/// Reduce the first candidate to a single output.
/// A function call wins over any text parts sent alongside it.
fn parse_output(response: GeminiResponse) -> Result<ModelOutput> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AssistantError::MalformedResponse("No candidates in response".to_string()))?;

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

    let mut text = None;
    for part in parts {
        match part {
            Part::FunctionCall { function_call } => {
                return Ok(ModelOutput::ToolInvocation {
                    name: function_call.name,
                    args: function_call.args,
                });
            }
            Part::Text { text: t } if text.is_none() && !t.trim().is_empty() => {
                text = Some(t);
            }
            _ => {}
        }
    }

    text.map(ModelOutput::Text).ok_or_else(|| {
        AssistantError::MalformedResponse(format!(
            "Empty response from Gemini (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        ))
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    Text {
        text: String,
    },
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    /// Unset by default: thinking tokens count toward this limit on 2.5 models
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
