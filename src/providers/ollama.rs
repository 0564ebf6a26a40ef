use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use log::warn;
use std::time::Duration;

use crate::llm::LLMProvider;

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    choices: Vec<OllamaChoice>,
}

#[derive(Debug, Deserialize)]
struct OllamaChoice {
    message: OllamaMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: OllamaErrorDetails,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorDetails {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

/// Ollama LLM provider, talking to the server's OpenAI-compatible endpoint
pub struct OllamaProvider {
    model: String,
    base_url: String,
    client: Client,
    temperature: f32,
    system_prompt: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider with default settings
    pub fn new(
        model: Option<String>,
        temperature: Option<f32>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            model: model.unwrap_or_else(|| "qwen3:8b".to_string()),
            base_url: base_url
                .unwrap_or_else(|| "http://localhost:11434".to_string())
                .trim_end_matches('/')
                .to_string(),
            client,
            temperature: temperature.unwrap_or(0.2),
            system_prompt: "You are a concise assistant for restaurant customer feedback.".to_string(),
        })
    }

    /// Set the brand the assistant speaks for
    pub fn with_brand(mut self, brand: &str) -> Self {
        self.system_prompt = format!(
            "You are a concise assistant for {}'s restaurant customer feedback.",
            brand
        );
        self
    }

    fn build_request(&self, prompt: &str) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            messages: vec![
                OllamaMessage {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                OllamaMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            stream: false,
        }
    }
}

fn parse_response(status: reqwest::StatusCode, response_text: &str) -> Result<String> {
    if !status.is_success() {
        // Try to parse error response
        if let Ok(error_response) = serde_json::from_str::<OllamaError>(response_text) {
            return Err(anyhow!(
                "Ollama API error: {} (type: {:?})",
                error_response.error.message,
                error_response.error.error_type
            ));
        }
        return Err(anyhow!(
            "Ollama API error (status {}): {}",
            status,
            response_text
        ));
    }

    let api_response: OllamaResponse =
        serde_json::from_str(response_text).context("Failed to parse Ollama API response")?;

    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("No choices in Ollama response"))?;
    match choice.finish_reason.as_deref() {
        Some("stop") | None => {}
        Some(other) => warn!("Ollama response finished with reason: {}", other),
    }
    Ok(choice.message.content)
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "Ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        let status = response.status();
        let response_text = response.text().await?;
        parse_response(status, &response_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn provider() -> OllamaProvider {
        OllamaProvider::new(None, None, Some("http://gpu-box:11434/".to_string()), Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_brand_in_system_prompt() {
        let p = provider().with_brand("SteamNoodles");
        let request = p.build_request("Classify this");
        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages[0].content.contains("SteamNoodles"));
        assert_eq!(request.messages[1].content, "Classify this");
        assert!(!request.stream);
        assert_eq!(p.base_url, "http://gpu-box:11434");
    }

    #[test]
    fn test_parse_success() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "positive"}, "finish_reason": "stop"}]}"#;
        assert_eq!(parse_response(StatusCode::OK, body).unwrap(), "positive");
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"{"error": {"message": "model 'qwen3:8b' not found", "type": "api_error"}}"#;
        let err = parse_response(StatusCode::NOT_FOUND, body).unwrap_err();
        assert!(err.to_string().contains("not found"));

        let err = parse_response(StatusCode::BAD_GATEWAY, "upstream down").unwrap_err();
        assert!(err.to_string().contains("502"));
    }
}
