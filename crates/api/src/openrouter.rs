//! OpenRouter chat-completions image provider.
//!
//! Image models are driven through `POST {api_url}/chat/completions` with
//! `modalities: ["image", "text"]`. Generated images come back on
//! `choices[0].message.images`, either as bare strings or as
//! `{"type": "image_url", "image_url": {"url": ...}}` objects.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::OpenRouterConfig;
use crate::generator::{GeneratedImage, ImageProvider, ImageRequest, ProviderError};

const APP_TITLE: &str = "AI Image Studio";

pub struct OpenRouterProvider {
    client: reqwest::Client,
    config: OpenRouterConfig,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    images: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl OpenRouterProvider {
    pub fn new(config: OpenRouterConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: OpenRouterConfig) -> Self {
        Self { client, config }
    }
}

/// Build the chat-completions body for one model run.
///
/// Without reference images the message content is the bare prompt; with
/// them it becomes a text part followed by one `image_url` part per
/// reference.
pub fn build_request_body(request: &ImageRequest) -> Value {
    let content = if request.reference_urls.is_empty() {
        Value::String(request.prompt.clone())
    } else {
        let mut parts = vec![json!({ "type": "text", "text": request.prompt })];
        parts.extend(
            request
                .reference_urls
                .iter()
                .map(|url| json!({ "type": "image_url", "image_url": { "url": url } })),
        );
        Value::Array(parts)
    };

    let mut body = json!({
        "model": request.model_id,
        "messages": [{ "role": "user", "content": content }],
        "modalities": ["image", "text"],
    });
    if !request.aspect_ratio.is_empty() {
        body["image_config"] = json!({ "aspect_ratio": request.aspect_ratio });
    }
    body
}

/// Pull image URLs out of a raw `images` entry.
///
/// Unknown shapes are logged and skipped.
pub fn normalize_image(raw: &Value) -> Option<String> {
    let url = match raw {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => raw
            .get("image_url")
            .and_then(|v| v.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };
    match url {
        Some(url) if !url.is_empty() => Some(url),
        _ => {
            tracing::warn!(raw = %raw, "Unknown image format in provider response");
            None
        }
    }
}

#[async_trait]
impl ImageProvider for OpenRouterProvider {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<GeneratedImage>, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("OPENROUTER_API_KEY"))?;

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_url))
            .bearer_auth(api_key)
            .header("HTTP-Referer", &self.config.app_url)
            .header("X-Title", APP_TITLE)
            .json(&build_request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<CompletionResponse>()
                .await
                .ok()
                .and_then(|body| body.error)
                .map(|e| e.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: CompletionResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: error.message,
            });
        }

        let images = body
            .choices
            .first()
            .map(|choice| {
                choice
                    .message
                    .images
                    .iter()
                    .filter_map(normalize_image)
                    .map(|url| GeneratedImage {
                        url,
                        width: None,
                        height: None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn request(refs: &[&str]) -> ImageRequest {
        ImageRequest {
            model_id: "google/gemini-2.5-flash-image".into(),
            prompt: "a fox".into(),
            aspect_ratio: "16:9".into(),
            reference_urls: refs.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn body_without_references_uses_plain_prompt() {
        let body = build_request_body(&request(&[]));
        assert_eq!(body["messages"][0]["content"], "a fox");
        assert_eq!(body["modalities"], json!(["image", "text"]));
        assert_eq!(body["image_config"]["aspect_ratio"], "16:9");
    }

    #[test]
    fn body_with_references_uses_content_parts() {
        let body = build_request_body(&request(&["https://cdn/ref.png"]));
        let parts = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["image_url"]["url"], "https://cdn/ref.png");
    }

    #[test]
    fn normalizes_both_image_shapes() {
        assert_eq!(
            normalize_image(&json!("data:image/png;base64,AAA")).as_deref(),
            Some("data:image/png;base64,AAA")
        );
        assert_eq!(
            normalize_image(&json!({"type": "image_url", "image_url": {"url": "https://x"}}))
                .as_deref(),
            Some("https://x")
        );
        assert!(normalize_image(&json!(42)).is_none());
        assert!(normalize_image(&json!("")).is_none());
    }

    #[tokio::test]
    async fn missing_api_key_is_reported() {
        let provider = OpenRouterProvider::new(OpenRouterConfig {
            api_key: None,
            api_url: "http://127.0.0.1:9".into(),
            app_url: "http://localhost:3000".into(),
        });
        let err = provider.generate(&request(&[])).await.unwrap_err();
        assert_matches!(err, ProviderError::NotConfigured("OPENROUTER_API_KEY"));
    }
}
