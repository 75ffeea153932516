//! Ollama-compatible generator.
//!
//! Talks to `POST {url}/api/generate` with `stream: false`. When the request
//! carries an image reference, the file is read and sent base64-encoded in
//! `images`, and the vision model (if configured) answers instead.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reverie_config::GeneratorConfig;
use reverie_core::error::GenerationError;
use reverie_core::generation::{GenerationRequest, GenerationResponse, Generator, RequestPurpose};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Sampling for analysis passes (reflection, self-model) is kept tighter.
const ANALYSIS_TEMPERATURE: f32 = 0.5;
const ANALYSIS_MIN_TOKENS: u32 = 150;

/// A `Generator` backed by an Ollama server.
pub struct OllamaGenerator {
    base_url: String,
    model: String,
    vision_model: Option<String>,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &GeneratorConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                GenerationError::NotConfigured(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            vision_model: config.vision_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    /// Build the request body. `images` holds already-encoded frames.
    fn build_body(&self, request: &GenerationRequest, images: Vec<String>) -> ApiGenerateRequest {
        let model = if images.is_empty() {
            self.model.clone()
        } else {
            self.vision_model.clone().unwrap_or_else(|| self.model.clone())
        };

        let (temperature, num_predict) = match request.purpose {
            RequestPurpose::Reflection | RequestPurpose::SelfModel => (
                ANALYSIS_TEMPERATURE,
                self.max_tokens.max(ANALYSIS_MIN_TOKENS),
            ),
            RequestPurpose::Cycle | RequestPurpose::FreshAngleRetry => {
                (self.temperature, self.max_tokens)
            }
        };

        ApiGenerateRequest {
            model,
            prompt: request.user_directive.clone(),
            system: (!request.system_context.is_empty()).then(|| request.system_context.clone()),
            images,
            stream: false,
            options: ApiOptions {
                temperature,
                num_predict,
            },
        }
    }

    async fn encode_image(path: &str) -> Result<String, GenerationError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| GenerationError::Failed(format!("Failed to read image {path}: {e}")))?;
        Ok(BASE64.encode(bytes))
    }

    fn parse_response(body: ApiGenerateResponse) -> Result<GenerationResponse, GenerationError> {
        let text = body.response.trim();
        if text.is_empty() {
            return Err(GenerationError::Failed("Empty response from generator".into()));
        }
        Ok(GenerationResponse {
            text: text.to_string(),
            model: body.model,
        })
    }
}

fn map_transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout(e.to_string())
    } else {
        GenerationError::Failed(e.to_string())
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);

        let images = match &request.image_ref {
            Some(path) => vec![Self::encode_image(path).await?],
            None => Vec::new(),
        };
        let body = self.build_body(&request, images);

        debug!(model = %body.model, purpose = ?request.purpose, "Sending generate request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Generator returned error");
            return Err(GenerationError::Failed(format!(
                "HTTP {}: {error_body}",
                status.as_u16()
            )));
        }

        let api_response: ApiGenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Failed(format!("Failed to parse response: {e}")))?;

        Self::parse_response(api_response)
    }

    async fn health_check(&self) -> std::result::Result<bool, GenerationError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_transport_error)?;

        Ok(response.status().is_success())
    }
}

// --- Ollama API types ---

#[derive(Debug, Serialize)]
struct ApiGenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
    stream: bool,
    options: ApiOptions,
}

#[derive(Debug, Serialize)]
struct ApiOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ApiGenerateResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(vision: Option<&str>) -> OllamaGenerator {
        let config = GeneratorConfig {
            url: "http://localhost:11434/".into(),
            vision_model: vision.map(String::from),
            ..Default::default()
        };
        OllamaGenerator::new(&config).unwrap()
    }

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(generator(None).base_url, "http://localhost:11434");
    }

    #[test]
    fn cycle_body_uses_configured_sampling() {
        let g = generator(None);
        let req = GenerationRequest::new(RequestPurpose::Cycle, "You are here.", "Describe it.");
        let body = serde_json::to_value(g.build_body(&req, Vec::new())).unwrap();

        assert_eq!(body["model"], "smollm2:1.7b");
        assert_eq!(body["prompt"], "Describe it.");
        assert_eq!(body["system"], "You are here.");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 120);
        assert!(body.get("images").is_none());
    }

    #[test]
    fn analysis_body_is_tighter() {
        let g = generator(None);
        let req = GenerationRequest::new(RequestPurpose::Reflection, "", "Rate yourself.");
        let body = serde_json::to_value(g.build_body(&req, Vec::new())).unwrap();

        assert!(body.get("system").is_none());
        assert_eq!(body["options"]["temperature"], 0.5);
        assert_eq!(body["options"]["num_predict"], 150);
    }

    #[test]
    fn images_switch_to_vision_model() {
        let g = generator(Some("llava:7b"));
        let req = GenerationRequest::new(RequestPurpose::Cycle, "", "Look.");
        let body = serde_json::to_value(g.build_body(&req, vec!["aGVsbG8=".into()])).unwrap();

        assert_eq!(body["model"], "llava:7b");
        assert_eq!(body["images"][0], "aGVsbG8=");
    }

    #[test]
    fn parse_response_trims_and_rejects_empty() {
        let ok: ApiGenerateResponse =
            serde_json::from_str(r#"{"model":"m","response":"  a soft light \n","done":true}"#)
                .unwrap();
        let parsed = OllamaGenerator::parse_response(ok).unwrap();
        assert_eq!(parsed.text, "a soft light");
        assert_eq!(parsed.model, "m");

        let empty: ApiGenerateResponse = serde_json::from_str(r#"{"response":"   "}"#).unwrap();
        assert!(matches!(
            OllamaGenerator::parse_response(empty),
            Err(GenerationError::Failed(_))
        ));
    }

    #[tokio::test]
    async fn missing_image_fails_before_any_request() {
        let g = generator(None);
        let req = GenerationRequest::new(RequestPurpose::Cycle, "", "Look.")
            .with_image(Some("/definitely/not/here.jpg".into()));
        let err = g.generate(req).await.unwrap_err();
        assert!(matches!(err, GenerationError::Failed(_)));
    }

    #[tokio::test]
    async fn encodes_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        std::fs::write(&path, b"hello").unwrap();
        let encoded = OllamaGenerator::encode_image(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(encoded, "aGVsbG8=");
    }
}
