//! Generator trait: the abstraction over the text/vision generation backend.
//!
//! The engine decides *what kind* of text to ask for and *how much* context
//! to give it; a Generator turns that request into text. Implementations:
//! an Ollama-compatible HTTP client, scripted mocks in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Why a generation request was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPurpose {
    /// The regular per-cycle response.
    Cycle,
    /// The single corrective regeneration after a repetitive response.
    FreshAngleRetry,
    /// The periodic self-reflection pass.
    Reflection,
    /// The periodic self-model (doubts/desires/identity) extraction.
    SelfModel,
}

/// A request emitted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Background context (identity, beliefs, recent history, mood).
    pub system_context: String,

    /// What to produce right now.
    pub user_directive: String,

    /// Optional reference to the current frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,

    pub purpose: RequestPurpose,
}

impl GenerationRequest {
    pub fn new(
        purpose: RequestPurpose,
        system_context: impl Into<String>,
        user_directive: impl Into<String>,
    ) -> Self {
        Self {
            system_context: system_context.into(),
            user_directive: user_directive.into(),
            image_ref: None,
            purpose,
        }
    }

    pub fn with_image(mut self, image_ref: Option<String>) -> Self {
        self.image_ref = image_ref;
        self
    }
}

/// A successful generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,

    /// Which model actually responded.
    #[serde(default)]
    pub model: String,
}

impl GenerationResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: String::new(),
        }
    }
}

/// The core Generator trait.
///
/// Every call returns either generated text or an explicit failure; the
/// engine never retries on failure.
#[async_trait]
pub trait Generator: Send + Sync {
    /// A human-readable name for this backend (e.g., "ollama").
    fn name(&self) -> &str;

    /// Produce text for the request.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, GenerationError>;

    /// Health check: can we reach the backend?
    async fn health_check(&self) -> std::result::Result<bool, GenerationError> {
        Ok(true)
    }
}
