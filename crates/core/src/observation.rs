//! Observations: textual perceptions produced by an external describer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A perception handed to the engine by the image-description service.
///
/// The engine makes no assumption about how the text was derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// The description text.
    pub text: String,

    /// Describer confidence in `[0, 1]`.
    #[serde(default = "default_confidence")]
    pub confidence: f64,

    /// When the perception was captured.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Set by the caller when an external signal (e.g. a frame content hash)
    /// says the scene changed.
    #[serde(default)]
    pub scene_changed: bool,

    /// Optional reference to the captured frame, forwarded to the generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

fn default_confidence() -> f64 {
    1.0
}

impl Observation {
    /// Create an observation stamped with the current time.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: default_confidence(),
            timestamp: Utc::now(),
            scene_changed: false,
            image_ref: None,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_scene_change(mut self, changed: bool) -> Self {
        self.scene_changed = changed;
        self
    }

    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }
}

/// A remembered piece of text retained in the bounded observation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub text: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl ObservationRecord {
    pub fn new(text: impl Into<String>, confidence: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            timestamp,
        }
    }
}
