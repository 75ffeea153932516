//! Focus modes: the attention categories that drive what the agent expresses.

use serde::{Deserialize, Serialize};

/// The attention category currently driving expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FocusMode {
    /// New or changing visual elements, immediate attention.
    Visual,
    /// Processing feelings, mood transitions, reactions.
    Emotional,
    /// Exploring past observations, pattern recognition, familiarity.
    Memory,
    /// Deep introspection about identity and meaning.
    Philosophical,
    /// Awareness of duration and the passage of time.
    Temporal,
}

impl FocusMode {
    /// All modes, in declaration order.
    pub const ALL: [FocusMode; 5] = [
        Self::Visual,
        Self::Emotional,
        Self::Memory,
        Self::Philosophical,
        Self::Temporal,
    ];

    /// How much historical detail this mode surfaces.
    pub fn compression_level(&self) -> CompressionLevel {
        match self {
            Self::Visual => CompressionLevel::High,
            Self::Emotional | Self::Memory => CompressionLevel::Medium,
            Self::Philosophical | Self::Temporal => CompressionLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visual => "VISUAL",
            Self::Emotional => "EMOTIONAL",
            Self::Memory => "MEMORY",
            Self::Philosophical => "PHILOSOPHICAL",
            Self::Temporal => "TEMPORAL",
        }
    }
}

impl std::fmt::Display for FocusMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How aggressively context is compressed for a focus mode.
///
/// `High` compression means minimal history; `Low` means richer history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionLevel {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}
