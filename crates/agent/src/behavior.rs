//! Maps a mood snapshot onto one of five discrete behavioural states,
//! the vocabulary a motor or voice layer understands.

use reverie_core::{MoodSnapshot, MoodVector};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorState {
    EnergizedEngaged,
    AlertCurious,
    CalmObservant,
    QuietDetached,
    WithdrawnDistant,
}

impl BehaviorState {
    /// Bucket the scalar mood `(valence + 1) / 2`.
    pub fn from_mood(mood: &MoodVector) -> Self {
        let scalar = mood.scalar();
        if scalar > 0.7 {
            Self::EnergizedEngaged
        } else if scalar > 0.6 {
            Self::AlertCurious
        } else if scalar > 0.4 {
            Self::CalmObservant
        } else if scalar > 0.3 {
            Self::QuietDetached
        } else {
            Self::WithdrawnDistant
        }
    }

    pub fn from_snapshot(snapshot: &MoodSnapshot) -> Self {
        Self::from_mood(&snapshot.vector())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnergizedEngaged => "energized_engaged",
            Self::AlertCurious => "alert_curious",
            Self::CalmObservant => "calm_observant",
            Self::QuietDetached => "quiet_detached",
            Self::WithdrawnDistant => "withdrawn_distant",
        }
    }
}

impl std::fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
