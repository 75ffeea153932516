//! The three-axis affect vector and its published snapshot.

use serde::{Deserialize, Serialize};

/// Three-axis affect state, each component in `[-1, 1]`.
///
/// - `valence`: unpleasant (−1) to pleasant (+1)
/// - `arousal`: calm (−1) to excited (+1)
/// - `clarity`: confused (−1) to lucid (+1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoodVector {
    pub valence: f64,
    pub arousal: f64,
    pub clarity: f64,
}

impl MoodVector {
    /// Build a vector, clamping every component into range.
    pub fn new(valence: f64, arousal: f64, clarity: f64) -> Self {
        Self {
            valence,
            arousal,
            clarity,
        }
        .clamped()
    }

    /// Copy of this vector with every component clamped to `[-1, 1]`.
    ///
    /// NaN components collapse to 0.
    pub fn clamped(self) -> Self {
        Self {
            valence: clamp_unit(self.valence),
            arousal: clamp_unit(self.arousal),
            clarity: clamp_unit(self.clarity),
        }
    }

    /// Scalar mood in `[0, 1]`, derived from valence.
    pub fn scalar(&self) -> f64 {
        (self.valence + 1.0) / 2.0
    }

    pub fn is_in_range(&self) -> bool {
        [self.valence, self.arousal, self.clarity]
            .iter()
            .all(|v| (-1.0..=1.0).contains(v))
    }
}

impl Default for MoodVector {
    fn default() -> Self {
        Self {
            valence: 0.5,
            arousal: 0.0,
            clarity: 0.5,
        }
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) }
}

/// Mood as published to the voice/motor mapping layer and status reporters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodSnapshot {
    pub valence: f64,
    pub arousal: f64,
    pub clarity: f64,
    pub descriptor: String,
}

impl MoodSnapshot {
    pub fn vector(&self) -> MoodVector {
        MoodVector::new(self.valence, self.arousal, self.clarity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_components() {
        let m = MoodVector::new(3.0, -7.5, 0.25);
        assert_eq!(m.valence, 1.0);
        assert_eq!(m.arousal, -1.0);
        assert_eq!(m.clarity, 0.25);
        assert!(m.is_in_range());
    }

    #[test]
    fn nan_collapses_to_zero() {
        let m = MoodVector::new(f64::NAN, 0.1, 0.1);
        assert_eq!(m.valence, 0.0);
    }

    #[test]
    fn scalar_maps_valence_to_unit_interval() {
        assert_eq!(MoodVector::new(-1.0, 0.0, 0.0).scalar(), 0.0);
        assert_eq!(MoodVector::new(1.0, 0.0, 0.0).scalar(), 1.0);
        assert!((MoodVector::default().scalar() - 0.75).abs() < 1e-12);
    }
}
