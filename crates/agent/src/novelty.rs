//! Bag-of-words novelty scoring and text-based scene change tracking.

use std::collections::{HashSet, VecDeque};

/// Perception texts kept for comparison.
const PERCEPTION_WINDOW: usize = 8;

/// Prior perceptions the latest one is compared against.
const COMPARE_AGAINST: usize = 3;

/// Novelty reported when no pair of texts could be compared.
const FALLBACK_NOVELTY: f64 = 0.5;

/// Lowercase whitespace-separated word set.
pub fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(String::from)
        .collect()
}

/// `|A ∩ B| / |A ∪ B|`, or `None` when either set is empty.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> Option<f64> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    Some(intersection / union)
}

/// Scores how different the latest perception is from the few before it.
#[derive(Debug, Clone, Default)]
pub struct NoveltyDetector {
    recent: VecDeque<String>,
    total_seen: u64,
}

impl NoveltyDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a perception and return its novelty in `[0, 1]`.
    pub fn observe(&mut self, text: &str) -> f64 {
        if self.recent.len() >= PERCEPTION_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(text.to_string());
        self.total_seen += 1;
        self.novelty()
    }

    /// Novelty of the most recent perception.
    pub fn novelty(&self) -> f64 {
        if self.total_seen < 2 {
            return 1.0;
        }
        let Some(latest) = self.recent.back() else {
            return 1.0;
        };
        let latest = word_set(latest);

        let similarities: Vec<f64> = self
            .recent
            .iter()
            .rev()
            .skip(1)
            .take(COMPARE_AGAINST)
            .filter_map(|prior| jaccard(&latest, &word_set(prior)))
            .collect();

        if similarities.is_empty() {
            return FALLBACK_NOVELTY;
        }
        let mean = similarities.iter().sum::<f64>() / similarities.len() as f64;
        (1.0 - mean).clamp(0.0, 1.0)
    }

    /// The last `n` perceptions, oldest first.
    pub fn recent(&self, n: usize) -> Vec<String> {
        let skip = self.recent.len().saturating_sub(n);
        self.recent.iter().skip(skip).cloned().collect()
    }

    pub fn total_seen(&self) -> u64 {
        self.total_seen
    }
}

/// How much the scene moved between two consecutive descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneChange {
    Same,
    Subtle,
    Significant,
    MajorShift,
}

impl SceneChange {
    pub fn from_magnitude(magnitude: f64) -> Self {
        if magnitude > 0.7 {
            Self::MajorShift
        } else if magnitude > 0.4 {
            Self::Significant
        } else if magnitude > 0.2 {
            Self::Subtle
        } else {
            Self::Same
        }
    }

    /// Whether this change resets the static-duration clock.
    pub fn resets_static(&self) -> bool {
        matches!(self, Self::Significant | Self::MajorShift)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Same => "same",
            Self::Subtle => "subtle",
            Self::Significant => "significant",
            Self::MajorShift => "major shift",
        }
    }
}

impl std::fmt::Display for SceneChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the previous scene description and reports change magnitude.
#[derive(Debug, Clone, Default)]
pub struct SceneTracker {
    baseline: Option<HashSet<String>>,
}

impl SceneTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare against the previous description, then make this one the baseline.
    ///
    /// The first description ever seen is not a change.
    pub fn track(&mut self, description: &str) -> (f64, SceneChange) {
        let current = word_set(description);
        let magnitude = match &self.baseline {
            None => 0.0,
            Some(previous) => jaccard(previous, &current).map_or(0.0, |s| 1.0 - s),
        };
        self.baseline = Some(current);
        (magnitude, SceneChange::from_magnitude(magnitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_fully_novel() {
        let mut d = NoveltyDetector::new();
        assert_eq!(d.observe("a chair by the window"), 1.0);
    }

    #[test]
    fn identical_second_observation_has_zero_novelty() {
        let mut d = NoveltyDetector::new();
        d.observe("a chair by the window");
        assert_eq!(d.observe("a chair by the window"), 0.0);
    }

    #[test]
    fn disjoint_observation_is_fully_novel() {
        let mut d = NoveltyDetector::new();
        d.observe("a chair by the window");
        assert_eq!(d.observe("bright red balloon overhead"), 1.0);
    }

    #[test]
    fn empty_texts_fall_back_to_half() {
        let mut d = NoveltyDetector::new();
        d.observe("");
        assert_eq!(d.observe("   "), 0.5);
    }

    #[test]
    fn repeated_text_is_monotonically_non_increasing() {
        let mut d = NoveltyDetector::new();
        d.observe("a cat sleeps on a sofa");
        d.observe("the lamp flickers in the corner");
        let mut last = f64::MAX;
        for _ in 0..8 {
            let n = d.observe("a quiet room with a closed door");
            assert!(n <= last + 1e-12, "novelty rose from {last} to {n}");
            last = n;
        }
        assert!(last < 1e-12);
    }

    #[test]
    fn compares_only_against_last_three() {
        let mut d = NoveltyDetector::new();
        d.observe("alpha beta");
        d.observe("gamma delta");
        d.observe("gamma delta");
        d.observe("gamma delta");
        // "alpha beta" has fallen out of the comparison window.
        assert_eq!(d.observe("gamma delta"), 0.0);
    }

    #[test]
    fn scene_tracker_categorises_change() {
        let mut t = SceneTracker::new();
        let (m, c) = t.track("a chair by the window");
        assert_eq!(m, 0.0);
        assert_eq!(c, SceneChange::Same);

        let (_, c) = t.track("a chair by the window");
        assert_eq!(c, SceneChange::Same);

        let (m, c) = t.track("crowded street full of cars");
        assert_eq!(m, 1.0);
        assert_eq!(c, SceneChange::MajorShift);
        assert!(c.resets_static());
    }

    #[test]
    fn magnitude_bands() {
        assert_eq!(SceneChange::from_magnitude(0.1), SceneChange::Same);
        assert_eq!(SceneChange::from_magnitude(0.3), SceneChange::Subtle);
        assert_eq!(SceneChange::from_magnitude(0.5), SceneChange::Significant);
        assert_eq!(SceneChange::from_magnitude(0.71), SceneChange::MajorShift);
        assert!(!SceneChange::Subtle.resets_static());
    }
}
