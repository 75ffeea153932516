//! Mood state: lexicon-driven updates, reflection feedback, decay, and the
//! qualitative descriptor table.

use reverie_config::MoodConfig;
use reverie_core::{MoodSnapshot, MoodVector};

const POSITIVE_WORDS: &[&str] = &[
    "happy",
    "good",
    "bright",
    "pleasant",
    "interesting",
    "wonderful",
    "fascinating",
    "curious",
];

const NEGATIVE_WORDS: &[&str] = &[
    "sad",
    "dark",
    "confused",
    "worried",
    "unclear",
    "disturbing",
    "bored",
    "frustrated",
];

const INTENSITY_WORDS: &[&str] = &["intense", "strong", "powerful", "energized", "excited", "alert"];
const CALM_WORDS: &[&str] = &["calm", "peaceful", "quiet", "subdued", "tranquil", "still"];
const CLEAR_WORDS: &[&str] = &["clear", "understand", "realize", "recognize", "obvious", "certain"];
const CONFUSED_WORDS: &[&str] = &[
    "confused",
    "uncertain",
    "unclear",
    "puzzled",
    "mysterious",
    "ambiguous",
];

type MoodPredicate = fn(&MoodVector) -> bool;

/// Ordered (predicate, label) pairs. The first match wins; predicates overlap.
pub const DESCRIPTOR_TABLE: &[(MoodPredicate, &str)] = &[
    (|m: &MoodVector| m.valence > 0.6 && m.arousal > 0.7, "energized"),
    (|m: &MoodVector| m.valence > 0.6 && m.arousal < 0.4, "content"),
    (|m: &MoodVector| m.valence > 0.3 && m.arousal > 0.6, "curious"),
    (|m: &MoodVector| m.valence < -0.3 && m.arousal > 0.5, "agitated"),
    (|m: &MoodVector| m.valence < -0.4 && m.arousal < 0.4, "withdrawn/melancholic"),
    (|m: &MoodVector| m.clarity < 0.3, "uncertain"),
    (|m: &MoodVector| m.arousal > 0.7, "focused"),
    (|m: &MoodVector| m.arousal < -0.2, "tranquil"),
    (|m: &MoodVector| m.valence > 0.1, "optimistic"),
];

/// Label used when no rule in [`DESCRIPTOR_TABLE`] matches.
pub const BALANCED: &str = "balanced";

/// Map a vector to its qualitative label.
pub fn describe(mood: &MoodVector) -> &'static str {
    DESCRIPTOR_TABLE
        .iter()
        .find(|(predicate, _)| predicate(mood))
        .map(|(_, label)| *label)
        .unwrap_or(BALANCED)
}

/// Count whole-word occurrences of any lexicon entry.
fn lexicon_hits(words: &[String], lexicon: &[&str]) -> i64 {
    words.iter().filter(|w| lexicon.contains(&w.as_str())).count() as i64
}

fn words_of(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}

/// The session's mood vector plus the rules that move it.
#[derive(Debug, Clone)]
pub struct MoodState {
    vector: MoodVector,
    config: MoodConfig,
}

impl MoodState {
    pub fn new(config: MoodConfig) -> Self {
        Self::with_vector(config, MoodVector::default())
    }

    pub fn with_vector(config: MoodConfig, vector: MoodVector) -> Self {
        Self {
            vector: vector.clamped(),
            config,
        }
    }

    pub fn vector(&self) -> MoodVector {
        self.vector
    }

    pub fn describe(&self) -> &'static str {
        describe(&self.vector)
    }

    pub fn snapshot(&self) -> MoodSnapshot {
        MoodSnapshot {
            valence: self.vector.valence,
            arousal: self.vector.arousal,
            clarity: self.vector.clarity,
            descriptor: self.describe().to_string(),
        }
    }

    /// Nudge the vector from the sentiment of `text`, then decay and clamp.
    pub fn update_from_text(&mut self, text: &str) {
        let cfg = &self.config;
        let words = words_of(text);
        let net = lexicon_hits(&words, POSITIVE_WORDS) - lexicon_hits(&words, NEGATIVE_WORDS);

        let mut next = self.vector;
        if net > 0 {
            next.valence += cfg.valence_step;
            next.arousal += cfg.arousal_step;
        } else if net < 0 {
            next.valence -= cfg.valence_step;
            // Distress is high-arousal.
            next.arousal += cfg.distress_arousal_step;
        }

        if text.chars().count() > cfg.coherent_min_chars && !text.contains("...") {
            next.clarity += cfg.clarity_gain;
        } else {
            next.clarity -= cfg.clarity_loss;
        }

        self.vector = self.decayed(next).clamped();
    }

    /// Blend an external rating into valence and nudge arousal/clarity from
    /// the reflection's wording.
    pub fn update_from_reflection(&mut self, delta: f64, text: &str) {
        let cfg = &self.config;
        let words = words_of(text);
        let intensity = lexicon_hits(&words, INTENSITY_WORDS) - lexicon_hits(&words, CALM_WORDS);
        let lucidity = lexicon_hits(&words, CLEAR_WORDS) - lexicon_hits(&words, CONFUSED_WORDS);

        let mut next = self.vector;
        next.valence += cfg.reflection_blend * (delta - next.valence);
        next.arousal += cfg.reflection_nudge * intensity as f64;
        next.clarity += cfg.reflection_nudge * lucidity as f64;

        self.vector = next.clamped();
    }

    fn decayed(&self, v: MoodVector) -> MoodVector {
        let cfg = &self.config;
        MoodVector {
            valence: v.valence * cfg.valence_decay,
            arousal: v.arousal * cfg.arousal_decay,
            clarity: cfg.clarity_baseline + (v.clarity - cfg.clarity_baseline) * cfg.clarity_decay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_at(v: f64, a: f64, c: f64) -> MoodState {
        MoodState::with_vector(MoodConfig::default(), MoodVector::new(v, a, c))
    }

    #[test]
    fn energized_wins_over_later_overlapping_rules() {
        // (0.7, 0.8, 0.6) also satisfies "curious", "focused" and "optimistic".
        assert_eq!(describe(&MoodVector::new(0.7, 0.8, 0.6)), "energized");
    }

    #[test]
    fn descriptor_table_order() {
        assert_eq!(describe(&MoodVector::new(0.7, 0.1, 0.6)), "content");
        assert_eq!(describe(&MoodVector::new(0.4, 0.65, 0.6)), "curious");
        assert_eq!(describe(&MoodVector::new(-0.5, 0.6, 0.6)), "agitated");
        assert_eq!(describe(&MoodVector::new(-0.5, 0.0, 0.6)), "withdrawn/melancholic");
        assert_eq!(describe(&MoodVector::new(0.0, 0.0, 0.1)), "uncertain");
        assert_eq!(describe(&MoodVector::new(0.0, 0.9, 0.6)), "focused");
        assert_eq!(describe(&MoodVector::new(0.0, -0.5, 0.6)), "tranquil");
        assert_eq!(describe(&MoodVector::new(0.2, 0.0, 0.6)), "optimistic");
        assert_eq!(describe(&MoodVector::new(0.0, 0.0, 0.6)), "balanced");
    }

    #[test]
    fn positive_text_raises_valence_before_decay() {
        let mut mood = state_at(0.0, 0.0, 0.5);
        mood.update_from_text("What a wonderful and bright morning this is");
        let v = mood.vector();
        assert!((v.valence - 0.05 * 0.98).abs() < 1e-12);
        assert!((v.arousal - 0.02 * 0.95).abs() < 1e-12);
        assert!((v.clarity - (0.5 + 0.02 * 0.99)).abs() < 1e-12);
    }

    #[test]
    fn negative_text_lowers_valence_and_raises_arousal() {
        let mut mood = state_at(0.0, 0.0, 0.5);
        mood.update_from_text("dark...");
        let v = mood.vector();
        assert!(v.valence < 0.0);
        assert!(v.arousal > 0.0);
        assert!(v.clarity < 0.5);
    }

    #[test]
    fn neutral_text_decays_toward_baseline() {
        let mut mood = state_at(0.8, 0.8, 0.9);
        mood.update_from_text("A table stands near the wall");
        let v = mood.vector();
        assert!(v.valence < 0.8);
        assert!(v.arousal < 0.8);
    }

    #[test]
    fn reflection_blends_valence_and_nudges() {
        let mut mood = state_at(0.2, 0.0, 0.5);
        mood.update_from_reflection(1.0, "I feel calm and I understand this clearly, clear");
        let v = mood.vector();
        assert!((v.valence - 0.4).abs() < 1e-12);
        assert!((v.arousal + 0.1).abs() < 1e-12);
        // "understand" and "clear" count, "clearly" does not.
        assert!((v.clarity - 0.7).abs() < 1e-12);
    }

    #[test]
    fn components_stay_in_range_under_extreme_updates() {
        let mut mood = state_at(0.99, 0.99, 0.99);
        for i in 0..500 {
            if i % 3 == 0 {
                mood.update_from_reflection(3.0, "intense strong powerful excited alert clear certain");
            } else if i % 3 == 1 {
                mood.update_from_reflection(-3.0, "calm quiet still confused puzzled unclear");
            } else {
                mood.update_from_text("sad dark confused worried bored frustrated");
            }
            assert!(mood.vector().is_in_range(), "out of range at step {i}");
        }
    }

    #[test]
    fn snapshot_carries_descriptor() {
        let snap = state_at(0.7, 0.8, 0.6).snapshot();
        assert_eq!(snap.descriptor, "energized");
        assert_eq!(snap.vector(), MoodVector::new(0.7, 0.8, 0.6));
    }
}
