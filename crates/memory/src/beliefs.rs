//! Beliefs (recurring motifs with an accumulated strength) and the motif
//! frequency counter that feeds them.
//!
//! Extraction is deliberately lexical: words longer than three characters
//! that are not stop words, plus adjacent pairs of such words.

use std::collections::BTreeMap;

/// Strength added each time a known motif recurs.
const REINFORCEMENT: f64 = 0.05;

/// Maximum motifs taken from one text.
const MAX_MOTIFS_PER_TEXT: usize = 10;

const STOP_WORDS: &[&str] = &[
    "the", "and", "that", "this", "with", "they", "have", "from", "will", "been", "were", "are",
    "was", "his", "her", "she", "him", "them", "can", "could", "would", "should", "may", "might",
];

/// Mapping motif → strength in `[0, 1]`, bounded in size.
///
/// Invariants after every [`reinforce`](Self::reinforce):
/// - at most `max_beliefs` entries (strongest survive)
/// - no entry below `0.5 × threshold`
#[derive(Debug, Clone, PartialEq)]
pub struct BeliefTable {
    strengths: BTreeMap<String, f64>,
    max_beliefs: usize,
    threshold: f64,
}

impl BeliefTable {
    pub fn new(max_beliefs: usize, threshold: f64) -> Self {
        Self {
            strengths: BTreeMap::new(),
            max_beliefs: max_beliefs.max(1),
            threshold,
        }
    }

    /// Rebuild from persisted entries, re-applying the bounds.
    pub fn from_entries(
        entries: BTreeMap<String, f64>,
        max_beliefs: usize,
        threshold: f64,
    ) -> Self {
        let mut table = Self::new(max_beliefs, threshold);
        table.strengths = entries
            .into_iter()
            .filter(|(_, s)| s.is_finite())
            .map(|(m, s)| (m, s.clamp(0.0, 1.0)))
            .collect();
        table.cleanup();
        table
    }

    /// Strength below which a belief is pruned. New motifs are seeded here.
    pub fn prune_floor(&self) -> f64 {
        self.threshold * 0.5
    }

    /// Record one occurrence of a motif.
    pub fn reinforce(&mut self, motif: &str) {
        let floor = self.prune_floor();
        self.strengths
            .entry(motif.to_string())
            .and_modify(|s| *s = (*s + REINFORCEMENT).min(1.0))
            .or_insert(floor);
        self.cleanup();
    }

    fn cleanup(&mut self) {
        if self.strengths.len() > self.max_beliefs {
            let mut ranked: Vec<(String, f64)> = std::mem::take(&mut self.strengths)
                .into_iter()
                .collect();
            ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            ranked.truncate(self.max_beliefs);
            self.strengths = ranked.into_iter().collect();
        }

        let floor = self.prune_floor();
        self.strengths.retain(|_, s| *s >= floor);
    }

    pub fn strength(&self, motif: &str) -> Option<f64> {
        self.strengths.get(motif).copied()
    }

    /// The `n` strongest beliefs, strongest first.
    pub fn strongest(&self, n: usize) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .strengths
            .iter()
            .map(|(m, s)| (m.clone(), *s))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }

    /// Beliefs whose strength exceeds the threshold.
    pub fn strong_count(&self) -> usize {
        self.strengths.values().filter(|s| **s > self.threshold).count()
    }

    pub fn entries(&self) -> &BTreeMap<String, f64> {
        &self.strengths
    }

    pub fn len(&self) -> usize {
        self.strengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty()
    }
}

/// Distinct motifs tracked when no capacity is configured.
pub const DEFAULT_MOTIF_CAPACITY: usize = 500;

/// Frequency counter over extracted motifs.
///
/// Holds at most `capacity` distinct motifs. On overflow the one-off motifs
/// are forgotten first, then the least frequent.
#[derive(Debug, Clone, PartialEq)]
pub struct MotifCounter {
    counts: BTreeMap<String, u64>,
    capacity: usize,
}

impl Default for MotifCounter {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MOTIF_CAPACITY)
    }
}

impl MotifCounter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            counts: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn from_counts(counts: BTreeMap<String, u64>, capacity: usize) -> Self {
        let mut counter = Self {
            counts,
            capacity: capacity.max(1),
        };
        counter.shrink_to_capacity(None);
        counter
    }

    pub fn add(&mut self, motif: &str) {
        *self.counts.entry(motif.to_string()).or_insert(0) += 1;
        if self.counts.len() > self.capacity {
            self.shrink_to_capacity(Some(motif));
        }
    }

    /// `fresh` is the motif just counted; it outlives the other one-offs.
    fn shrink_to_capacity(&mut self, fresh: Option<&str>) {
        if self.counts.len() <= self.capacity {
            return;
        }
        self.counts
            .retain(|motif, count| *count > 1 || Some(motif.as_str()) == fresh);
        if self.counts.len() > self.capacity {
            self.counts = self.most_common(self.capacity).into_iter().collect();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn count(&self, motif: &str) -> u64 {
        self.counts.get(motif).copied().unwrap_or(0)
    }

    /// The `n` most frequent motifs with their counts, most frequent first.
    pub fn most_common(&self, n: usize) -> Vec<(String, u64)> {
        let mut ranked: Vec<(String, u64)> =
            self.counts.iter().map(|(m, c)| (m.clone(), *c)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Extract up to ten motifs from free text.
pub fn extract_motifs(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .collect();

    let meaningful = |w: &str| w.chars().count() > 3 && !STOP_WORDS.contains(&w);

    let mut motifs: Vec<String> = words
        .iter()
        .filter(|w| meaningful(w))
        .map(|w| w.to_string())
        .collect();

    for pair in words.windows(2) {
        if meaningful(pair[0]) && meaningful(pair[1]) {
            motifs.push(format!("{} {}", pair[0], pair[1]));
        }
    }

    motifs.truncate(MAX_MOTIFS_PER_TEXT);
    motifs
}
