//! Session memory: the bounded memory a running session accumulates.

use chrono::{DateTime, Utc};
use reverie_config::MemoryConfig;
use reverie_core::{MemoryProvider, ObservationRecord};

use crate::beliefs::{BeliefTable, MotifCounter, extract_motifs};
use crate::self_model::{SelfAnalysis, SelfModel};
use crate::state_file::PersistedState;
use crate::window::ObservationWindow;

/// Confidence of a committed response when remembered.
pub const RESPONSE_CONFIDENCE: f64 = 0.8;

/// Observation window, beliefs, motifs and self-model for one session.
///
/// Plain data: cloning it is how a cycle gets a private working copy.
#[derive(Debug, Clone)]
pub struct SessionMemory {
    observations: ObservationWindow,
    beliefs: BeliefTable,
    motifs: MotifCounter,
    self_model: SelfModel,
    persisted_observations: usize,
    persisted_motifs: usize,
}

impl SessionMemory {
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            observations: ObservationWindow::new(config.observation_capacity),
            beliefs: BeliefTable::new(config.max_beliefs, config.belief_threshold),
            motifs: MotifCounter::with_capacity(config.max_motifs),
            self_model: SelfModel::default(),
            persisted_observations: config.persisted_observations,
            persisted_motifs: config.persisted_motifs,
        }
    }

    /// Rebuild from a persisted snapshot.
    pub fn from_persisted(config: &MemoryConfig, state: &PersistedState) -> Self {
        let mut memory = Self::new(config);
        for record in &state.observations {
            memory.observations.push(record.clone());
        }
        memory.beliefs = BeliefTable::from_entries(
            state.belief_table.clone(),
            config.max_beliefs,
            config.belief_threshold,
        );
        memory.motifs = MotifCounter::from_counts(state.motif_counts.clone(), config.max_motifs);
        memory.self_model = state.self_model.clone();
        memory
    }

    /// Copy the persistable parts into `state`.
    pub fn write_to(&self, state: &mut PersistedState) {
        state.observations = self.observations.last(self.persisted_observations);
        state.belief_table = self.beliefs.entries().clone();
        state.motif_counts = self
            .motifs
            .most_common(self.persisted_motifs)
            .into_iter()
            .collect();
        state.self_model = self.self_model.clone();
    }

    /// Store a text without feeding motifs.
    pub fn remember(&mut self, text: impl Into<String>, confidence: f64, at: DateTime<Utc>) {
        self.observations.remember(text, confidence, at);
    }

    /// Store a committed response and feed its motifs into the counter and beliefs.
    pub fn absorb_response(&mut self, text: &str, at: DateTime<Utc>) {
        self.remember(text, RESPONSE_CONFIDENCE, at);
        for motif in extract_motifs(text) {
            self.motifs.add(&motif);
            self.beliefs.reinforce(&motif);
        }
    }

    pub fn apply_self_analysis(&mut self, analysis: SelfAnalysis) {
        self.self_model.apply(analysis);
    }

    pub fn recent_records(&self, n: usize) -> Vec<ObservationRecord> {
        self.observations.last(n)
    }

    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    pub fn beliefs(&self) -> &BeliefTable {
        &self.beliefs
    }

    pub fn motifs(&self) -> &MotifCounter {
        &self.motifs
    }

    pub fn self_model(&self) -> &SelfModel {
        &self.self_model
    }
}

impl MemoryProvider for SessionMemory {
    fn recent_observations(&self, n: usize) -> Vec<String> {
        self.observations.recent_texts(n)
    }

    fn top_motifs(&self, n: usize) -> Vec<String> {
        self.motifs.most_common(n).into_iter().map(|(m, _)| m).collect()
    }

    fn identity_summary(&self) -> String {
        self.self_model.identity_summary()
    }
}
