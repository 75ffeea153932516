//! Context compression: per focus mode, select which accumulated facts
//! reach the generator.
//!
//! Selection is pure data. The compressor decides *which* of
//! {identity summary, top beliefs, recent observations, mood descriptor,
//! session time} to surface; turning the resulting [`ContextBundle`] into
//! prompt text is the job of [`crate::render`].
//!
//! | Mode          | Compression | Identity | Beliefs | Observations | Extras          |
//! |---------------|-------------|----------|---------|--------------|-----------------|
//! | VISUAL        | high        | no       | 0       | 1            |                 |
//! | EMOTIONAL     | medium      | yes      | 0       | 2            | mood descriptor |
//! | MEMORY        | medium      | no       | 2       | 2            |                 |
//! | PHILOSOPHICAL | low         | yes      | 2       | 2            |                 |
//! | TEMPORAL      | low         | yes      | 2       | 2            | session time    |
//!
//! The mode-specific directive is always carried.

use reverie_core::{CompressionLevel, FocusMode, MemoryProvider, MoodVector};
use serde::{Deserialize, Serialize};

use crate::focus::{FocusDecision, FocusReason};
use crate::mood::describe;

/// Which fields a mode surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPlan {
    pub identity: bool,
    pub beliefs: usize,
    pub observations: usize,
    pub mood_descriptor: bool,
    pub session_time: bool,
}

impl SelectionPlan {
    pub fn for_mode(mode: FocusMode) -> Self {
        match mode {
            FocusMode::Visual => Self {
                identity: false,
                beliefs: 0,
                observations: 1,
                mood_descriptor: false,
                session_time: false,
            },
            FocusMode::Emotional => Self {
                identity: true,
                beliefs: 0,
                observations: 2,
                mood_descriptor: true,
                session_time: false,
            },
            FocusMode::Memory => Self {
                identity: false,
                beliefs: 2,
                observations: 2,
                mood_descriptor: false,
                session_time: false,
            },
            FocusMode::Philosophical => Self {
                identity: true,
                beliefs: 2,
                observations: 2,
                mood_descriptor: false,
                session_time: false,
            },
            FocusMode::Temporal => Self {
                identity: true,
                beliefs: 2,
                observations: 2,
                mood_descriptor: false,
                session_time: true,
            },
        }
    }
}

/// The selected context for one generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBundle {
    pub mode: FocusMode,
    pub reason: FocusReason,
    pub compression_level: CompressionLevel,
    pub directive: String,
    pub identity: Option<String>,
    pub beliefs: Vec<String>,
    /// Oldest first.
    pub observations: Vec<String>,
    pub mood_descriptor: Option<String>,
    pub session_elapsed_secs: Option<f64>,
    pub metadata: SelectionMetadata,
}

/// What was requested and what memory could actually supply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionMetadata {
    pub fields: Vec<FieldStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub name: String,
    pub requested: usize,
    pub included: usize,
}

impl SelectionMetadata {
    fn record(&mut self, name: &str, requested: usize, included: usize) {
        self.fields.push(FieldStats {
            name: name.to_string(),
            requested,
            included,
        });
    }

    pub fn field(&self, name: &str) -> Option<&FieldStats> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Stateless selector. Create one and reuse it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextCompressor;

impl ContextCompressor {
    pub fn new() -> Self {
        Self
    }

    pub fn select(
        &self,
        decision: &FocusDecision,
        mood: &MoodVector,
        memory: &dyn MemoryProvider,
    ) -> ContextBundle {
        let plan = SelectionPlan::for_mode(decision.mode);
        let mut metadata = SelectionMetadata::default();

        let identity = plan.identity.then(|| memory.identity_summary());
        metadata.record("identity", plan.identity as usize, identity.is_some() as usize);

        let beliefs = if plan.beliefs > 0 {
            memory.top_motifs(plan.beliefs)
        } else {
            Vec::new()
        };
        metadata.record("beliefs", plan.beliefs, beliefs.len());

        let observations = memory.recent_observations(plan.observations);
        metadata.record("observations", plan.observations, observations.len());

        let mood_descriptor = plan.mood_descriptor.then(|| describe(mood).to_string());
        metadata.record(
            "mood_descriptor",
            plan.mood_descriptor as usize,
            mood_descriptor.is_some() as usize,
        );

        let session_elapsed_secs = plan
            .session_time
            .then_some(decision.signals.session_duration);
        metadata.record(
            "session_time",
            plan.session_time as usize,
            session_elapsed_secs.is_some() as usize,
        );

        ContextBundle {
            mode: decision.mode,
            reason: decision.reason,
            compression_level: decision.compression_level,
            directive: decision.directive.clone(),
            identity,
            beliefs,
            observations,
            mood_descriptor,
            session_elapsed_secs,
            metadata,
        }
    }
}
