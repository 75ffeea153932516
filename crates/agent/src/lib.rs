//! The attention and mood engine: the heart of Reverie.
//!
//! Each perception follows a **Perceive → Decide → Generate → Feel** cycle:
//!
//! 1. **Perceive**: score novelty and scene change ([`novelty`])
//! 2. **Decide**: pick a focus mode ([`focus`]) and compress memory into a
//!    bounded context ([`compressor`]), rendered into a request ([`render`])
//! 3. **Generate**: ask the generator, breaking repetition once ([`repetition`])
//! 4. **Feel**: update the mood vector ([`mood`]) and, on schedule, reflect
//!    ([`reflection`]) and refresh the self-model
//!
//! [`cycle::CycleRunner`] drives the whole thing and owns the session state.

pub mod behavior;
pub mod compressor;
pub mod cycle;
pub mod focus;
pub mod mood;
pub mod novelty;
pub mod reflection;
pub mod render;
pub mod repetition;

pub use behavior::BehaviorState;
pub use compressor::{ContextBundle, ContextCompressor, FieldStats, SelectionMetadata, SelectionPlan};
pub use cycle::{CycleError, CycleOutcome, CycleReport, CycleRunner, SessionState, StatusReport};
pub use focus::{FocusDecision, FocusEngine, FocusInput, FocusReason, FocusSignals, FocusSummary};
pub use mood::{MoodState, describe};
pub use novelty::{NoveltyDetector, SceneChange, SceneTracker};
pub use reflection::{ReflectionEvent, ReflectionScheduler, extract_mood_delta};
pub use render::{ReflectionRequest, render_cycle, render_retry, render_self_model};
pub use repetition::{RepetitionCheck, RepetitionGuard};
