//! The perception cycle runner.
//!
//! One cycle turns an [`Observation`] into a committed response:
//!
//! 1. **Perceive**: novelty, scene change, focus signals
//! 2. **Decide**: a focus mode, then a compressed context bundle
//! 3. **Generate**: one call to the [`Generator`], plus at most one
//!    fresh-angle retry when the reply is repetitive
//! 4. **Feel**: mood update, memory feed, and on schedule a reflection
//!    and a self-model pass
//! 5. **Commit**: the working copy replaces the session state in one write
//!
//! Every cycle mutates a private clone of [`SessionState`]. A timeout,
//! generator failure, cancellation, or stale version throws the clone away,
//! so a skipped cycle leaves no trace and readers never see half an update.
//!
//! At most one cycle is in flight. A second caller gets [`CycleError::Busy`]
//! instead of queueing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reverie_config::AppConfig;
use reverie_core::{
    DomainEvent, Error, EventBus, GenerationError, GenerationRequest, Generator, MemoryProvider,
    MoodSnapshot, Observation, PersistenceError,
};
use reverie_memory::{PersistedState, SelfAnalysis, SessionMemory, StateFile};
use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::behavior::BehaviorState;
use crate::compressor::ContextCompressor;
use crate::focus::{FocusDecision, FocusEngine, FocusInput, FocusSignals, FocusSummary};
use crate::mood::MoodState;
use crate::novelty::{NoveltyDetector, SceneTracker};
use crate::reflection::{ReflectionEvent, ReflectionScheduler, extract_mood_delta};
use crate::render::{
    ReflectionRequest, SELF_MODEL_OBSERVATIONS, render_cycle, render_retry, render_self_model,
};
use crate::repetition::RepetitionGuard;

/// Perceptions scanned for familiar keywords each cycle.
const FAMILIARITY_PERCEPTIONS: usize = 3;

/// Strong beliefs listed in a status report.
const STATUS_BELIEFS: usize = 5;

/// Rejections surfaced to callers of the runner.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CycleError {
    #[error("A cycle is already in flight")]
    Busy,
}

/// Everything one session accumulates.
///
/// Constructed once at session start (or from a persisted snapshot) and
/// replaced whole on every committed cycle.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub session_start: DateTime<Utc>,
    pub mood: MoodState,
    pub novelty: NoveltyDetector,
    pub scene: SceneTracker,
    pub focus: FocusEngine,
    pub memory: SessionMemory,
    pub reflection: ReflectionScheduler,
    /// Committed responses, oldest first.
    pub recent_responses: VecDeque<String>,
    pub processed_cycles: u64,
    /// Whether the clocks have been pinned to an observation timestamp.
    clock_anchored: bool,
}

impl SessionState {
    /// A fresh session starting at `now`.
    pub fn new(config: &AppConfig, now: DateTime<Utc>) -> Self {
        Self::from_persisted(
            config,
            &PersistedState {
                session_start: now,
                ..Default::default()
            },
            now,
        )
    }

    /// Restore a session from its persisted snapshot.
    pub fn from_persisted(config: &AppConfig, state: &PersistedState, now: DateTime<Utc>) -> Self {
        Self {
            session_id: state.session_id.clone(),
            session_start: state.session_start,
            mood: MoodState::with_vector(config.mood.clone(), state.mood_vector),
            novelty: NoveltyDetector::new(),
            scene: SceneTracker::new(),
            focus: FocusEngine::with_session_start(config.focus.clone(), state.session_start, now),
            memory: SessionMemory::from_persisted(&config.memory, state),
            reflection: ReflectionScheduler::new(
                &config.reflection,
                state.session_start,
                state.last_reflection_timestamp,
            ),
            recent_responses: VecDeque::new(),
            processed_cycles: state.processed_cycles,
            clock_anchored: false,
        }
    }

    /// Pin the session clocks to the first observation timestamp seen.
    ///
    /// Construction time is wall clock; every later comparison uses
    /// observation time. A fresh session restarts all its anchors here, a
    /// restored one only its scene and focus clocks.
    fn anchor_clocks(&mut self, now: DateTime<Utc>) {
        if self.clock_anchored {
            return;
        }
        if self.processed_cycles == 0 {
            self.session_start = now;
            self.focus.restart_session_at(now);
            self.reflection.reanchor(now);
        } else {
            self.focus.anchor_at(now);
        }
        self.clock_anchored = true;
    }

    /// The persistable snapshot of this session.
    pub fn to_persisted(&self) -> PersistedState {
        let mut state = PersistedState {
            session_id: self.session_id.clone(),
            mood_vector: self.mood.vector(),
            last_reflection_timestamp: self.reflection.last_fired(),
            session_start: self.session_start,
            processed_cycles: self.processed_cycles,
            ..Default::default()
        };
        self.memory.write_to(&mut state);
        state
    }
}

/// How a cycle ended.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The cycle's working state replaced the session state.
    Committed(Box<CycleReport>),
    /// The generator timed out or failed; nothing was committed.
    Skipped { version: u64, reason: String },
    /// A newer cycle or a state reload superseded this one.
    Stale { version: u64, current_version: u64 },
    /// [`CycleRunner::cancel`] abandoned the pending generator call.
    Cancelled { version: u64 },
}

impl CycleOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }

    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            Self::Committed(report) => Some(report),
            _ => None,
        }
    }
}

/// What a committed cycle decided and produced.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub version: u64,
    /// The decision the final response was generated under.
    pub decision: FocusDecision,
    pub response: String,
    /// Whether the fresh-angle retry was issued.
    pub retried: bool,
    pub mood: MoodSnapshot,
    pub reflection: Option<ReflectionEvent>,
}

/// Point-in-time view of a session for status reporters.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub session_id: String,
    pub mood: MoodSnapshot,
    pub behavior: BehaviorState,
    pub focus: FocusSummary,
    pub observation_count: usize,
    pub belief_count: usize,
    pub strong_beliefs: Vec<(String, f64)>,
    pub identity: String,
    pub processed_cycles: u64,
    pub last_reflection: Option<DateTime<Utc>>,
    pub next_reflection_due: Option<DateTime<Utc>>,
}

/// A reserved slot: the gate permit plus the cycle's version and token.
struct CycleTicket {
    version: u64,
    token: CancellationToken,
    _permit: OwnedSemaphorePermit,
}

enum Reply {
    Text(String),
    Failed(GenerationError),
    Cancelled,
}

/// Drives perception cycles against a generator and owns the session state.
pub struct CycleRunner {
    generator: Arc<dyn Generator>,
    config: AppConfig,
    event_bus: Arc<EventBus>,
    state: RwLock<SessionState>,
    gate: Arc<Semaphore>,
    version: AtomicU64,
    active: Mutex<CancellationToken>,
    compressor: ContextCompressor,
    guard: RepetitionGuard,
}

impl CycleRunner {
    /// A runner for a fresh session starting now.
    pub fn new(generator: Arc<dyn Generator>, config: AppConfig, event_bus: Arc<EventBus>) -> Self {
        let state = SessionState::new(&config, Utc::now());
        Self::with_state(generator, config, event_bus, state)
    }

    /// A runner restored from a state file; falls back to a fresh session.
    pub fn from_state_file(
        generator: Arc<dyn Generator>,
        config: AppConfig,
        event_bus: Arc<EventBus>,
        file: &StateFile,
    ) -> Self {
        let persisted = file.load_or_default();
        let state = SessionState::from_persisted(&config, &persisted, Utc::now());
        Self::with_state(generator, config, event_bus, state)
    }

    pub fn with_state(
        generator: Arc<dyn Generator>,
        config: AppConfig,
        event_bus: Arc<EventBus>,
        state: SessionState,
    ) -> Self {
        let guard = RepetitionGuard::new(config.repetition.clone());
        Self {
            generator,
            config,
            event_bus,
            state: RwLock::new(state),
            gate: Arc::new(Semaphore::new(1)),
            version: AtomicU64::new(0),
            active: Mutex::new(CancellationToken::new()),
            compressor: ContextCompressor::new(),
            guard,
        }
    }

    /// A consistent copy of the committed session state.
    pub fn snapshot(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The latest cycle version handed out.
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Run one cycle to completion.
    pub async fn run_cycle(&self, observation: Observation) -> Result<CycleOutcome, CycleError> {
        let ticket = self.begin()?;
        Ok(self.execute(ticket, observation).await)
    }

    /// Reserve the slot now and run the cycle on a background task.
    ///
    /// The slot is taken before this returns, so a following call sees
    /// [`CycleError::Busy`] even if the task has not started yet.
    pub fn spawn_cycle(
        self: &Arc<Self>,
        observation: Observation,
    ) -> Result<JoinHandle<CycleOutcome>, CycleError> {
        let ticket = self.begin()?;
        let runner = Arc::clone(self);
        Ok(tokio::spawn(async move {
            runner.execute(ticket, observation).await
        }))
    }

    /// Abandon the in-flight cycle, if any.
    ///
    /// Its pending generator call is dropped and its result can never commit.
    pub fn cancel(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    fn begin(&self) -> Result<CycleTicket, CycleError> {
        let permit = Arc::clone(&self.gate)
            .try_acquire_owned()
            .map_err(|_| CycleError::Busy)?;
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();
        Ok(CycleTicket {
            version,
            token,
            _permit: permit,
        })
    }

    async fn execute(&self, ticket: CycleTicket, observation: Observation) -> CycleOutcome {
        let version = ticket.version;
        let now = observation.timestamp;
        let mut work = self.snapshot();
        work.anchor_clocks(now);

        // ── Perceive ──
        let novelty = work.novelty.observe(&observation.text);
        let (magnitude, change) = work.scene.track(&observation.text);
        let scene_changed = observation.scene_changed || change.resets_static();
        work.memory
            .remember(observation.text.clone(), observation.confidence, now);

        let perceptions = work.novelty.recent(FAMILIARITY_PERCEPTIONS);
        let signals = work.focus.analyze(
            now,
            &FocusInput {
                visual_novelty: novelty,
                mood: work.mood.vector(),
                perceptions: &perceptions,
                scene_changed,
            },
        );
        debug!(
            version,
            novelty,
            magnitude,
            change = %change,
            static_duration = signals.static_duration,
            familiarity = signals.familiarity,
            "Perceived"
        );

        // ── Decide ──
        let mut decision = work.focus.decide(now, &signals);
        self.publish_focus(version, &decision, now);

        let bundle = self
            .compressor
            .select(&decision, &work.mood.vector(), &work.memory);
        let request = render_cycle(&bundle, observation.image_ref.clone());

        // ── Generate ──
        let mut response = match self.generate(request, &ticket.token).await {
            Reply::Text(text) => text,
            Reply::Failed(e) => return self.skip(version, e),
            Reply::Cancelled => return self.cancelled(version),
        };

        let priors: Vec<String> = work.recent_responses.iter().cloned().collect();
        let check = self.guard.check(&response, &priors);
        let mut retried = false;
        if check.is_repetitive() {
            info!(
                version,
                similarity = check.similarity_count,
                pattern = check.pattern_match,
                "Repetitive response, retrying from a fresh angle"
            );
            self.event_bus.publish(DomainEvent::RepetitionDetected {
                version,
                similarity_count: check.similarity_count,
                timestamp: now,
            });

            decision = work.focus.shift_for_repetition(now, &signals);
            self.publish_focus(version, &decision, now);
            let bundle = self
                .compressor
                .select(&decision, &work.mood.vector(), &work.memory);
            let retry = render_retry(
                &bundle,
                &self.guard.fresh_angle_directive(version),
                observation.image_ref.clone(),
            );
            retried = true;

            match self.generate(retry, &ticket.token).await {
                Reply::Text(text) => {
                    if self.guard.check(&text, &priors).is_repetitive() {
                        warn!(version, "{}", Error::RepetitionLoopExhausted { attempts: 1 });
                    }
                    response = text;
                }
                Reply::Failed(e) => {
                    warn!(version, error = %e, "Fresh-angle retry failed, keeping first response");
                }
                Reply::Cancelled => return self.cancelled(version),
            }
        }

        // ── Feel ──
        work.mood.update_from_text(&response);
        work.memory.absorb_response(&response, now);
        work.recent_responses.push_back(response.clone());
        let keep = self
            .config
            .repetition
            .prior_window
            .max(self.config.reflection.context_responses)
            .max(1);
        while work.recent_responses.len() > keep {
            work.recent_responses.pop_front();
        }
        work.processed_cycles += 1;

        let reflection = if work.reflection.is_due(now) {
            match self.reflect(&mut work, now, &signals, &ticket.token).await {
                Some(event) => event,
                None => return self.cancelled(version),
            }
        } else {
            None
        };

        if self.self_model_due(&work) && !self.update_self_model(&mut work, &ticket.token).await {
            return self.cancelled(version);
        }

        // ── Commit ──
        let mood = work.mood.snapshot();
        {
            let mut committed = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let current_version = self.version.load(Ordering::SeqCst);
            if current_version != version {
                drop(committed);
                info!(version, current_version, "Dropping stale cycle result");
                self.event_bus.publish(DomainEvent::CycleDropped {
                    version,
                    current_version,
                    timestamp: Utc::now(),
                });
                return CycleOutcome::Stale {
                    version,
                    current_version,
                };
            }
            *committed = work;
        }

        self.event_bus.publish(DomainEvent::MoodUpdated {
            valence: mood.valence,
            arousal: mood.arousal,
            clarity: mood.clarity,
            descriptor: mood.descriptor.clone(),
            timestamp: now,
        });
        info!(
            version,
            mode = %decision.mode,
            reason = %decision.reason,
            mood = %mood.descriptor,
            retried,
            "Cycle committed"
        );

        CycleOutcome::Committed(Box::new(CycleReport {
            version,
            decision,
            response,
            retried,
            mood,
            reflection,
        }))
    }

    /// Run the reflection pass on the working state.
    ///
    /// Returns `None` when cancelled, `Some(None)` when the generator failed.
    async fn reflect(
        &self,
        work: &mut SessionState,
        now: DateTime<Utc>,
        signals: &FocusSignals,
        token: &CancellationToken,
    ) -> Option<Option<ReflectionEvent>> {
        // Marked on the attempt so a failing generator cannot retrigger it.
        work.reflection.mark_fired(now);

        let responses: Vec<String> = work.recent_responses.iter().cloned().collect();
        let request = ReflectionRequest::new(
            work.mood.describe(),
            &responses,
            self.config.reflection.context_responses,
            signals.session_duration,
        )
        .render();

        let text = match self.generate(request, token).await {
            Reply::Text(text) => text,
            Reply::Failed(e) => {
                warn!(error = %e, "Reflection generation failed");
                return Some(None);
            }
            Reply::Cancelled => return None,
        };

        let delta = match extract_mood_delta(&text) {
            Ok(delta) => {
                work.mood.update_from_reflection(delta, &text);
                Some(delta)
            }
            Err(e) => {
                debug!("{e}");
                None
            }
        };
        work.memory
            .remember(text.clone(), self.config.reflection.observation_weight, now);

        info!(delta = ?delta, mood = work.mood.describe(), "Reflection completed");
        self.event_bus.publish(DomainEvent::ReflectionCompleted {
            delta,
            timestamp: now,
        });

        Some(Some(ReflectionEvent {
            timestamp: now,
            generated_text: text,
            extracted_mood_delta: delta,
        }))
    }

    fn self_model_due(&self, work: &SessionState) -> bool {
        let cfg = &self.config.self_model;
        cfg.enabled
            && cfg.every_cycles > 0
            && work.processed_cycles % cfg.every_cycles == 0
            && work.memory.observation_count() >= cfg.min_observations
    }

    /// Returns `false` only when cancelled. Failures are logged and ignored.
    async fn update_self_model(&self, work: &mut SessionState, token: &CancellationToken) -> bool {
        let recent = work
            .memory
            .recent_observations(SELF_MODEL_OBSERVATIONS);
        match self.generate(render_self_model(&recent), token).await {
            Reply::Text(text) => {
                let analysis = SelfAnalysis::parse(&text);
                if analysis.is_empty() {
                    debug!("Self-analysis reply had no recognised sections");
                } else {
                    work.memory.apply_self_analysis(analysis);
                    debug!(identity = %work.memory.identity_summary(), "Self-model updated");
                }
                true
            }
            Reply::Failed(e) => {
                warn!(error = %e, "Self-model generation failed");
                true
            }
            Reply::Cancelled => false,
        }
    }

    async fn generate(&self, request: GenerationRequest, token: &CancellationToken) -> Reply {
        let secs = self.config.generator.timeout_secs;
        tokio::select! {
            _ = token.cancelled() => Reply::Cancelled,
            result = tokio::time::timeout(Duration::from_secs(secs), self.generator.generate(request)) => {
                match result {
                    Ok(Ok(response)) if response.text.trim().is_empty() => {
                        Reply::Failed(GenerationError::Failed("empty response".into()))
                    }
                    Ok(Ok(response)) => Reply::Text(response.text.trim().to_string()),
                    Ok(Err(e)) => Reply::Failed(e),
                    Err(_) => Reply::Failed(GenerationError::Timeout(format!("no response within {secs}s"))),
                }
            }
        }
    }

    fn publish_focus(&self, version: u64, decision: &FocusDecision, now: DateTime<Utc>) {
        info!(
            version,
            mode = %decision.mode,
            reason = %decision.reason,
            compression = %decision.compression_level,
            "Focus selected"
        );
        self.event_bus.publish(DomainEvent::FocusSelected {
            version,
            mode: decision.mode,
            reason: decision.reason.to_string(),
            timestamp: now,
        });
    }

    fn skip(&self, version: u64, error: GenerationError) -> CycleOutcome {
        let reason = error.to_string();
        warn!(version, timeout = error.is_timeout(), "Skipping cycle: {reason}");
        self.event_bus.publish(DomainEvent::CycleSkipped {
            version,
            reason: reason.clone(),
            timestamp: Utc::now(),
        });
        CycleOutcome::Skipped { version, reason }
    }

    fn cancelled(&self, version: u64) -> CycleOutcome {
        info!(version, "Cycle cancelled");
        CycleOutcome::Cancelled { version }
    }

    /// A consistent status view of the committed state.
    pub fn status(&self) -> StatusReport {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mood = state.mood.snapshot();
        StatusReport {
            session_id: state.session_id.clone(),
            behavior: BehaviorState::from_snapshot(&mood),
            mood,
            focus: state.focus.summary(),
            observation_count: state.memory.observation_count(),
            belief_count: state.memory.beliefs().len(),
            strong_beliefs: state.memory.beliefs().strongest(STATUS_BELIEFS),
            identity: state.memory.identity_summary(),
            processed_cycles: state.processed_cycles,
            last_reflection: state.reflection.last_fired(),
            next_reflection_due: state.reflection.next_due(),
        }
    }

    /// Write the committed state to `file`. Safe to call repeatedly.
    pub fn save_state(&self, file: &StateFile) -> Result<(), PersistenceError> {
        let mut persisted = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .to_persisted();
        let now = Utc::now();
        persisted.saved_at = Some(now);
        file.save(&persisted)?;
        self.event_bus.publish(DomainEvent::StateSaved {
            path: file.path().display().to_string(),
            timestamp: now,
        });
        Ok(())
    }

    /// Replace the session with what `file` holds (or a fresh session).
    ///
    /// Any cycle still in flight becomes stale and will not commit.
    pub fn load_state(&self, file: &StateFile) {
        let persisted = file.load_or_default();
        let restored = SessionState::from_persisted(&self.config, &persisted, Utc::now());
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        self.version.fetch_add(1, Ordering::SeqCst);
        *state = restored;
    }
}
