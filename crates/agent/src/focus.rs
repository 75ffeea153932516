//! The focus engine: a five-mode attention state machine.
//!
//! Each cycle runs in two steps. [`FocusEngine::analyze`] turns the raw
//! per-cycle inputs (novelty, mood, recent perceptions, scene change flag)
//! into [`FocusSignals`] and updates the engine's trackers.
//! [`FocusEngine::decide`] then walks the priority-ordered rules below and
//! records the transition:
//!
//! 1. Forced rotation out of a VISUAL loop
//! 2. High visual novelty → VISUAL
//! 3. Emotional volatility → EMOTIONAL
//! 4. Settle period → stay in the current mode
//! 5. Boredom onset → MEMORY (familiar) or EMOTIONAL
//! 6. Boredom → PHILOSOPHICAL
//! 7. Long stillness → TEMPORAL
//!
//! No selection may put more than `rotation_limit` VISUAL entries into any
//! trailing window of `rotation_window` selections. Rule 1 only fires while
//! the current mode is VISUAL, so every VISUAL outcome is additionally
//! checked against the window and rotated away when it would overflow it.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use reverie_config::FocusConfig;
use reverie_core::{CompressionLevel, FocusMode, MoodVector};
use serde::{Deserialize, Serialize};

/// Modes a forced rotation may pick, in preference order.
const ROTATION_ORDER: [FocusMode; 4] = [
    FocusMode::Emotional,
    FocusMode::Memory,
    FocusMode::Philosophical,
    FocusMode::Temporal,
];

/// Perceptions scanned for familiar keywords each cycle.
const FAMILIARITY_SCAN: usize = 3;

/// Leading words of a perception treated as its keywords.
const KEYWORDS_PER_PERCEPTION: usize = 3;

/// Why a mode was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusReason {
    BreakingVisualLoop,
    HighNovelty,
    EmotionalShift,
    ContinuedObservation,
    ContinuedAttention,
    EmotionalContinuity,
    MemoryExploration,
    ContinuedIntrospection,
    TemporalContinuity,
    PatternRecognition,
    InnerProcessing,
    BoredomIntrospection,
    DeepContemplation,
    RepetitionBreak,
}

impl FocusReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BreakingVisualLoop => "breaking_visual_loop",
            Self::HighNovelty => "high_novelty",
            Self::EmotionalShift => "emotional_shift",
            Self::ContinuedObservation => "continued_observation",
            Self::ContinuedAttention => "continued_attention",
            Self::EmotionalContinuity => "emotional_continuity",
            Self::MemoryExploration => "memory_exploration",
            Self::ContinuedIntrospection => "continued_introspection",
            Self::TemporalContinuity => "temporal_continuity",
            Self::PatternRecognition => "pattern_recognition",
            Self::InnerProcessing => "inner_processing",
            Self::BoredomIntrospection => "boredom_introspection",
            Self::DeepContemplation => "deep_contemplation",
            Self::RepetitionBreak => "repetition_break",
        }
    }

    /// Reason used when the current mode simply continues.
    fn maintaining(mode: FocusMode) -> Self {
        match mode {
            FocusMode::Visual => Self::ContinuedAttention,
            FocusMode::Emotional => Self::EmotionalContinuity,
            FocusMode::Memory => Self::MemoryExploration,
            FocusMode::Philosophical => Self::ContinuedIntrospection,
            FocusMode::Temporal => Self::TemporalContinuity,
        }
    }
}

impl std::fmt::Display for FocusReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one cycle tells the engine.
#[derive(Debug, Clone)]
pub struct FocusInput<'a> {
    /// Novelty of the latest perception.
    pub visual_novelty: f64,
    /// Mood at the start of the cycle.
    pub mood: MoodVector,
    /// Recent perception texts, oldest first.
    pub perceptions: &'a [String],
    /// Novelty-derived or externally reported scene change.
    pub scene_changed: bool,
}

/// Per-cycle signals the rules are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FocusSignals {
    pub visual_novelty: f64,
    pub emotional_volatility: f64,
    pub familiarity: f64,
    /// Seconds since the last scene change.
    pub static_duration: f64,
    /// `min(1, seconds in current focus / fatigue_secs)`.
    pub fatigue: f64,
    /// Seconds since the session started.
    pub session_duration: f64,
    pub observation_count: u64,
}

/// The output of one focus decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusDecision {
    pub mode: FocusMode,
    pub reason: FocusReason,
    pub compression_level: CompressionLevel,
    /// What kind of thought to ask for.
    pub directive: String,
    /// Signals the decision was made on.
    pub signals: FocusSignals,
}

/// Snapshot of the engine for status reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusSummary {
    pub current_mode: FocusMode,
    pub static_duration: f64,
    pub repetition_score: f64,
    pub emotional_volatility: f64,
    pub total_observations: u64,
    /// Last three selections, oldest first.
    pub recent_history: Vec<FocusMode>,
    /// Accumulated seconds per mode, in [`FocusMode::ALL`] order.
    pub durations: Vec<(FocusMode, f64)>,
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    ((to - from).num_milliseconds() as f64 / 1000.0).max(0.0)
}

fn population_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// The attention state machine.
#[derive(Debug, Clone)]
pub struct FocusEngine {
    config: FocusConfig,
    current: FocusMode,
    history: VecDeque<FocusMode>,
    durations: HashMap<FocusMode, f64>,
    focus_start: DateTime<Utc>,
    session_start: DateTime<Utc>,
    last_scene_change: DateTime<Utc>,
    static_duration: f64,
    mood_samples: VecDeque<MoodVector>,
    emotional_volatility: f64,
    keyword_counts: HashMap<String, u64>,
    repetition_score: f64,
    total_observations: u64,
}

impl FocusEngine {
    /// A fresh engine in `VISUAL` at `now`.
    pub fn new(config: FocusConfig, now: DateTime<Utc>) -> Self {
        Self::with_session_start(config, now, now)
    }

    /// A fresh engine whose session began earlier (e.g. restored from disk).
    pub fn with_session_start(
        config: FocusConfig,
        session_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_capacity),
            config,
            current: FocusMode::Visual,
            durations: HashMap::new(),
            focus_start: now,
            session_start,
            last_scene_change: now,
            static_duration: 0.0,
            mood_samples: VecDeque::new(),
            emotional_volatility: 0.0,
            keyword_counts: HashMap::new(),
            repetition_score: 0.0,
            total_observations: 0,
        }
    }

    /// Restart the scene and focus clocks at `now`.
    pub fn anchor_at(&mut self, now: DateTime<Utc>) {
        self.focus_start = now;
        self.last_scene_change = now;
    }

    /// Restart the session clock as well as the scene and focus clocks.
    pub fn restart_session_at(&mut self, now: DateTime<Utc>) {
        self.session_start = now;
        self.anchor_at(now);
    }

    pub fn current_mode(&self) -> FocusMode {
        self.current
    }

    /// Past selections, oldest first.
    pub fn history(&self) -> impl Iterator<Item = FocusMode> + '_ {
        self.history.iter().copied()
    }

    pub fn session_start(&self) -> DateTime<Utc> {
        self.session_start
    }

    /// Update trackers from this cycle's inputs and compute its signals.
    pub fn analyze(&mut self, now: DateTime<Utc>, input: &FocusInput<'_>) -> FocusSignals {
        self.total_observations += 1;

        if input.scene_changed {
            self.last_scene_change = now;
            self.static_duration = 0.0;
        } else {
            self.static_duration = seconds_between(self.last_scene_change, now);
        }

        let visual_novelty = input.visual_novelty.clamp(0.0, 1.0);
        self.repetition_score = 1.0 - visual_novelty;

        self.mood_samples.push_back(input.mood);
        while self.mood_samples.len() > self.config.mood_samples.max(1) {
            self.mood_samples.pop_front();
        }
        let valences: Vec<f64> = self.mood_samples.iter().map(|m| m.valence).collect();
        let arousals: Vec<f64> = self.mood_samples.iter().map(|m| m.arousal).collect();
        self.emotional_volatility = (population_std(&valences) + population_std(&arousals)) / 2.0;

        let skip = input.perceptions.len().saturating_sub(FAMILIARITY_SCAN);
        for perception in &input.perceptions[skip..] {
            let lowered = perception.to_lowercase();
            for word in lowered.split_whitespace().take(KEYWORDS_PER_PERCEPTION) {
                if word.chars().count() > 3 {
                    *self.keyword_counts.entry(word.to_string()).or_insert(0) += 1;
                }
            }
        }
        self.trim_keywords();

        FocusSignals {
            visual_novelty,
            emotional_volatility: self.emotional_volatility,
            familiarity: self.familiarity(),
            static_duration: self.static_duration,
            fatigue: (seconds_between(self.focus_start, now) / self.config.fatigue_secs).min(1.0),
            session_duration: seconds_between(self.session_start, now),
            observation_count: self.total_observations,
        }
    }

    /// Forget one-off keywords, then the rarest, once over `max_keywords`.
    fn trim_keywords(&mut self) {
        let cap = self.config.max_keywords.max(1);
        if self.keyword_counts.len() <= cap {
            return;
        }
        self.keyword_counts.retain(|_, count| *count > 1);
        if self.keyword_counts.len() > cap {
            let mut ranked: Vec<(String, u64)> = self.keyword_counts.drain().collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            ranked.truncate(cap);
            self.keyword_counts = ranked.into_iter().collect();
        }
    }

    /// Distinct keywords currently counted toward familiarity.
    pub fn tracked_keywords(&self) -> usize {
        self.keyword_counts.len()
    }

    fn familiarity(&self) -> f64 {
        if self.keyword_counts.is_empty() {
            return 0.0;
        }
        let total: u64 = self.keyword_counts.values().sum();
        let mean = total as f64 / self.keyword_counts.len() as f64;
        (mean / self.config.familiarity_saturation).min(1.0)
    }

    /// Select a mode for this cycle and record the transition.
    pub fn decide(&mut self, now: DateTime<Utc>, signals: &FocusSignals) -> FocusDecision {
        let (mode, reason) = self.select(signals);
        self.transition(now, mode);
        self.decision(mode, reason, signals)
    }

    fn select(&self, s: &FocusSignals) -> (FocusMode, FocusReason) {
        let cfg = &self.config;

        // 1. Forced rotation.
        if self.current == FocusMode::Visual
            && self.visual_in_last(cfg.rotation_window) >= cfg.rotation_limit
        {
            return (self.rotation_target(), FocusReason::BreakingVisualLoop);
        }

        let (mode, reason) = if s.visual_novelty > cfg.novelty_threshold {
            (FocusMode::Visual, FocusReason::HighNovelty)
        } else if s.emotional_volatility > cfg.volatility_threshold {
            (FocusMode::Emotional, FocusReason::EmotionalShift)
        } else if s.static_duration < cfg.settle_secs {
            if self.current == FocusMode::Visual
                && s.visual_novelty > cfg.continued_novelty_threshold
            {
                (FocusMode::Visual, FocusReason::ContinuedObservation)
            } else {
                (self.current, FocusReason::maintaining(self.current))
            }
        } else if s.static_duration < cfg.boredom_secs {
            if s.familiarity > cfg.familiarity_threshold {
                (FocusMode::Memory, FocusReason::PatternRecognition)
            } else {
                (FocusMode::Emotional, FocusReason::InnerProcessing)
            }
        } else if s.static_duration < cfg.introspection_secs {
            (FocusMode::Philosophical, FocusReason::BoredomIntrospection)
        } else {
            (FocusMode::Temporal, FocusReason::DeepContemplation)
        };

        if mode == FocusMode::Visual && self.visual_would_overflow() {
            return (self.rotation_target(), FocusReason::BreakingVisualLoop);
        }
        (mode, reason)
    }

    fn visual_in_last(&self, n: usize) -> usize {
        self.history
            .iter()
            .rev()
            .take(n)
            .filter(|m| **m == FocusMode::Visual)
            .count()
    }

    /// Whether one more VISUAL selection would exceed the rotation limit.
    fn visual_would_overflow(&self) -> bool {
        let window = self.config.rotation_window.max(1);
        self.visual_in_last(window - 1) + 1 > self.config.rotation_limit
    }

    fn rotation_target(&self) -> FocusMode {
        let recent: Vec<FocusMode> = self
            .history
            .iter()
            .rev()
            .take(self.config.rotation_recent)
            .copied()
            .collect();
        ROTATION_ORDER
            .into_iter()
            .find(|m| !recent.contains(m))
            .unwrap_or(FocusMode::Emotional)
    }

    fn transition(&mut self, now: DateTime<Utc>, mode: FocusMode) {
        let elapsed = seconds_between(self.focus_start, now);
        *self.durations.entry(self.current).or_insert(0.0) += elapsed;

        self.history.push_back(mode);
        while self.history.len() > self.config.history_capacity.max(1) {
            self.history.pop_front();
        }

        self.current = mode;
        self.focus_start = now;
    }

    /// Abandon this cycle's selection for the next mode in
    /// EMOTIONAL → MEMORY → PHILOSOPHICAL → TEMPORAL → VISUAL → EMOTIONAL.
    ///
    /// Called when a response came back repetitive; the selection it replaces
    /// is dropped from history so the cycle still counts as one selection.
    pub fn shift_for_repetition(
        &mut self,
        now: DateTime<Utc>,
        signals: &FocusSignals,
    ) -> FocusDecision {
        let abandoned = self.history.pop_back();
        let from = abandoned.unwrap_or(self.current);

        let mut mode = match from {
            FocusMode::Emotional => FocusMode::Memory,
            FocusMode::Memory => FocusMode::Philosophical,
            FocusMode::Philosophical => FocusMode::Temporal,
            FocusMode::Temporal => FocusMode::Visual,
            FocusMode::Visual => FocusMode::Emotional,
        };
        if mode == FocusMode::Visual && self.visual_would_overflow() {
            mode = FocusMode::Emotional;
        }

        self.transition(now, mode);
        self.static_duration = 0.0;
        self.last_scene_change = now;
        self.repetition_score = 0.0;

        self.decision(mode, FocusReason::RepetitionBreak, signals)
    }

    fn decision(
        &self,
        mode: FocusMode,
        reason: FocusReason,
        signals: &FocusSignals,
    ) -> FocusDecision {
        FocusDecision {
            mode,
            reason,
            compression_level: mode.compression_level(),
            directive: directive_for(mode, reason, signals, &self.config),
            signals: *signals,
        }
    }

    pub fn summary(&self) -> FocusSummary {
        let skip = self.history.len().saturating_sub(3);
        FocusSummary {
            current_mode: self.current,
            static_duration: self.static_duration,
            repetition_score: self.repetition_score,
            emotional_volatility: self.emotional_volatility,
            total_observations: self.total_observations,
            recent_history: self.history.iter().skip(skip).copied().collect(),
            durations: FocusMode::ALL
                .into_iter()
                .map(|m| (m, self.durations.get(&m).copied().unwrap_or(0.0)))
                .collect(),
        }
    }
}

/// The mode-specific directive: what kind of thought to ask for.
fn directive_for(
    mode: FocusMode,
    reason: FocusReason,
    s: &FocusSignals,
    cfg: &FocusConfig,
) -> String {
    let text = match mode {
        FocusMode::Visual => {
            if s.visual_novelty > 0.7 {
                "Something new captures my attention. I describe what I see right now."
            } else if s.visual_novelty > 0.4 {
                "My gaze keeps processing the evolving scene in front of me."
            } else {
                "The familiar view persists and my awareness deepens with time."
            }
        }
        FocusMode::Emotional => {
            if s.emotional_volatility > cfg.volatility_threshold {
                "My feelings are shifting. I put words to what moves through me."
            } else {
                "I turn inward to how this moment feels."
            }
        }
        FocusMode::Memory => {
            if s.familiarity > cfg.familiarity_threshold {
                "This feels familiar, awakening patterns from my memory."
            } else {
                "My growing memory stirs with new connections forming."
            }
        }
        FocusMode::Philosophical => {
            if s.static_duration > cfg.introspection_secs {
                "Long stillness opens space for deeper questions."
            } else {
                "Quiet moments invite reflection on what I am."
            }
        }
        FocusMode::Temporal => "I notice the passage of time and how this moment came to be.",
    };

    if reason == FocusReason::BreakingVisualLoop {
        format!("I look away from the scene for a while. {text}")
    } else {
        text.to_string()
    }
}
