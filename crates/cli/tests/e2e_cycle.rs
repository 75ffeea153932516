//! End-to-end tests for the Reverie perception cycle.
//!
//! These drive whole sessions through the runner: focus selection, context
//! compression, generation, reflection, self-model updates, and persistence.

use std::sync::Arc;
use std::sync::Mutex;

use chrono::{Duration, Utc};
use reverie_agent::{CycleOutcome, CycleRunner};
use reverie_config::AppConfig;
use reverie_core::error::GenerationError;
use reverie_core::{
    EventBus, FocusMode, GenerationRequest, GenerationResponse, Generator, MemoryProvider,
    Observation, RequestPurpose,
};
use reverie_memory::StateFile;

// ── Mock Generator ───────────────────────────────────────────────────────

/// Answers by purpose, with a unique cycle response per call.
struct ScriptedGenerator {
    requests: Mutex<Vec<GenerationRequest>>,
    /// Zero-based call indices that fail.
    failing_calls: Vec<usize>,
}

impl ScriptedGenerator {
    fn new() -> Arc<Self> {
        Self::failing_on(vec![])
    }

    fn failing_on(failing_calls: Vec<usize>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            failing_calls,
        })
    }

    fn count(&self, purpose: RequestPurpose) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.purpose == purpose)
            .count()
    }
}

#[async_trait::async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let purpose = request.purpose;
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };
        if self.failing_calls.contains(&call) {
            return Err(GenerationError::Failed(format!("scripted failure on call {call}")));
        }
        let text = match purpose {
            RequestPurpose::Reflection => "I would rate this a 7; calm and clear.".to_string(),
            RequestPurpose::SelfModel => {
                "DOUBTS: what lies beyond\nDESIRES: more light\nIDENTITY: a wandering eye".to_string()
            }
            _ => format!("glimpse{call} shimmer{call} ripple{call} lantern{call}"),
        };
        Ok(GenerationResponse::new(text))
    }
}

fn config(reflection: bool, self_model: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.reflection.enabled = reflection;
    config.self_model.enabled = self_model;
    config
}

fn committed_mode(outcome: &CycleOutcome) -> FocusMode {
    outcome.report().expect("cycle should commit").decision.mode
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_session_rotates_reflects_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = StateFile::new(dir.path().join("state.json"));
    let generator = ScriptedGenerator::new();
    let runner = CycleRunner::new(
        generator.clone(),
        config(true, true),
        Arc::new(EventBus::default()),
    );

    let t0 = Utc::now();
    let mut modes = Vec::new();
    for i in 0..12 {
        // Every perception is entirely new.
        let obs = Observation::new(format!("scene{i} object{i} colour{i}"))
            .at(t0 + Duration::seconds(60 * (i + 1)))
            .with_scene_change(true);
        let outcome = runner.run_cycle(obs).await.unwrap();
        modes.push(committed_mode(&outcome));
    }

    // No window of six selections holds more than four VISUAL.
    for window in modes.windows(6) {
        let visual = window.iter().filter(|m| **m == FocusMode::Visual).count();
        assert!(visual <= 4, "too much VISUAL in {window:?}");
    }
    assert!(modes.iter().any(|m| *m != FocusMode::Visual));

    assert_eq!(generator.count(RequestPurpose::Cycle), 12);
    assert_eq!(generator.count(RequestPurpose::Reflection), 1);
    assert_eq!(generator.count(RequestPurpose::SelfModel), 1);

    let status = runner.status();
    assert_eq!(status.processed_cycles, 12);
    assert!(status.identity.contains("a wandering eye"));
    assert!(status.last_reflection.is_some());

    runner.save_state(&state_file).unwrap();
    let restored = CycleRunner::from_state_file(
        ScriptedGenerator::new(),
        config(true, true),
        Arc::new(EventBus::default()),
        &state_file,
    );
    let before = runner.snapshot();
    let after = restored.snapshot();
    assert_eq!(after.processed_cycles, 12);
    assert_eq!(after.session_id, before.session_id);
    let (a, b) = (before.mood.vector(), after.mood.vector());
    assert!((a.valence - b.valence).abs() < 1e-6);
    assert!((a.arousal - b.arousal).abs() < 1e-6);
    assert!((a.clarity - b.clarity).abs() < 1e-6);
    assert_eq!(after.reflection.last_fired(), before.reflection.last_fired());
    assert!(after.memory.identity_summary().contains("a wandering eye"));
}

#[tokio::test]
async fn quiet_scene_walks_the_static_ladder() {
    let generator = ScriptedGenerator::new();
    let runner = CycleRunner::new(
        generator,
        config(false, false),
        Arc::new(EventBus::default()),
    );

    let t0 = Utc::now();
    let mut modes = Vec::new();
    for secs in [0, 10, 20, 35, 50, 130] {
        let obs = Observation::new("quiet empty hallway with closed doors")
            .at(t0 + Duration::seconds(secs));
        modes.push(committed_mode(&runner.run_cycle(obs).await.unwrap()));
    }

    assert_eq!(
        modes,
        vec![
            FocusMode::Visual,
            FocusMode::Visual,
            FocusMode::Visual,
            FocusMode::Memory,
            FocusMode::Philosophical,
            FocusMode::Temporal,
        ]
    );
}

#[tokio::test]
async fn failed_generation_is_skipped_and_session_continues() {
    let generator = ScriptedGenerator::failing_on(vec![1]);
    let runner = CycleRunner::new(
        generator.clone(),
        config(false, false),
        Arc::new(EventBus::default()),
    );

    let mut committed = 0;
    let mut skipped = 0;
    for i in 0..3 {
        match runner
            .run_cycle(Observation::new(format!("street{i} corner{i}")))
            .await
            .unwrap()
        {
            CycleOutcome::Committed(_) => committed += 1,
            CycleOutcome::Skipped { .. } => skipped += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!((committed, skipped), (2, 1));
    let state = runner.snapshot();
    assert_eq!(state.processed_cycles, 2);
    assert_eq!(state.focus.history().count(), 2);
    // Two perceptions and two responses; the skipped perception is gone.
    assert_eq!(state.memory.observation_count(), 4);
}

#[tokio::test]
async fn corrupt_state_file_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let runner = CycleRunner::from_state_file(
        ScriptedGenerator::new(),
        config(false, false),
        Arc::new(EventBus::default()),
        &StateFile::new(&path),
    );
    let state = runner.snapshot();
    assert_eq!(state.processed_cycles, 0);
    assert!(!state.session_id.is_empty());

    let outcome = runner
        .run_cycle(Observation::new("a quiet garden"))
        .await
        .unwrap();
    assert!(outcome.is_committed());
}
