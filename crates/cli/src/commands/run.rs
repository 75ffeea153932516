//! `reverie run`: one perception cycle per observation line.
//!
//! Each line is either plain text or a JSON `Observation`. State is restored
//! from the state file at start and saved on EOF or Ctrl-C.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reverie_agent::{CycleOutcome, CycleRunner};
use reverie_config::AppConfig;
use reverie_core::{DomainEvent, EventBus, Generator, Observation};
use reverie_memory::StateFile;
use reverie_providers::OllamaGenerator;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub async fn run(
    input: Option<PathBuf>,
    image_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let generator = OllamaGenerator::new(&config.generator)?;
    match generator.health_check().await {
        Ok(true) => info!(url = %config.generator.url, "Generator reachable"),
        Ok(false) | Err(_) => warn!(
            url = %config.generator.url,
            "Generator not reachable yet; cycles will be skipped until it is"
        ),
    }

    let state_file = StateFile::new(config.memory.state_path());
    let event_bus = Arc::new(EventBus::default());
    spawn_event_logger(&event_bus);

    let runner = Arc::new(CycleRunner::from_state_file(
        Arc::new(generator),
        config,
        event_bus,
        &state_file,
    ));

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &input {
        Some(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut lines = reader.lines();

    println!("Reverie is watching. One observation per line; Ctrl-C to stop.\n");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        let Some(mut observation) = parse_observation(&line) else {
            continue;
        };
        if observation.image_ref.is_none() {
            if let Some(dir) = &image_dir {
                observation.image_ref = latest_frame(dir);
            }
        }

        let outcome = tokio::select! {
            outcome = runner.run_cycle(observation) => outcome,
            _ = tokio::signal::ctrl_c() => {
                runner.cancel();
                info!("Interrupted mid-cycle");
                break;
            }
        };

        match outcome {
            Ok(CycleOutcome::Committed(report)) => {
                println!(
                    "[{} · {}] {}\n",
                    report.decision.mode, report.mood.descriptor, report.response
                );
            }
            Ok(other) => debug!(outcome = ?other, "No response this cycle"),
            Err(e) => warn!("{e}"),
        }
    }

    match runner.save_state(&state_file) {
        Ok(()) => info!(path = %state_file.path().display(), "State saved"),
        Err(e) => warn!("Failed to save state: {e}"),
    }

    let status = runner.status();
    println!(
        "Session {}: {} cycles, feeling {} ({})",
        status.session_id, status.processed_cycles, status.mood.descriptor, status.behavior
    );

    Ok(())
}

/// Plain text, or a JSON `Observation` when the line starts with `{`.
///
/// Blank lines and unparsable JSON yield `None`.
pub fn parse_observation(line: &str) -> Option<Observation> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line.starts_with('{') {
        return match serde_json::from_str::<Observation>(line) {
            Ok(observation) => Some(observation),
            Err(e) => {
                warn!("Skipping malformed observation: {e}");
                None
            }
        };
    }
    Some(Observation::new(line))
}

/// The most recently modified image in `dir`.
fn latest_frame(dir: &Path) -> Option<String> {
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .filter_map(|path| {
            let modified = path.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, path))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path.display().to_string())
}

fn spawn_event_logger(bus: &EventBus) {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(missed)) => warn!(missed, "Event logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn log_event(event: &DomainEvent) {
    match event {
        DomainEvent::FocusSelected { version, mode, reason, .. } => {
            debug!(version, mode = %mode, reason = %reason, "event: focus selected");
        }
        DomainEvent::MoodUpdated {
            valence,
            arousal,
            clarity,
            descriptor,
            ..
        } => {
            debug!(valence, arousal, clarity, descriptor = %descriptor, "event: mood updated");
        }
        DomainEvent::RepetitionDetected {
            version,
            similarity_count,
            ..
        } => {
            debug!(version, similarity_count, "event: repetition detected");
        }
        DomainEvent::ReflectionCompleted { delta, .. } => {
            debug!(delta = ?delta, "event: reflection completed");
        }
        DomainEvent::CycleSkipped { version, reason, .. } => {
            debug!(version, reason = %reason, "event: cycle skipped");
        }
        DomainEvent::CycleDropped {
            version,
            current_version,
            ..
        } => {
            debug!(version, current_version, "event: cycle dropped");
        }
        DomainEvent::StateSaved { path, .. } => {
            debug!(path = %path, "event: state saved");
        }
    }
}
