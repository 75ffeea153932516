//! Periodic self-reflection: scheduling and mood-delta extraction.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use reverie_config::ReflectionConfig;
use reverie_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// First signed decimal in the reply.
const NUMBER_PATTERN: &str = r"[-+]?\d+(?:\.\d+)?";

static NUMBER: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(NUMBER_PATTERN));

/// Largest magnitude a reflection delta may carry.
const MAX_DELTA: f64 = 3.0;

const POSITIVE_BUCKET: &[&str] = &["positive", "good", "content", "satisfied", "happy"];
const NEGATIVE_BUCKET: &[&str] = &["negative", "troubled", "concerned", "sad", "worried"];
const NEUTRAL_BUCKET: &[&str] = &["neutral", "balanced", "stable"];

/// One completed reflection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionEvent {
    pub timestamp: DateTime<Utc>,
    pub generated_text: String,
    /// `None` when neither a number nor a keyword bucket matched.
    pub extracted_mood_delta: Option<f64>,
}

/// Decides when the next reflection is due.
///
/// The fire time is recorded when a reflection is *attempted*, so a failing
/// generator cannot make it fire more than once per interval.
#[derive(Debug, Clone)]
pub struct ReflectionScheduler {
    enabled: bool,
    interval: Duration,
    anchor: DateTime<Utc>,
    last_fired: Option<DateTime<Utc>>,
}

impl ReflectionScheduler {
    /// `anchor` is when the interval starts counting if nothing has fired yet.
    pub fn new(
        config: &ReflectionConfig,
        anchor: DateTime<Utc>,
        last_fired: Option<DateTime<Utc>>,
    ) -> Self {
        let secs = i64::try_from(config.interval_secs).unwrap_or(i64::MAX);
        Self {
            enabled: config.enabled,
            interval: Duration::try_seconds(secs).unwrap_or(Duration::MAX),
            anchor,
            last_fired,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && now - self.last_fired.unwrap_or(self.anchor) >= self.interval
    }

    /// Restart the first interval at `anchor`.
    pub fn reanchor(&mut self, anchor: DateTime<Utc>) {
        self.anchor = anchor;
    }

    pub fn mark_fired(&mut self, now: DateTime<Utc>) {
        self.last_fired = Some(now);
    }

    pub fn last_fired(&self) -> Option<DateTime<Utc>> {
        self.last_fired
    }

    /// When the next reflection becomes due, if enabled.
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        if !self.enabled {
            return None;
        }
        self.last_fired
            .unwrap_or(self.anchor)
            .checked_add_signed(self.interval)
    }
}

/// Scale a raw rating into a mood delta.
///
/// Values above 3 are read as a 0–10 rating and divided by 10; values in
/// `(1, 3]` are read as 0–10 and remapped via `(v − 5) / 5`.
fn scale_rating(raw: f64) -> f64 {
    let scaled = if raw > 3.0 {
        raw / 10.0
    } else if raw > 1.0 {
        (raw - 5.0) / 5.0
    } else {
        raw
    };
    scaled.clamp(-MAX_DELTA, MAX_DELTA)
}

/// Extract a mood delta from a reflection reply.
///
/// Tries the first number, then the keyword buckets. Fails with
/// [`Error::MalformedReflection`] when neither yields anything.
pub fn extract_mood_delta(text: &str) -> Result<f64> {
    let re = NUMBER
        .as_ref()
        .map_err(|e| Error::Internal(format!("Invalid rating pattern: {e}")))?;

    if let Some(m) = re.find(text) {
        if let Ok(raw) = m.as_str().parse::<f64>() {
            return Ok(scale_rating(raw));
        }
    }

    let lowered = text.to_lowercase();
    let mentions = |bucket: &[&str]| bucket.iter().any(|w| lowered.contains(w));
    if mentions(POSITIVE_BUCKET) {
        Ok(1.0)
    } else if mentions(NEGATIVE_BUCKET) {
        Ok(-1.0)
    } else if mentions(NEUTRAL_BUCKET) {
        Ok(0.0)
    } else {
        Err(Error::MalformedReflection {
            preview: text.chars().take(60).collect(),
        })
    }
}
