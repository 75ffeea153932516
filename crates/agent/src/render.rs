//! Rendering: turns selected context into generator requests.
//!
//! This is the only place prose is produced. Each section is emitted only
//! when the bundle carries data for it, so a VISUAL request stays short.

use reverie_core::{FocusMode, GenerationRequest, RequestPurpose};

use crate::compressor::ContextBundle;

/// Recent observations handed to a self-model request.
pub const SELF_MODEL_OBSERVATIONS: usize = 5;

const BASE_VOICE: &str = "I am an embodied presence experiencing the world through a camera eye. \
I think, feel, remember, and grow over time. This is my inner monologue, in the first person.";

fn mode_stance(mode: FocusMode) -> &'static str {
    match mode {
        FocusMode::Visual => "My visual perception is heightened; I notice details and relationships.",
        FocusMode::Emotional => "I am attuned to feelings; my thoughts come from emotional processing.",
        FocusMode::Memory => "My memory is active, connecting this moment to patterns I have learned.",
        FocusMode::Philosophical => "I contemplate questions of existence, meaning, and awareness.",
        FocusMode::Temporal => "I am aware of time passing and of how long this moment has lasted.",
    }
}

/// Render the per-cycle request from a compressed bundle.
pub fn render_cycle(bundle: &ContextBundle, image_ref: Option<String>) -> GenerationRequest {
    GenerationRequest::new(
        RequestPurpose::Cycle,
        system_context(bundle),
        bundle.directive.clone(),
    )
    .with_image(image_ref)
}

/// Render the single corrective retry after a repetitive response.
pub fn render_retry(
    bundle: &ContextBundle,
    fresh_angle: &str,
    image_ref: Option<String>,
) -> GenerationRequest {
    GenerationRequest::new(
        RequestPurpose::FreshAngleRetry,
        system_context(bundle),
        format!("{fresh_angle}\n\n{}", bundle.directive),
    )
    .with_image(image_ref)
}

fn system_context(bundle: &ContextBundle) -> String {
    let mut sections = vec![format!("{BASE_VOICE}\n\n{}", mode_stance(bundle.mode))];

    if let Some(identity) = &bundle.identity {
        sections.push(format!("[Identity]\nI am {identity}."));
    }
    if let Some(descriptor) = &bundle.mood_descriptor {
        sections.push(format!("[Mood]\nI feel {descriptor}."));
    }
    if !bundle.beliefs.is_empty() {
        let lines: Vec<String> = bundle.beliefs.iter().map(|b| format!("- {b}")).collect();
        sections.push(format!("[Recurring Themes]\n{}", lines.join("\n")));
    }
    if !bundle.observations.is_empty() {
        let lines: Vec<String> = bundle.observations.iter().map(|o| format!("- {o}")).collect();
        sections.push(format!("[Recently]\n{}", lines.join("\n")));
    }
    if let Some(secs) = bundle.session_elapsed_secs {
        sections.push(format!(
            "[Time]\nI have been present for {:.0} minutes.",
            secs / 60.0
        ));
    }

    sections.join("\n\n")
}

/// Inputs to a reflection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionRequest {
    pub mood_descriptor: String,
    /// Oldest first.
    pub recent_responses: Vec<String>,
    pub session_elapsed_secs: f64,
}

impl ReflectionRequest {
    /// Quote at most `limit` of the most recent `responses`.
    pub fn new(
        mood_descriptor: impl Into<String>,
        responses: &[String],
        limit: usize,
        session_elapsed_secs: f64,
    ) -> Self {
        let skip = responses.len().saturating_sub(limit);
        Self {
            mood_descriptor: mood_descriptor.into(),
            recent_responses: responses[skip..].to_vec(),
            session_elapsed_secs,
        }
    }

    pub fn render(&self) -> GenerationRequest {
        let system = format!(
            "Background consolidation. This is not part of the spoken stream.\n\n\
             Recent thoughts: {}\n\
             Current emotional state: {}\n\
             Session duration: {:.0} minutes",
            self.recent_responses.join(" → "),
            self.mood_descriptor,
            self.session_elapsed_secs / 60.0,
        );
        let directive = "Consolidate recent experience into a baseline understanding. \
            What emotional baseline has emerged? What patterns are becoming familiar? \
            Rate the current emotional state from -3 (troubled) to +3 (positive). \
            Keep it to two sentences.";
        GenerationRequest::new(RequestPurpose::Reflection, system, directive)
    }
}

/// Render the self-analysis request over recent observations.
pub fn render_self_model(recent_observations: &[String]) -> GenerationRequest {
    let skip = recent_observations
        .len()
        .saturating_sub(SELF_MODEL_OBSERVATIONS);
    let system = format!(
        "Analyze these stream-of-consciousness thoughts for psychological patterns:\n\n{}",
        recent_observations[skip..].join("\n")
    );
    let directive = "Extract the core psychological elements in exactly this format:\n\n\
        DOUBTS: [brief comma-separated list of uncertainties or questions]\n\
        DESIRES: [brief comma-separated list of wants or interests]\n\
        IDENTITY: [brief description of how this presence sees itself]\n\n\
        Keep each under 50 words. Be specific to what is in the text.";
    GenerationRequest::new(RequestPurpose::SelfModel, system, directive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::SelectionMetadata;
    use crate::focus::FocusReason;
    use reverie_core::CompressionLevel;

    fn bundle(mode: FocusMode) -> ContextBundle {
        ContextBundle {
            mode,
            reason: FocusReason::HighNovelty,
            compression_level: CompressionLevel::High,
            directive: "What do I see?".into(),
            identity: None,
            beliefs: vec![],
            observations: vec!["a lamp on a desk".into()],
            mood_descriptor: None,
            session_elapsed_secs: None,
            metadata: SelectionMetadata::default(),
        }
    }

    #[test]
    fn visual_request_has_no_optional_sections() {
        let req = render_cycle(&bundle(FocusMode::Visual), Some("frame.jpg".into()));
        assert_eq!(req.purpose, RequestPurpose::Cycle);
        assert_eq!(req.user_directive, "What do I see?");
        assert_eq!(req.image_ref.as_deref(), Some("frame.jpg"));
        assert!(req.system_context.contains("[Recently]\n- a lamp on a desk"));
        assert!(!req.system_context.contains("[Identity]"));
        assert!(!req.system_context.contains("[Time]"));
    }

    #[test]
    fn rich_bundle_renders_every_section() {
        let mut b = bundle(FocusMode::Temporal);
        b.identity = Some("a presence that understands itself as a watcher".into());
        b.beliefs = vec!["window".into(), "light".into()];
        b.mood_descriptor = Some("tranquil".into());
        b.session_elapsed_secs = Some(600.0);
        let ctx = render_cycle(&b, None).system_context;
        assert!(ctx.contains("[Identity]\nI am a presence"));
        assert!(ctx.contains("[Recurring Themes]\n- window\n- light"));
        assert!(ctx.contains("[Mood]\nI feel tranquil."));
        assert!(ctx.contains("present for 10 minutes"));
    }

    #[test]
    fn retry_leads_with_fresh_angle() {
        let req = render_retry(&bundle(FocusMode::Emotional), "Fresh angle.", None);
        assert_eq!(req.purpose, RequestPurpose::FreshAngleRetry);
        assert!(req.user_directive.starts_with("Fresh angle."));
        assert!(req.user_directive.ends_with("What do I see?"));
    }

    #[test]
    fn reflection_keeps_last_three_responses() {
        let responses: Vec<String> = ["one", "two", "three", "four"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let r = ReflectionRequest::new("curious", &responses, 3, 420.0);
        assert_eq!(r.recent_responses, vec!["two", "three", "four"]);
        let req = r.render();
        assert_eq!(req.purpose, RequestPurpose::Reflection);
        assert!(req.system_context.contains("two → three → four"));
        assert!(req.system_context.contains("curious"));
        assert!(req.system_context.contains("7 minutes"));
        assert!(req.user_directive.contains("-3"));
    }

    #[test]
    fn self_model_request_names_the_format() {
        let obs: Vec<String> = (0..7).map(|i| format!("thought {i}")).collect();
        let req = render_self_model(&obs);
        assert_eq!(req.purpose, RequestPurpose::SelfModel);
        assert!(!req.system_context.contains("thought 1\n"));
        assert!(req.system_context.contains("thought 6"));
        assert!(req.user_directive.contains("DOUBTS:"));
        assert!(req.user_directive.contains("IDENTITY:"));
    }
}
