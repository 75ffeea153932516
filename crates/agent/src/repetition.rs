//! Detection of structurally repetitive responses.

use std::collections::HashSet;

use reverie_config::RepetitionConfig;

/// Openings the generator is known to fall back into.
const KNOWN_PATTERNS: &[&str] = &[
    "i'm sitting on a bed in",
    "as i sit here on the bed",
    "i continue to sit here",
    "sitting on a bed in what",
    "i feel a bit",
    "it feels like",
    "the room",
    "my mind wanders",
];

/// Redirects offered on the fresh-angle retry, picked deterministically.
const REDIRECTS: &[&str] = &[
    "My attention shifts to something I hadn't noticed before.",
    "A different feeling moves through me as I look at this scene.",
    "Something new draws my awareness, beyond what I've been noticing.",
    "A subtle detail catches my interest that I'd overlooked.",
    "My emotional response to this place shifts in an unexpected way.",
    "I discover something in this moment that surprises me.",
];

/// Result of checking one response against recent ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepetitionCheck {
    /// +1 per similar prior opening, +2 more when the leading characters are identical.
    pub similarity_count: u32,
    /// The opening contains one of the known repetitive phrases.
    pub pattern_match: bool,
}

impl RepetitionCheck {
    pub fn is_repetitive(&self) -> bool {
        (self.pattern_match && self.similarity_count >= 1) || self.similarity_count >= 2
    }
}

#[derive(Debug, Clone)]
pub struct RepetitionGuard {
    config: RepetitionConfig,
}

fn prefix(text: &str, chars: usize) -> String {
    text.to_lowercase().chars().take(chars).collect()
}

fn words(text: &str) -> HashSet<&str> {
    text.split_whitespace().collect()
}

impl RepetitionGuard {
    pub fn new(config: RepetitionConfig) -> Self {
        Self { config }
    }

    /// Whether two openings share more than the overlap threshold of their words.
    pub fn openings_overlap(&self, a: &str, b: &str) -> bool {
        let a = prefix(a, self.config.prefix_chars);
        let b = prefix(b, self.config.prefix_chars);
        let (wa, wb) = (words(&a), words(&b));
        if wa.is_empty() || wb.is_empty() {
            return false;
        }
        let overlap = wa.intersection(&wb).count() as f64 / wa.union(&wb).count() as f64;
        overlap > self.config.overlap_threshold
    }

    /// Check `response` against the most recent priors (oldest first).
    pub fn check(&self, response: &str, priors: &[String]) -> RepetitionCheck {
        let opening = prefix(response, self.config.prefix_chars);
        let pattern_match = KNOWN_PATTERNS.iter().any(|p| opening.contains(p));
        let head = prefix(response, self.config.identical_prefix_chars);

        let window_start = priors.len().saturating_sub(self.config.prior_window);
        let mut similarity_count = 0;
        for prior in &priors[window_start..] {
            if self.openings_overlap(response, prior) {
                similarity_count += 1;
            }
            if !head.is_empty() && head == prefix(prior, self.config.identical_prefix_chars) {
                similarity_count += 2;
            }
        }

        RepetitionCheck {
            similarity_count,
            pattern_match,
        }
    }

    /// Directive for the single corrective retry.
    pub fn fresh_angle_directive(&self, attempt_seed: u64) -> String {
        let redirect = REDIRECTS[(attempt_seed % REDIRECTS.len() as u64) as usize];
        format!(
            "My recent thoughts have started the same way. I approach this moment from a fresh angle. {redirect}"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> RepetitionGuard {
        RepetitionGuard::new(RepetitionConfig::default())
    }

    fn priors(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn overlapping_openings_are_flagged_similar() {
        let g = guard();
        assert!(g.openings_overlap(
            "I notice the lamp glowing softly beside the bed",
            "I notice the lamp glowing softly near the door",
        ));
    }

    #[test]
    fn disjoint_openings_are_not_flagged() {
        let g = guard();
        let a = "Sunlight pours through tall windows onto wooden floors";
        let b = "A cat stretches lazily across an old blue sofa";
        assert!(!g.openings_overlap(a, b));
        let check = g.check(a, &priors(&[b]));
        assert_eq!(check.similarity_count, 0);
        assert!(!check.is_repetitive());
    }

    #[test]
    fn identical_opening_counts_double_and_triggers() {
        let g = guard();
        let prior = "I see a small wooden desk with papers scattered everywhere";
        let next = "I see a small wooden desk with papers piled high";
        let check = g.check(next, &priors(&[prior]));
        assert_eq!(check.similarity_count, 3);
        assert!(check.is_repetitive());
    }

    #[test]
    fn known_pattern_needs_one_similar_prior() {
        let g = guard();
        let next = "It feels like the afternoon light is fading slowly";
        let unrelated = priors(&["A truck rumbles past outside on the street"]);
        let check = g.check(next, &unrelated);
        assert!(check.pattern_match);
        assert!(!check.is_repetitive());

        let similar = priors(&["It feels like the afternoon light is getting dim"]);
        assert!(g.check(next, &similar).is_repetitive());
    }

    #[test]
    fn only_the_last_four_priors_count() {
        let g = guard();
        let stale = "I see a small wooden desk with papers scattered everywhere";
        let history = priors(&[stale, "one two", "three four", "five six", "seven eight"]);
        let check = g.check("I see a small wooden desk with a lamp", &history);
        assert_eq!(check.similarity_count, 0);
    }

    #[test]
    fn fresh_angle_directive_varies_by_seed() {
        let g = guard();
        assert_ne!(g.fresh_angle_directive(0), g.fresh_angle_directive(1));
        assert!(g.fresh_angle_directive(7).contains("fresh angle"));
    }
}
