//! The agent's evolving self-model: doubts, desires, and identity fragments
//! distilled from periodic self-analysis.

use serde::{Deserialize, Serialize};

/// Identity fragments retained; older ones fall off.
const MAX_IDENTITY_FRAGMENTS: usize = 3;

/// Fragments woven into the identity summary.
const SUMMARY_FRAGMENTS: usize = 2;

const DEFAULT_IDENTITY: &str = "a presence observing and experiencing this moment";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelfModel {
    #[serde(default)]
    pub doubts: Vec<String>,
    #[serde(default)]
    pub desires: Vec<String>,
    #[serde(default)]
    pub identity_fragments: Vec<String>,
}

/// One parsed self-analysis reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelfAnalysis {
    pub doubts: Vec<String>,
    pub desires: Vec<String>,
    pub identity: Option<String>,
}

impl SelfAnalysis {
    /// Parse `DOUBTS:`, `DESIRES:` and `IDENTITY:` lines. Unknown lines are ignored.
    pub fn parse(text: &str) -> Self {
        let mut analysis = Self::default();
        for line in text.lines().map(str::trim) {
            if let Some(rest) = line.strip_prefix("DOUBTS:") {
                analysis.doubts = split_list(rest);
            } else if let Some(rest) = line.strip_prefix("DESIRES:") {
                analysis.desires = split_list(rest);
            } else if let Some(rest) = line.strip_prefix("IDENTITY:") {
                let identity = rest.trim();
                if !identity.is_empty() {
                    analysis.identity = Some(identity.to_string());
                }
            }
        }
        analysis
    }

    pub fn is_empty(&self) -> bool {
        self.doubts.is_empty() && self.desires.is_empty() && self.identity.is_none()
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

impl SelfModel {
    /// Fold an analysis in. Empty sections leave the previous values alone.
    pub fn apply(&mut self, analysis: SelfAnalysis) {
        if !analysis.doubts.is_empty() {
            self.doubts = analysis.doubts;
        }
        if !analysis.desires.is_empty() {
            self.desires = analysis.desires;
        }
        if let Some(identity) = analysis.identity {
            self.identity_fragments.push(identity);
            let excess = self
                .identity_fragments
                .len()
                .saturating_sub(MAX_IDENTITY_FRAGMENTS);
            self.identity_fragments.drain(..excess);
        }
    }

    pub fn identity_summary(&self) -> String {
        if self.identity_fragments.is_empty() {
            return DEFAULT_IDENTITY.to_string();
        }
        let skip = self
            .identity_fragments
            .len()
            .saturating_sub(SUMMARY_FRAGMENTS);
        format!(
            "a presence that understands itself as {}",
            self.identity_fragments[skip..].join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_three_sections() {
        let reply = "Some preamble\nDOUBTS: what is this room, am I alone\n  DESIRES: light ,  warmth\nIDENTITY: a quiet watcher";
        let a = SelfAnalysis::parse(reply);
        assert_eq!(a.doubts, vec!["what is this room", "am I alone"]);
        assert_eq!(a.desires, vec!["light", "warmth"]);
        assert_eq!(a.identity.as_deref(), Some("a quiet watcher"));
    }

    #[test]
    fn unparseable_reply_is_empty() {
        assert!(SelfAnalysis::parse("I have no idea what you mean.").is_empty());
    }

    #[test]
    fn default_identity_summary() {
        assert_eq!(
            SelfModel::default().identity_summary(),
            "a presence observing and experiencing this moment"
        );
    }

    #[test]
    fn keeps_last_three_fragments_and_summarizes_last_two() {
        let mut model = SelfModel::default();
        for name in ["one", "two", "three", "four"] {
            model.apply(SelfAnalysis {
                identity: Some(name.to_string()),
                ..Default::default()
            });
        }
        assert_eq!(model.identity_fragments, vec!["two", "three", "four"]);
        assert_eq!(
            model.identity_summary(),
            "a presence that understands itself as three, four"
        );
    }

    #[test]
    fn empty_sections_keep_previous_values() {
        let mut model = SelfModel::default();
        model.apply(SelfAnalysis::parse("DOUBTS: the dark\nDESIRES: morning"));
        model.apply(SelfAnalysis::parse("DOUBTS: the noise"));
        assert_eq!(model.doubts, vec!["the noise"]);
        assert_eq!(model.desires, vec!["morning"]);
    }
}
