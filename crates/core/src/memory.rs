//! Memory capability: bounded read access to what the agent has accumulated.
//!
//! The focus and compression stages only ever *read* memory through this
//! interface; writes go through the concrete session memory owned by the
//! cycle state.

/// Read-only view of accumulated memory.
pub trait MemoryProvider {
    /// The `n` most recent remembered texts, oldest first.
    fn recent_observations(&self, n: usize) -> Vec<String>;

    /// The `n` most frequent motifs, strongest first.
    fn top_motifs(&self, n: usize) -> Vec<String>;

    /// A one-line summary of how the agent currently understands itself.
    fn identity_summary(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl MemoryProvider for Fixed {
        fn recent_observations(&self, n: usize) -> Vec<String> {
            ["a", "b", "c"].iter().rev().take(n).rev().map(|s| s.to_string()).collect()
        }
        fn top_motifs(&self, n: usize) -> Vec<String> {
            vec!["window".to_string(); n.min(1)]
        }
        fn identity_summary(&self) -> String {
            "a presence".into()
        }
    }

    #[test]
    fn trait_is_object_safe() {
        let m: &dyn MemoryProvider = &Fixed;
        assert_eq!(m.recent_observations(2), vec!["b", "c"]);
        assert_eq!(m.top_motifs(5).len(), 1);
        assert_eq!(m.identity_summary(), "a presence");
    }
}
