//! Bounded memory for Reverie.
//!
//! - [`ObservationWindow`]: FIFO of remembered texts (oldest evicted)
//! - [`BeliefTable`] / [`MotifCounter`]: recurring motifs and their strength
//! - [`SelfModel`]: doubts, desires and identity fragments
//! - [`SessionMemory`]: all of the above, implementing [`reverie_core::MemoryProvider`]
//! - [`StateFile`]: best-effort JSON persistence of a [`PersistedState`]

pub mod beliefs;
pub mod self_model;
pub mod session;
pub mod state_file;
pub mod window;

pub use beliefs::{BeliefTable, MotifCounter, extract_motifs};
pub use self_model::{SelfAnalysis, SelfModel};
pub use session::{RESPONSE_CONFIDENCE, SessionMemory};
pub use state_file::{PersistedState, StateFile};
pub use window::ObservationWindow;
