//! # Reverie Core
//!
//! Domain types, collaborator traits, and error definitions for the Reverie
//! attention and mood engine. This crate has **no framework dependencies**;
//! it defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator the engine talks to is a trait here:
//! - [`Generator`]: the text/vision generation backend
//! - [`MemoryProvider`]: bounded read access to accumulated memory
//!
//! Implementations live in their respective crates, so the engine can be
//! driven by a real model server in production and by scripted mocks in tests.

pub mod error;
pub mod event;
pub mod focus;
pub mod generation;
pub mod memory;
pub mod mood;
pub mod observation;

// Re-export key types at crate root for ergonomics
pub use error::{Error, GenerationError, PersistenceError, Result};
pub use event::{DomainEvent, EventBus};
pub use focus::{CompressionLevel, FocusMode};
pub use generation::{GenerationRequest, GenerationResponse, Generator, RequestPurpose};
pub use memory::MemoryProvider;
pub use mood::{MoodSnapshot, MoodVector};
pub use observation::{Observation, ObservationRecord};
