//! Generator implementations for Reverie.
//!
//! All generators implement the `reverie_core::Generator` trait.

pub mod ollama;

pub use ollama::OllamaGenerator;
