//! Synthdesk Core - engine session controller for the synthdesk IDE
//!
//! Owns the lifecycle of the audio engine, projects cached project documents
//! into the engine's private filesystem and drives the compile/start pipeline
//! for realtime playback and offline rendering.

pub mod cache;
pub mod config;
pub mod engine;
pub mod project;
pub mod services;
pub mod session;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use project::*;
