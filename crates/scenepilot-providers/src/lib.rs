//! Text-generation layer for Scenepilot.
//!
//! # Architecture
//!
//! - [`traits::GenerationBackend`] — raw `(prompt, stop) -> chunk stream` capability
//! - [`registry`] — static specs for the supported backends + `create_backend`
//! - [`ollama::OllamaBackend`] — Ollama `/api/generate` (NDJSON)
//! - [`openai::OpenAiBackend`] — OpenAI-style `/completions` (SSE)
//! - [`client::GenerationClient`] — sanitizes, aggregates chunks, retries
//!   transient failures under a [`retry::RetryPolicy`]

pub mod client;
pub mod ollama;
pub mod openai;
pub mod registry;
pub mod retry;
pub mod stream;
pub mod traits;

// Re-export main types for convenience
pub use client::{GenerationClient, GenerationError};
pub use registry::{create_backend, BackendSpec, BACKENDS};
pub use retry::{RetryPolicy, RetryState};
pub use traits::{BackendError, ChunkStream, GenerationBackend};
