//! Scenepilot core — shared building blocks for the agent, providers and CLI.
//!
//! - **sanitize**: the text-repair transform applied to everything the model reads or writes
//! - **apispec**: reduced API description types and the OpenAPI reducer
//! - **observer**: side-channel hooks fired by the agent loop
//! - **config**: JSON config schema, loading and env overrides

pub mod apispec;
pub mod config;
pub mod observer;
pub mod sanitize;
pub mod utils;

pub use apispec::{reduce, HttpMethod, ParamLocation, ReducedEndpoint, ReducedParameter, ReducedSpec};
pub use observer::{AgentObserver, Observers, RunContext, TracingObserver};
pub use sanitize::sanitize;
