//! Tools the agent can call.

pub mod base;
pub mod executor;
pub mod registry;
pub mod requests;

pub use base::{Tool, ToolError};
pub use executor::{HttpExecutor, HttpRequest, HttpResponse, RequestExecutor};
pub use registry::{ToolRegistry, ToolSummary};
pub use requests::{ReducedTool, RequestsTool, DEFAULT_MAX_RESPONSE_LENGTH};
