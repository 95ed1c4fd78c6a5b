//! Profile picture generation served over a callable HTTP endpoint and MCP.

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod gemini;
pub mod mcp_server;
pub mod pipeline;
pub mod routes;
pub mod storage;
pub mod tools;

pub use context::AppContext;
pub use error::GenerationError;
