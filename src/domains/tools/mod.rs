//! Tools domain module.
//!
//! Tools are the MCP-callable operations over the nonprofit data client.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual tool implementations
//! - `handlers.rs` - The `NonprofitTool` trait and shared call/render plumbing
//! - `router.rs` - ToolRouter builder for STDIO transport
//! - `registry.rs` - Tool listing and HTTP dispatch
//! - `error.rs` - Tool-boundary error type
//!
//! ## Adding a New Tool
//!
//! 1. Create a file in `definitions/` with a params struct and a `NonprofitTool` impl
//! 2. Export it in `definitions/mod.rs`
//! 3. Add `route_for::<MyTool, S>` in `router.rs`
//! 4. Add it to the lists and the dispatch match in `registry.rs`

pub mod definitions;
mod error;
mod handlers;
mod registry;
pub mod router;

pub use error::ToolError;
pub use handlers::*;
pub use registry::ToolRegistry;
pub use router::build_tool_router;
