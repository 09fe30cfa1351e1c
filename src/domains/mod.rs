//! Domain modules.
//!
//! `nonprofit` talks to the upstream API; `tools` and `resources` expose it
//! over MCP.

pub mod nonprofit;
pub mod resources;
pub mod tools;
