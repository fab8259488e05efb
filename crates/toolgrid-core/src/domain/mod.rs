//! Domain types shared across the toolgrid crates.

mod server;
mod tool;

pub use server::{
    ConnectionState, ConnectionType, HealthReport, ServerDefinition, DEFAULT_MAX_RETRIES,
    DEFAULT_TIMEOUT_MS,
};
pub use tool::{ToolDescriptor, ToolEntry, ToolKey, ToolOutcome};
