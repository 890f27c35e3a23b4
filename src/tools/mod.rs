//! Named operations exposed to the agent host.

pub mod calendar;
pub mod hello;
pub mod registry;

use async_trait::async_trait;
use serde::Serialize;

pub use registry::ToolRegistry;

/// A tool takes JSON arguments and always answers with a string, success or
/// failure alike.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn parameters_schema(&self) -> serde_json::Value;
    async fn invoke(&self, args: serde_json::Value) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}
