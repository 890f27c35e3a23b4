use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::Instrument;

use super::calendar::{BookAppointmentTool, CheckAvailabilityTool};
use super::hello::SayHelloTool;
use super::{Tool, ToolDefinition};
use crate::services::relay::RelayCore;

/// Name → handler table. Filled once at startup and read-only afterwards.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every calendar tool wired to `relay`.
    pub fn with_relay(relay: Arc<RelayCore>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CheckAvailabilityTool::new(Arc::clone(&relay))));
        registry.register(Arc::new(BookAppointmentTool::new(relay)));
        registry.register(Arc::new(SayHelloTool));
        registry
    }

    /// Later registrations replace earlier ones with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name();
        if self.tools.insert(name, tool).is_some() {
            tracing::warn!(tool = name, "replaced existing tool registration");
        } else {
            tracing::debug!(tool = name, "registered tool");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.parameters_schema(),
            })
            .collect()
    }

    /// Runs a tool inside its own span. `None` when the name is unknown.
    pub async fn invoke(&self, name: &str, args: serde_json::Value) -> Option<String> {
        let tool = self.get(name)?;
        let span = tracing::info_span!(
            "tool",
            tool = tool.name(),
            invocation_id = %uuid::Uuid::new_v4()
        );
        Some(tool.invoke(args).instrument(span).await)
    }
}
