use async_trait::async_trait;
use serde_json::json;

use super::Tool;

/// Liveness check that never touches the webhook.
pub struct SayHelloTool;

#[async_trait]
impl Tool for SayHelloTool {
    fn name(&self) -> &'static str {
        "say_hello"
    }

    fn description(&self) -> &'static str {
        "Reply with a greeting to confirm the calendar tools are reachable."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn invoke(&self, _args: serde_json::Value) -> String {
        "Hello from the calendar relay!".to_string()
    }
}
