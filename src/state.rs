use crate::config::AppConfig;
use crate::tools::ToolRegistry;

pub struct AppState {
    pub config: AppConfig,
    pub tools: ToolRegistry,
}
