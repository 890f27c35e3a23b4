use std::env;
use std::time::Duration;

pub const DEFAULT_WEBHOOK_URL: &str =
    "https://vbe.alchemis.ai/webhook/c254fc1d-ff3b-40b8-b77e-da491bc55adb";
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 20.0;

/// Settings the relay core needs to reach the webhook.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub webhook_base_url: String,
    pub timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            webhook_base_url: DEFAULT_WEBHOOK_URL.to_string(),
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECONDS),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub environment: String,
    pub relay: RelayConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let webhook_base_url = env::var("GOOGLE_CALENDAR_WEBHOOK_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_WEBHOOK_URL.to_string());

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            relay: RelayConfig {
                webhook_base_url,
                timeout: parse_timeout(env::var("WEBHOOK_TIMEOUT_SECONDS").ok().as_deref()),
            },
        }
    }
}

fn parse_timeout(raw: Option<&str>) -> Duration {
    let Some(raw) = raw else {
        return Duration::from_secs_f64(DEFAULT_TIMEOUT_SECONDS);
    };

    match raw.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f64(secs),
        _ => {
            tracing::warn!(value = %raw, "invalid WEBHOOK_TIMEOUT_SECONDS, using default");
            Duration::from_secs_f64(DEFAULT_TIMEOUT_SECONDS)
        }
    }
}
