use std::time::Duration;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            user_agent: concat!("radio-bridge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
