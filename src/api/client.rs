use std::io::Read;

use reqwest::blocking::Client;
use thiserror::Error;

use super::models::ClientConfig;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Server answered {0}")]
    Status(u16),

    #[error("Timed out connecting to {0}")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Source of remote bytes. Implemented over HTTP here and in memory by tests.
pub trait Fetch: Send + Sync {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>>;
}

/// Blocking HTTP fetcher.
///
/// The underlying `reqwest` client is built per call so it is created and
/// dropped on the download worker, never inside the UI's async runtime.
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    fn client(&self) -> Result<Client> {
        let client = Client::builder()
            .connect_timeout(self.config.connect_timeout)
            // Body reads are bounded by cooperative cancellation, not a deadline.
            .timeout(None::<std::time::Duration>)
            .user_agent(self.config.user_agent.clone())
            .build()?;
        Ok(client)
    }
}

impl Fetch for ApiClient {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>> {
        let response = self.client()?.get(url).send().map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(url.to_string())
            } else {
                ApiError::RequestError(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        Ok(Box::new(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_streams_body() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/beat.mp3")
            .with_status(200)
            .with_body("ID3 fake audio")
            .create();

        let client = ApiClient::new(ClientConfig::default());
        let mut body = String::new();
        client
            .open(&format!("{}/beat.mp3", server.url()))
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();

        assert_eq!(body, "ID3 fake audio");
        mock.assert();
    }

    #[test]
    fn test_open_rejects_error_status() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/missing.wav").with_status(404).create();

        let client = ApiClient::new(ClientConfig::default());
        let err = client
            .open(&format!("{}/missing.wav", server.url()))
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::Status(404)));
    }

    #[test]
    fn test_open_reports_unreachable_host() {
        let client = ApiClient::new(ClientConfig::default());
        let err = client.open("http://127.0.0.1:1/nothing").err().unwrap();
        assert!(matches!(err, ApiError::RequestError(_) | ApiError::Timeout(_)));
    }
}
