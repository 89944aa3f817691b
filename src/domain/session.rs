use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use super::AppError;

/// Per-instance session owned by the plugin, persisted through the host state blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub token: Option<String>,
    /// Last credit balance reported by the page. Informational only.
    #[serde(default, skip_serializing)]
    pub credits: Option<String>,
}

impl SessionState {
    pub fn authenticate(&mut self, token: &str, credits: Option<String>) {
        if !token.is_empty() {
            self.token = Some(token.to_string());
        }
        self.credits = credits;
    }

    pub fn to_blob(&self) -> Result<Vec<u8>, AppError> {
        serde_json::to_vec(self).map_err(|e| AppError::Config(e.to_string()))
    }

    /// An empty or unreadable blob restores an empty session.
    pub fn from_blob(blob: &[u8]) -> Self {
        if blob.is_empty() {
            return Self::default();
        }
        serde_json::from_slice(blob).unwrap_or_else(|e| {
            log::warn!("Discarding unreadable session blob: {}", e);
            Self::default()
        })
    }

    pub fn load(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(blob) => Self::from_blob(&blob),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_blob()?)?;
        Ok(())
    }

    /// URL of the web page, telling it a native bridge is present and
    /// forwarding the saved token for auto-login.
    pub fn plugin_page_url(&self, base: &str) -> Result<Url, AppError> {
        let mut url = Url::parse(base).map_err(|e| AppError::Config(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("host", "juce");
            if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
                query.append_pair("token", token);
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate_ignores_empty_token() {
        let mut session = SessionState::default();
        session.authenticate("abc", Some("12".to_string()));
        session.authenticate("", None);
        assert_eq!(session.token.as_deref(), Some("abc"));
        assert_eq!(session.credits, None);
    }

    #[test]
    fn test_blob_keeps_token_only() {
        let mut session = SessionState::default();
        session.authenticate("tok", Some("40".to_string()));
        let restored = SessionState::from_blob(&session.to_blob().unwrap());
        assert_eq!(restored.token.as_deref(), Some("tok"));
        assert_eq!(restored.credits, None);
        assert_eq!(SessionState::from_blob(b"not json"), SessionState::default());
    }

    #[test]
    fn test_plugin_page_url() {
        let mut session = SessionState::default();
        let url = session.plugin_page_url("https://444radio.co.in/plugin").unwrap();
        assert_eq!(url.as_str(), "https://444radio.co.in/plugin?host=juce");

        session.authenticate("a b&c", None);
        let url = session.plugin_page_url("https://444radio.co.in/plugin").unwrap();
        assert_eq!(
            url.as_str(),
            "https://444radio.co.in/plugin?host=juce&token=a+b%26c"
        );
    }
}
