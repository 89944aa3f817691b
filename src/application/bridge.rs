use std::fmt;

use serde_json::{Map, Value};

use crate::{
    application::download_orchestrator::{DownloadOrchestrator, PendingJob, Transition},
    domain::{AppError, DownloadRequest, JobCompletion, OutputFormat, SessionState},
};

/// Pseudo-URL scheme the web page navigates to in order to reach native code.
pub const BRIDGE_SCHEME: &str = "juce-bridge://";

const DEFAULT_STEMS_TITLE: &str = "stems";
const COVER_ART_TITLE: &str = "cover-art";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Ordinary page load, let the browser proceed.
    Allow,
    /// Cancel the navigation and dispatch the decoded payload.
    Bridge(String),
}

/// Navigation hook of the embedded browser.
pub fn intercept_navigation(url: &str) -> Navigation {
    match url.strip_prefix(BRIDGE_SCHEME) {
        Some(encoded) => {
            let spaced = encoded.replace('+', " ");
            let bytes = urlencoding::decode_binary(spaced.as_bytes());
            Navigation::Bridge(String::from_utf8_lossy(&bytes).into_owned())
        }
        None => Navigation::Allow,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeAction {
    /// `import_audio` and `import_loops`.
    ImportAudio(DownloadRequest),
    ImportStems(Vec<DownloadRequest>),
    CoverArt(DownloadRequest),
    Authenticated {
        token: String,
        credits: Option<String>,
    },
}

/// Log form of an action. Never includes the session token.
impl fmt::Display for BridgeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeAction::ImportAudio(request) => {
                write!(f, "import_audio {} ({:?})", request.source_url, request.display_title)
            }
            BridgeAction::ImportStems(requests) => {
                write!(f, "import_stems ({} files)", requests.len())
            }
            BridgeAction::CoverArt(request) => write!(f, "cover_art {}", request.source_url),
            BridgeAction::Authenticated { token, .. } => {
                let shown = if token.is_empty() { "none" } else { "<redacted>" };
                write!(f, "authenticated (token: {})", shown)
            }
        }
    }
}

/// Loose string read of a field: missing or null is empty, scalars are stringified.
fn field(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(value) => value_to_string(value),
        None => String::new(),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn non_empty(value: String, fallback: impl FnOnce() -> String) -> String {
    if value.is_empty() {
        fallback()
    } else {
        value
    }
}

pub fn parse_message(raw: &str) -> Result<BridgeAction, AppError> {
    let json: Value = serde_json::from_str(raw).map_err(|_| AppError::MalformedMessage)?;
    let object = json.as_object().ok_or(AppError::MalformedMessage)?;

    let action = non_empty(field(object, "action"), || field(object, "type"));

    match action.as_str() {
        "import_audio" | "import_loops" => {
            let title = non_empty(field(object, "title"), || field(object, "type"));
            let format = non_empty(field(object, "format"), || "wav".to_string());
            Ok(BridgeAction::ImportAudio(DownloadRequest::new(
                field(object, "url"),
                title,
                OutputFormat::from_bridge(&format),
            )))
        }
        "import_stems" => {
            let title = non_empty(field(object, "title"), || DEFAULT_STEMS_TITLE.to_string());
            let requests: Vec<DownloadRequest> = object
                .get("stems")
                .and_then(Value::as_object)
                .map(|stems| {
                    stems
                        .iter()
                        .map(|(name, url)| {
                            DownloadRequest::new(
                                value_to_string(url),
                                format!("{}-{}", title, name),
                                OutputFormat::Auto,
                            )
                        })
                        .filter(|request| !request.source_url.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            Ok(BridgeAction::ImportStems(requests))
        }
        "cover_art" => Ok(BridgeAction::CoverArt(DownloadRequest::new(
            field(object, "url"),
            COVER_ART_TITLE,
            OutputFormat::Auto,
        ))),
        "authenticated" => {
            let credits = field(object, "credits");
            Ok(BridgeAction::Authenticated {
                token: field(object, "token"),
                credits: (!credits.is_empty()).then_some(credits),
            })
        }
        other => Err(AppError::UnknownAction(other.to_string())),
    }
}

/// What a dispatched message led to.
pub enum Dispatched {
    Download(PendingJob),
    Authenticated,
    Ignored,
}

/// Entry point for bridge traffic. Owns the orchestrator and the session
/// so the browser-hosting component only needs a handle to this.
pub struct BridgeDispatcher {
    orchestrator: DownloadOrchestrator,
    session: SessionState,
}

impl BridgeDispatcher {
    pub fn new(orchestrator: DownloadOrchestrator, session: SessionState) -> Self {
        Self {
            orchestrator,
            session,
        }
    }

    pub fn orchestrator(&self) -> &DownloadOrchestrator {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut DownloadOrchestrator {
        &mut self.orchestrator
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Malformed and unknown messages are dropped; the page reports its own failures.
    pub fn dispatch(&mut self, raw: &str) -> Dispatched {
        let action = match parse_message(raw) {
            Ok(action) => action,
            Err(e) => {
                log::debug!("Dropping bridge message: {}", e);
                return Dispatched::Ignored;
            }
        };
        log::debug!("Bridge action: {}", action);

        let started = match action {
            BridgeAction::ImportAudio(request) | BridgeAction::CoverArt(request) => {
                self.orchestrator.request(request)
            }
            BridgeAction::ImportStems(requests) => self.orchestrator.request_all(requests),
            BridgeAction::Authenticated { token, credits } => {
                log::info!(
                    "Authenticated, {} credits",
                    credits.as_deref().unwrap_or("unknown")
                );
                self.session.authenticate(&token, credits);
                return Dispatched::Authenticated;
            }
        };

        match started {
            Ok(Some(pending)) => Dispatched::Download(pending),
            Ok(None) => Dispatched::Ignored,
            Err(e) => {
                log::error!("Could not start download: {}", e);
                Dispatched::Ignored
            }
        }
    }

    pub fn complete(&mut self, completion: JobCompletion) -> Transition {
        self.orchestrator.complete(completion)
    }
}
