use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// A single field-level complaint returned by the server on a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("HTTP {status}: {message}")]
    HttpStatus {
        status: u16,
        message: String,
        fields: Vec<FieldError>,
    },
    #[error("validation failed ({status}): {message}")]
    Validation {
        status: u16,
        message: String,
        fields: Vec<FieldError>,
    },
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("session expired, log in again")]
    SessionExpired,
    #[error("failed to create playlist ({status}): {message}")]
    PlaylistCreation { status: u16, message: String },
    #[error("a playlist is already being created for transition {transition_id}")]
    PlaylistInFlight { transition_id: i64 },
    #[error("no mood transition available to create a playlist from")]
    MissingTransition,
    #[error("select both a current and a target mood")]
    IncompleteSelection,
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("token storage error: {0}")]
    Storage(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
}

/// Coarse error category, used by views to pick a presentation and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Network,
    Http,
    Validation,
    NotAuthenticated,
    SessionExpired,
    PlaylistCreation,
    Busy,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Network => "network",
            Self::Http => "http",
            Self::Validation => "validation",
            Self::NotAuthenticated => "not-authenticated",
            Self::SessionExpired => "session-expired",
            Self::PlaylistCreation => "playlist",
            Self::Busy => "busy",
            Self::Internal => "internal",
        };
        f.write_str(label)
    }
}

impl Error {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::HttpStatus { .. } => ErrorKind::Http,
            Self::Validation { .. } | Self::MissingTransition | Self::IncompleteSelection => {
                ErrorKind::Validation
            }
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::SessionExpired => ErrorKind::SessionExpired,
            Self::PlaylistCreation { .. } => ErrorKind::PlaylistCreation,
            Self::PlaylistInFlight { .. } => ErrorKind::Busy,
            Self::Decode(_)
            | Self::Encode(_)
            | Self::InvalidUrl { .. }
            | Self::Storage(_)
            | Self::Navigation(_) => ErrorKind::Internal,
        }
    }

    /// Whether re-issuing the same call could succeed without changing input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::PlaylistCreation { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }

    /// HTTP status of a server rejection, if this error came from one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. }
            | Self::Validation { status, .. }
            | Self::PlaylistCreation { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Field-level details, empty unless the server supplied them.
    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        match self {
            Self::HttpStatus { fields, .. } | Self::Validation { fields, .. } => fields,
            _ => &[],
        }
    }

    /// The text a view should show: the server's own message when there is one.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::HttpStatus { message, .. }
            | Self::Validation { message, .. }
            | Self::PlaylistCreation { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Re-tags a server rejection with one of `statuses` as a validation failure.
    pub(crate) fn validation_on(self, statuses: &[u16]) -> Self {
        match self {
            Self::HttpStatus {
                status,
                message,
                fields,
            } if statuses.contains(&status) => Self::Validation {
                status,
                message,
                fields,
            },
            other => other,
        }
    }

    /// Maps a 401 from a bearer-only endpoint onto `NotAuthenticated`.
    pub(crate) fn unauthenticated_on_401(self) -> Self {
        match self {
            Self::HttpStatus { status: 401, .. } => Self::NotAuthenticated,
            other => other,
        }
    }

    pub(crate) fn into_playlist_error(self) -> Self {
        match self {
            Self::HttpStatus {
                status, message, ..
            }
            | Self::Validation {
                status, message, ..
            } => Self::PlaylistCreation { status, message },
            other => other,
        }
    }

    pub(crate) fn is_unauthorized(&self) -> bool {
        matches!(self, Self::HttpStatus { status: 401, .. })
    }

    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body).ok();
        let fields = parsed.as_ref().map(extract_fields).unwrap_or_default();
        let message = parsed
            .as_ref()
            .and_then(extract_message)
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty() && parsed.is_none()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("HTTP error")
                    .to_string()
            });
        Self::HttpStatus {
            status: status.as_u16(),
            message,
            fields,
        }
    }
}

/// A rendered error for views: message plus type tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.message(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<Error> for ErrorReport {
    fn from(err: Error) -> Self {
        Self::from(&err)
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// FastAPI reports either {"detail": "text"} or {"detail": [{"loc": [..], "msg": ".."}]}.
fn extract_message(body: &Value) -> Option<String> {
    if let Some(detail) = body.get("detail") {
        if let Some(text) = detail.as_str() {
            return Some(text.to_string());
        }
        if let Some(items) = detail.as_array() {
            let joined = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("; ");
            if !joined.is_empty() {
                return Some(joined);
            }
        }
    }
    body.get("message")
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn extract_fields(body: &Value) -> Vec<FieldError> {
    let Some(items) = body.get("detail").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let message = item.get("msg")?.as_str()?.to_string();
            let field = item
                .get("loc")
                .and_then(Value::as_array)
                .map(|loc| {
                    loc.iter()
                        .filter(|part| part.as_str() != Some("body"))
                        .map(|part| match part {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(".")
                })
                .unwrap_or_default();
            Some(FieldError { field, message })
        })
        .collect()
}
