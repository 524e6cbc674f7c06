use std::fmt;

use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::transport::TransportError;

/// Which request of the login handshake was in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    LoginId,
    Password,
    Mfa,
}

impl LoginStep {
    fn hint(self) -> &'static str {
        match self {
            LoginStep::Mfa => ", check MFA code",
            _ => "",
        }
    }
}

impl fmt::Display for LoginStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoginStep::LoginId => "get loginId",
            LoginStep::Password => "send password",
            LoginStep::Mfa => "send MFA",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum FastmailError {
    #[error("{context}: transport error: {source}")]
    Transport {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The provider rejected the bearer credential.
    #[error("unauthorized: access token rejected")]
    Unauthorized,

    #[error("no credentials configured")]
    NotAuthenticated,

    #[error("login flow {step} failed{}: status {status}, detail: '{detail}'", .step.hint())]
    HandshakeRejected {
        step: LoginStep,
        status: u16,
        detail: String,
    },

    /// Login needs a one-time code that was not supplied.
    #[error("mfa required for login")]
    MfaRequired,

    #[error("access token not found in {step} response")]
    AccessTokenNotFound { step: LoginStep },

    #[error("no account ID found in response for {capability}")]
    AccountIdNotFound { capability: String },

    #[error("unexpected {what} count: got {got}, expected {expected}")]
    MethodResponseShape {
        what: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("no items returned")]
    NoItemsReturned,

    #[error("masked emails not destroyed: {}", .ids.join(", "))]
    NotDestroyed { ids: Vec<String> },

    #[error("{context}: unexpected status code {status}, detail: '{detail}'")]
    Api {
        context: &'static str,
        status: u16,
        detail: String,
    },

    #[error("{method} failed with {kind}{}", .description.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Method {
        method: String,
        kind: String,
        description: Option<String>,
    },

    #[error("{context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl FastmailError {
    pub(crate) fn transport(context: &'static str) -> impl FnOnce(TransportError) -> Self {
        move |e| match e {
            TransportError::Cancelled => FastmailError::Cancelled,
            TransportError::Http(source) => FastmailError::Transport { context, source },
        }
    }

    /// True when the caller should run `login` again rather than report a failure.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            FastmailError::Unauthorized | FastmailError::NotAuthenticated
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FastmailError::Transport { .. } | FastmailError::Api { .. } => "httpError",
            FastmailError::Unauthorized | FastmailError::NotAuthenticated => "unauthorized",
            FastmailError::HandshakeRejected { .. } => "loginRejected",
            FastmailError::MfaRequired => "mfaRequired",
            FastmailError::AccessTokenNotFound { .. } => "credentialFlowError",
            FastmailError::AccountIdNotFound { .. } => "accountIdNotFound",
            FastmailError::MethodResponseShape { .. } => "protocolShapeError",
            FastmailError::NoItemsReturned => "noItemsReturned",
            FastmailError::NotDestroyed { .. } => "notDestroyed",
            FastmailError::Method { .. } => "jmapMethodError",
            FastmailError::Json { .. } => "decodeError",
            FastmailError::Cancelled => "cancelled",
        }
    }
}

/// Error object rendered inside the output envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOut {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jmap: Option<serde_json::Value>,
}

impl ErrorOut {
    fn new(kind: &str, message: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            message: message.into(),
            http: None,
            jmap: None,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new("usageError", message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new("configError", message)
    }

    pub fn http(message: impl Into<String>) -> Self {
        Self::new("httpError", message)
    }
}

impl From<FastmailError> for ErrorOut {
    fn from(e: FastmailError) -> Self {
        let message = if e.needs_reauth() {
            "authentication failed; run `fastmask login`".to_string()
        } else {
            e.to_string()
        };
        let mut out = ErrorOut::new(e.kind(), message);

        match &e {
            FastmailError::HandshakeRejected { status, detail, .. }
            | FastmailError::Api { status, detail, .. } => {
                out.http = Some(json!({"status": status, "body": detail}));
            }
            FastmailError::Method {
                method,
                kind,
                description,
            } => {
                out.jmap = Some(json!({
                    "method": method,
                    "type": kind,
                    "description": description,
                }));
            }
            _ => {}
        }

        out
    }
}
