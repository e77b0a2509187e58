use reqwest::StatusCode;

/// Errors for client core operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientCoreError {
	/// Request did not complete within the configured timeout.
	#[error("timed out: {0}")]
	Timeout(String),

	/// Connection refused, DNS failure, TLS failure, dropped socket.
	#[error("network error: {0}")]
	Network(String),

	/// HTTP 401/403, on a request or a websocket handshake. Never retried here.
	#[error("authentication failed (status {status}){}", suffix(.message))]
	Auth { status: u16, message: Option<String> },

	/// Any other non-success status, with the server's message when it sent one.
	#[error("server returned {status}{}", suffix(.message))]
	Api { status: u16, message: Option<String> },

	/// Response body could not be decoded.
	#[error("decode error: {0}")]
	Decode(String),

	#[error("config error: {0}")]
	Config(String),

	#[error("{0}")]
	Other(String),
}

impl ClientCoreError {
	pub fn is_auth(&self) -> bool {
		matches!(self, ClientCoreError::Auth { .. })
	}

	pub fn status(&self) -> Option<u16> {
		match self {
			ClientCoreError::Auth { status, .. } | ClientCoreError::Api { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// Structured text from the server, if any.
	pub fn server_message(&self) -> Option<&str> {
		match self {
			ClientCoreError::Auth { message, .. } | ClientCoreError::Api { message, .. } => message.as_deref(),
			_ => None,
		}
	}

	pub(crate) fn from_reqwest(e: reqwest::Error, what: &str) -> Self {
		if e.is_timeout() {
			ClientCoreError::Timeout(format!("{what}: {e}"))
		} else if e.is_decode() {
			ClientCoreError::Decode(format!("{what}: {e}"))
		} else {
			ClientCoreError::Network(format!("{what}: {e}"))
		}
	}

	pub(crate) fn from_status(status: StatusCode, message: Option<String>) -> Self {
		Self::from_status_code(status.as_u16(), message)
	}

	pub(crate) fn from_status_code(status: u16, message: Option<String>) -> Self {
		match status {
			401 | 403 => ClientCoreError::Auth { status, message },
			_ => ClientCoreError::Api { status, message },
		}
	}
}

fn suffix(message: &Option<String>) -> String {
	message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}
