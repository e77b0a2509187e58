use core::fmt;

use stockchat_domain::{ChatEvent, ConnectionState, RoomDescriptor};

use crate::transport::TransportState;

/// Events emitted by the room task for the presentation layer.
#[derive(Clone, PartialEq, Eq)]
pub enum UiEvent {
	Connecting {
		room: RoomDescriptor,
	},
	Connected {
		room: RoomDescriptor,
	},
	Disconnected {
		reason: String,
	},
	Reconnecting {
		attempt: u32,
		next_retry_in_ms: u64,
	},
	/// Events newly visible in the effective timeline, in append order.
	TimelineChanged {
		revision: u64,
		appended: Vec<ChatEvent>,
	},
	ParticipantsChanged {
		count: u64,
	},
	Error {
		message: String,
	},
	ErrorCleared,
	/// A REST send failed; the text is handed back for retry.
	InputRestored {
		text: String,
	},
	/// Credentials were rejected; re-authentication is up to the caller.
	AuthFailed,
}

impl fmt::Debug for UiEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			UiEvent::Connecting { room } => write!(f, "UiEvent::Connecting {{ room: {room} }}"),
			UiEvent::Connected { room } => write!(f, "UiEvent::Connected {{ room: {room} }}"),
			UiEvent::Disconnected { reason } => write!(f, "UiEvent::Disconnected {{ reason: {reason} }}"),
			UiEvent::Reconnecting {
				attempt,
				next_retry_in_ms,
			} => write!(
				f,
				"UiEvent::Reconnecting {{ attempt: {attempt}, next_retry_in_ms: {next_retry_in_ms} }}"
			),
			UiEvent::TimelineChanged { revision, appended } => {
				let ids: Vec<&str> = appended.iter().map(|e| e.id.as_str()).collect();
				write!(f, "UiEvent::TimelineChanged {{ revision: {revision}, appended: {ids:?} }}")
			}
			UiEvent::ParticipantsChanged { count } => write!(f, "UiEvent::ParticipantsChanged {{ count: {count} }}"),
			UiEvent::Error { message } => write!(f, "UiEvent::Error {{ message: {message} }}"),
			UiEvent::ErrorCleared => f.write_str("UiEvent::ErrorCleared"),
			UiEvent::InputRestored { text } => write!(f, "UiEvent::InputRestored {{ len: {} }}", text.len()),
			UiEvent::AuthFailed => f.write_str("UiEvent::AuthFailed"),
		}
	}
}

/// Point-in-time view of the room session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
	pub room: Option<RoomDescriptor>,
	/// Effective timeline: append order, temporary entries removed.
	pub timeline: Vec<ChatEvent>,
	pub revision: u64,
	pub participants_count: u64,
	pub connection: ConnectionState,
	/// Internal transport state behind `connection`.
	pub transport: TransportState,
	pub error: Option<String>,
	/// History load in flight.
	pub loading: bool,
	/// REST fallback send in flight.
	pub sending: bool,
	/// Text handed back after a failed REST send.
	pub restored_input: Option<String>,
}

impl Default for RoomView {
	fn default() -> Self {
		Self {
			room: None,
			timeline: Vec::new(),
			revision: 0,
			participants_count: 0,
			connection: ConnectionState::Closed,
			transport: TransportState::Idle,
			error: None,
			loading: false,
			sending: false,
			restored_input: None,
		}
	}
}

impl RoomView {
	/// Sending is blocked only while the transport is down and a fallback send is already in flight.
	pub fn can_send(&self) -> bool {
		self.room.is_some() && (self.connection == ConnectionState::Open || !self.sending)
	}

	pub fn contents(&self) -> Vec<&str> {
		self.timeline.iter().map(|e| e.content.as_str()).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn can_send_gate() {
		let mut v = RoomView {
			room: Some(RoomDescriptor::Loser),
			..RoomView::default()
		};
		assert!(v.can_send());
		v.sending = true;
		assert!(!v.can_send());
		v.connection = ConnectionState::Open;
		assert!(v.can_send());
		v.room = None;
		assert!(!v.can_send());
	}
}
