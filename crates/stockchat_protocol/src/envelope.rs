use serde::{Deserialize, Serialize};
use stockchat_domain::{Author, ChatEvent, RoomDescriptor, UserRef};
use thiserror::Error;

/// Largest inbound text frame accepted by `parse_server_event`.
pub const DEFAULT_MAX_ENVELOPE_SIZE: usize = 256 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
	#[error("envelope exceeds maximum size: len={len} max={max}")]
	TooLarge { len: usize, max: usize },

	#[error("json decode error: {0}")]
	Decode(#[from] serde_json::Error),

	#[error("missing field `{field}` in `{kind}` envelope")]
	MissingField { kind: &'static str, field: &'static str },

	#[error("unknown envelope type: {0}")]
	UnknownType(String),
}

/// Message id as sent by the backend: a JSON integer, occasionally a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum WireId {
	Int(i64),
	Str(String),
}

impl WireId {
	fn into_string(self) -> String {
		match self {
			WireId::Int(n) => n.to_string(),
			WireId::Str(s) => s,
		}
	}
}

/// User object embedded in wire messages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WireUser {
	#[serde(default)]
	pub id: Option<i64>,
	#[serde(default)]
	pub username: Option<String>,
	#[serde(default)]
	pub nickname: Option<String>,
	#[serde(default)]
	pub has_loser_badge: bool,
	#[serde(default)]
	pub has_champion_badge: bool,
}

/// Message object shared by history results and `chat_message` envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WireMessage {
	#[serde(default)]
	id: Option<WireId>,
	#[serde(default)]
	pub content: String,
	#[serde(default)]
	pub created_at: Option<String>,
	#[serde(default)]
	pub user: Option<WireUser>,
}

impl WireMessage {
	/// Validate and convert into a domain event.
	pub fn into_event(self) -> Result<ChatEvent, ProtocolError> {
		let id = self
			.id
			.map(WireId::into_string)
			.filter(|s| !s.trim().is_empty())
			.ok_or(ProtocolError::MissingField {
				kind: "chat_message",
				field: "message.id",
			})?;

		let user = self.user.ok_or(ProtocolError::MissingField {
			kind: "chat_message",
			field: "message.user",
		})?;
		let username = user
			.username
			.filter(|s| !s.trim().is_empty())
			.ok_or(ProtocolError::MissingField {
				kind: "chat_message",
				field: "message.user.username",
			})?;

		let author = Author::from_user(UserRef {
			id: user.id,
			username,
			nickname: user.nickname,
			has_loser_badge: user.has_loser_badge,
			has_champion_badge: user.has_champion_badge,
		});

		Ok(ChatEvent {
			id,
			content: self.content,
			created_at: self.created_at.unwrap_or_default(),
			author,
		})
	}
}

/// Inbound envelope before dispatch. `message` is untyped because
/// `connection_established` carries a plain string there.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
	#[serde(rename = "type")]
	kind: String,
	#[serde(default)]
	message: Option<serde_json::Value>,
	#[serde(default)]
	participants_count: Option<u64>,
	#[serde(default)]
	username: Option<String>,
}

/// Validated server push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
	ChatMessage(ChatEvent),
	UserJoined {
		username: String,
		participants_count: Option<u64>,
	},
	UserLeft {
		participants_count: Option<u64>,
	},
	ConnectionEstablished,
}

impl ServerEvent {
	pub fn kind(&self) -> &'static str {
		match self {
			ServerEvent::ChatMessage(_) => "chat_message",
			ServerEvent::UserJoined { .. } => "user_joined",
			ServerEvent::UserLeft { .. } => "user_left",
			ServerEvent::ConnectionEstablished => "connection_established",
		}
	}
}

/// Parse one inbound text frame using `DEFAULT_MAX_ENVELOPE_SIZE`.
pub fn parse_server_event(text: &str) -> Result<ServerEvent, ProtocolError> {
	parse_server_event_with_limit(text, DEFAULT_MAX_ENVELOPE_SIZE)
}

pub fn parse_server_event_with_limit(text: &str, max: usize) -> Result<ServerEvent, ProtocolError> {
	if text.len() > max {
		return Err(ProtocolError::TooLarge { len: text.len(), max });
	}

	let raw: RawEnvelope = serde_json::from_str(text)?;
	match raw.kind.as_str() {
		"chat_message" => {
			let value = raw.message.ok_or(ProtocolError::MissingField {
				kind: "chat_message",
				field: "message",
			})?;
			let msg: WireMessage = serde_json::from_value(value)?;
			Ok(ServerEvent::ChatMessage(msg.into_event()?))
		}
		"user_joined" => {
			let username = raw
				.username
				.filter(|s| !s.trim().is_empty())
				.ok_or(ProtocolError::MissingField {
					kind: "user_joined",
					field: "username",
				})?;
			Ok(ServerEvent::UserJoined {
				username,
				participants_count: raw.participants_count,
			})
		}
		"user_left" => Ok(ServerEvent::UserLeft {
			participants_count: raw.participants_count,
		}),
		"connection_established" => Ok(ServerEvent::ConnectionEstablished),
		other => Err(ProtocolError::UnknownType(other.to_string())),
	}
}

/// Outbound `chat_message` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessageEnvelope<'a> {
	#[serde(rename = "type")]
	pub kind: &'static str,
	pub content: &'a str,
	pub room_type: &'static str,
	pub room_id: Option<&'a str>,
}

impl<'a> ChatMessageEnvelope<'a> {
	pub fn new(room: &'a RoomDescriptor, content: &'a str) -> Self {
		Self {
			kind: "chat_message",
			content,
			room_type: room.kind().as_str(),
			room_id: room.room_id().map(|id| id.as_str()),
		}
	}
}

/// Serialize a `chat_message` envelope for `room`.
pub fn encode_chat_message(room: &RoomDescriptor, content: &str) -> Result<String, ProtocolError> {
	Ok(serde_json::to_string(&ChatMessageEnvelope::new(room, content))?)
}
