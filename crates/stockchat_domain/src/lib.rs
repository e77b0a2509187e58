#![forbid(unsafe_code)]

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Username reserved for events produced by the local command bot.
pub const BOT_USERNAME: &str = "chatbot";

/// Display name of the local command bot.
pub const BOT_NICKNAME: &str = "챗봇";

/// Id prefix for client-local events that the server has not confirmed yet.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Errors for parsing identifiers from strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseIdError {
	#[error("empty value")]
	Empty,
	#[error("unknown room kind: {0}")]
	UnknownRoomKind(String),
	#[error("invalid format: {0}")]
	InvalidFormat(String),
}

/// Which family of endpoints a room uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
	Stock,
	Loser,
}

impl RoomKind {
	/// Stable string identifier, as sent in `room_type`.
	pub const fn as_str(self) -> &'static str {
		match self {
			RoomKind::Stock => "stock",
			RoomKind::Loser => "loser",
		}
	}
}

impl fmt::Display for RoomKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for RoomKind {
	type Err = ParseIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		if s.is_empty() {
			return Err(ParseIdError::Empty);
		}

		match s.to_ascii_lowercase().as_str() {
			"stock" => Ok(RoomKind::Stock),
			"loser" => Ok(RoomKind::Loser),
			other => Err(ParseIdError::UnknownRoomKind(other.to_string())),
		}
	}
}

/// Opaque stock room identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
	/// Create a non-empty `RoomId`. Ids are embedded in URL paths, so `/`, `?` and `#` are rejected.
	pub fn new(id: impl Into<String>) -> Result<Self, ParseIdError> {
		let id = id.into();
		let trimmed = id.trim();
		if trimmed.is_empty() {
			return Err(ParseIdError::Empty);
		}
		if trimmed.contains(['/', '?', '#']) || trimmed.chars().any(char::is_whitespace) {
			return Err(ParseIdError::InvalidFormat(format!("room id may not contain separators: {trimmed}")));
		}
		Ok(Self(trimmed.to_string()))
	}
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for RoomId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for RoomId {
	type Err = ParseIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		RoomId::new(s.to_string())
	}
}

/// A room the client can enter: a stock room by id, or the shared loser room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RoomDescriptor {
	Stock(RoomId),
	Loser,
}

impl RoomDescriptor {
	pub const fn kind(&self) -> RoomKind {
		match self {
			RoomDescriptor::Stock(_) => RoomKind::Stock,
			RoomDescriptor::Loser => RoomKind::Loser,
		}
	}

	pub fn room_id(&self) -> Option<&RoomId> {
		match self {
			RoomDescriptor::Stock(id) => Some(id),
			RoomDescriptor::Loser => None,
		}
	}

	/// Parse `loser` or `stock:<id>`; a bare id means a stock room.
	pub fn parse(s: &str) -> Result<Self, ParseIdError> {
		let s = s.trim();
		if s.is_empty() {
			return Err(ParseIdError::Empty);
		}
		if s.eq_ignore_ascii_case("loser") {
			return Ok(RoomDescriptor::Loser);
		}
		match s.split_once(':') {
			Some((kind, id)) => match RoomKind::from_str(kind)? {
				RoomKind::Stock => Ok(RoomDescriptor::Stock(RoomId::new(id)?)),
				RoomKind::Loser => Err(ParseIdError::InvalidFormat("loser room takes no id".into())),
			},
			None => Ok(RoomDescriptor::Stock(RoomId::new(s)?)),
		}
	}
}

impl fmt::Display for RoomDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RoomDescriptor::Stock(id) => write!(f, "stock:{id}"),
			RoomDescriptor::Loser => f.write_str("loser"),
		}
	}
}

impl FromStr for RoomDescriptor {
	type Err = ParseIdError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		RoomDescriptor::parse(s)
	}
}

/// A human participant as carried on chat events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
	pub id: Option<i64>,
	pub username: String,
	pub nickname: Option<String>,
	#[serde(default)]
	pub has_loser_badge: bool,
	#[serde(default)]
	pub has_champion_badge: bool,
}

impl UserRef {
	pub fn new(username: impl Into<String>) -> Self {
		Self {
			id: None,
			username: username.into(),
			nickname: None,
			has_loser_badge: false,
			has_champion_badge: false,
		}
	}

	/// Nickname when set and non-blank, otherwise the username.
	pub fn display_name(&self) -> &str {
		self.nickname
			.as_deref()
			.filter(|s| !s.trim().is_empty())
			.unwrap_or(&self.username)
	}
}

/// Who wrote a chat event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Author {
	User(UserRef),
	Bot,
}

impl Author {
	/// Classify a wire user; the reserved bot username maps to `Author::Bot`.
	pub fn from_user(user: UserRef) -> Self {
		if user.username == BOT_USERNAME {
			Author::Bot
		} else {
			Author::User(user)
		}
	}

	pub fn username(&self) -> &str {
		match self {
			Author::User(u) => &u.username,
			Author::Bot => BOT_USERNAME,
		}
	}

	pub fn display_name(&self) -> &str {
		match self {
			Author::User(u) => u.display_name(),
			Author::Bot => BOT_NICKNAME,
		}
	}

	pub fn is_bot(&self) -> bool {
		matches!(self, Author::Bot)
	}
}

/// One entry in a room timeline. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
	pub id: String,
	pub content: String,
	/// ISO-8601 timestamp, display only.
	pub created_at: String,
	pub author: Author,
}

impl ChatEvent {
	pub fn is_temporary(&self) -> bool {
		self.id.starts_with(TEMP_ID_PREFIX)
	}

	pub fn is_command(&self) -> bool {
		self.content.starts_with('!')
	}
}

/// True iff the event's author username is the bot sentinel.
pub fn is_bot_message(event: &ChatEvent) -> bool {
	event.author.username() == BOT_USERNAME
}

/// Current user as returned by the profile endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	pub id: i64,
	pub username: String,
	#[serde(default)]
	pub nickname: Option<String>,
	#[serde(default)]
	pub bonus_points: Option<i64>,
}

impl UserProfile {
	pub fn display_name(&self) -> &str {
		self.nickname
			.as_deref()
			.filter(|s| !s.trim().is_empty())
			.unwrap_or(&self.username)
	}
}

/// Connection state exposed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
	Connecting,
	Open,
	Closed,
}

impl ConnectionState {
	pub const fn as_str(self) -> &'static str {
		match self {
			ConnectionState::Connecting => "connecting",
			ConnectionState::Open => "open",
			ConnectionState::Closed => "closed",
		}
	}
}

impl fmt::Display for ConnectionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
