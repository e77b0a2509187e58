#![forbid(unsafe_code)]

pub mod envelope;
pub mod rest;

pub use envelope::{
	ChatMessageEnvelope, DEFAULT_MAX_ENVELOPE_SIZE, ProtocolError, ServerEvent, WireMessage, WireUser,
	encode_chat_message, parse_server_event, parse_server_event_with_limit,
};
pub use rest::{
	ApiErrorBody, BaccaratBet, BaccaratRequest, BaccaratResult, GameOutcome, HistoryResponse, IndianPokerAction,
	IndianPokerRequest, IndianPokerResult, RspChoice, RspRequest, RspResult, SendMessageRequest,
};

/// Close codes used by the chat transport.
pub mod close_code {
	/// Normal closure.
	pub const NORMAL: u16 = 1000;
	/// Endpoint going away (page unload, server shutdown).
	pub const GOING_AWAY: u16 = 1001;
	/// No close frame received.
	pub const ABNORMAL: u16 = 1006;
	/// Server rejected the access token.
	pub const INVALID_TOKEN: u16 = 4001;
	/// Room does not exist.
	pub const ROOM_NOT_FOUND: u16 = 4002;

	/// Closures that are expected and never trigger a reconnect.
	pub const fn is_expected(code: u16) -> bool {
		matches!(code, NORMAL | GOING_AWAY)
	}

	/// Closures after which reconnecting with the same credentials cannot succeed.
	pub const fn is_terminal(code: u16) -> bool {
		matches!(code, INVALID_TOKEN | ROOM_NOT_FOUND)
	}
}
