//! Connection lifecycle for one room, without I/O.
//!
//! `TransportSession::handle` takes one input and returns the side effects
//! the owner must perform. Every link-originated input carries the link
//! generation it came from; inputs from superseded links are ignored.

use core::fmt;
use std::time::Duration;

use stockchat_domain::{ConnectionState, RoomDescriptor};
use stockchat_protocol::{ServerEvent, close_code, encode_chat_message, parse_server_event};
use tracing::{debug, info, warn};

use crate::net::reconnect::ReconnectPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
	Idle,
	Connecting,
	Open,
	Closing,
	Closed,
}

impl TransportState {
	pub fn public(self) -> ConnectionState {
		match self {
			TransportState::Connecting => ConnectionState::Connecting,
			TransportState::Open => ConnectionState::Open,
			TransportState::Idle | TransportState::Closing | TransportState::Closed => ConnectionState::Closed,
		}
	}
}

/// User-visible transport problems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
	/// Abnormal close; a reconnect is scheduled.
	ConnectionLost { code: u16, attempt: u32, retry_in: Duration },
	/// Abnormal close and the attempt cap is spent.
	GaveUp { code: u16, attempts: u32 },
	/// Server rejected the token (4001).
	AuthRejected,
	/// Room does not exist (4002).
	RoomNotFound,
}

impl fmt::Display for TransportError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TransportError::ConnectionLost { .. } => f.write_str("채팅 서버 연결이 종료되었습니다. 재연결 중..."),
			TransportError::GaveUp { .. } => {
				f.write_str("채팅 서버 연결이 끊어졌습니다. 잠시 후 채팅방에 다시 입장해주세요.")
			}
			TransportError::AuthRejected => f.write_str("인증이 만료되었습니다. 다시 로그인해주세요."),
			TransportError::RoomNotFound => f.write_str("존재하지 않는 채팅방입니다."),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportInput {
	/// Owner wants a connection to `room`. Replaces any current link.
	Open { room: RoomDescriptor },
	/// Owner teardown. Idempotent.
	Close { reason: String },
	LinkOpened { link: u64 },
	LinkText { link: u64, text: String },
	LinkError { link: u64, error: String },
	LinkClosed { link: u64, code: u16, reason: String },
	/// The connector failed or timed out before the link opened.
	ConnectFailed { link: u64, error: String },
	/// A reconnect timer scheduled after `link` closed has fired.
	ReconnectDue { link: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEffect {
	/// Open a new link; the token is attached by the owner at connect time.
	Connect { link: u64, room: RoomDescriptor },
	Send { link: u64, text: String },
	CloseLink { link: u64, code: u16, reason: String },
	ScheduleReconnect { link: u64, attempt: u32, delay: Duration },
	CancelReconnect,
	Deliver(ServerEvent),
	StateChanged(ConnectionState),
	ErrorChanged(Option<TransportError>),
}

/// `send` was called while the transport is not open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotOpen;

impl fmt::Display for NotOpen {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("transport is not open")
	}
}

#[derive(Debug)]
pub struct TransportSession {
	state: TransportState,
	room: Option<RoomDescriptor>,
	link: u64,
	attempts: u32,
	reconnect_pending: bool,
	torn_down: bool,
	error: Option<TransportError>,
	published: ConnectionState,
	policy: ReconnectPolicy,
}

impl TransportSession {
	pub fn new(policy: ReconnectPolicy) -> Self {
		Self {
			state: TransportState::Idle,
			room: None,
			link: 0,
			attempts: 0,
			reconnect_pending: false,
			torn_down: false,
			error: None,
			published: ConnectionState::Closed,
			policy,
		}
	}

	pub fn state(&self) -> TransportState {
		self.state
	}

	pub fn connection_state(&self) -> ConnectionState {
		self.state.public()
	}

	pub fn is_open(&self) -> bool {
		self.state == TransportState::Open
	}

	/// Generation of the current link.
	pub fn current_link(&self) -> u64 {
		self.link
	}

	pub fn error(&self) -> Option<&TransportError> {
		self.error.as_ref()
	}

	pub fn reconnect_pending(&self) -> bool {
		self.reconnect_pending
	}

	/// Serialize a `chat_message` for the current link. Only valid while open.
	pub fn send(&self, content: &str) -> Result<TransportEffect, NotOpen> {
		let room = match (&self.room, self.state) {
			(Some(room), TransportState::Open) => room,
			_ => return Err(NotOpen),
		};
		let text = encode_chat_message(room, content).map_err(|e| {
			warn!(error = %e, "encode chat_message failed");
			NotOpen
		})?;
		Ok(TransportEffect::Send { link: self.link, text })
	}

	pub fn handle(&mut self, input: TransportInput) -> Vec<TransportEffect> {
		let mut fx = Vec::new();
		match input {
			TransportInput::Open { room } => self.open(room, &mut fx),
			TransportInput::Close { reason } => self.close(reason, &mut fx),
			TransportInput::LinkOpened { link } => {
				if link != self.link || self.state != TransportState::Connecting {
					debug!(link, current = self.link, "ignoring open from stale link");
					return fx;
				}
				info!(link, room = ?self.room, "transport open");
				self.state = TransportState::Open;
				self.attempts = 0;
				self.set_error(None, &mut fx);
				self.publish(&mut fx);
			}
			TransportInput::LinkText { link, text } => {
				if link != self.link || self.state != TransportState::Open {
					return fx;
				}
				match parse_server_event(&text) {
					Ok(ServerEvent::ConnectionEstablished) => {
						debug!(link, "connection_established");
						self.set_error(None, &mut fx);
					}
					Ok(event) => {
						debug!(link, kind = event.kind(), "inbound event");
						fx.push(TransportEffect::Deliver(event));
					}
					Err(e) => warn!(link, error = %e, "dropping malformed transport payload"),
				}
			}
			TransportInput::LinkError { link, error } => {
				warn!(link, error = %error, "transport link error");
			}
			TransportInput::LinkClosed { link, code, reason } => self.link_closed(link, code, &reason, &mut fx),
			TransportInput::ConnectFailed { link, error } => {
				warn!(link, error = %error, "transport connect failed");
				self.link_closed(link, close_code::ABNORMAL, &error, &mut fx);
			}
			TransportInput::ReconnectDue { link } => {
				if !self.reconnect_pending || self.torn_down || link != self.link {
					debug!(link, "ignoring stale reconnect timer");
					return fx;
				}
				self.reconnect_pending = false;
				if let Some(room) = self.room.clone() {
					self.state = TransportState::Idle;
					self.start_link(room, &mut fx);
				}
			}
		}
		fx
	}

	fn open(&mut self, room: RoomDescriptor, fx: &mut Vec<TransportEffect>) {
		if matches!(
			self.state,
			TransportState::Connecting | TransportState::Open | TransportState::Closing
		) {
			fx.push(TransportEffect::CloseLink {
				link: self.link,
				code: close_code::NORMAL,
				reason: "superseded".to_string(),
			});
		}
		if self.reconnect_pending {
			self.reconnect_pending = false;
			fx.push(TransportEffect::CancelReconnect);
		}
		self.torn_down = false;
		self.attempts = 0;
		self.set_error(None, fx);
		self.start_link(room, fx);
	}

	fn start_link(&mut self, room: RoomDescriptor, fx: &mut Vec<TransportEffect>) {
		self.link = self.link.wrapping_add(1);
		self.room = Some(room.clone());
		self.state = TransportState::Connecting;
		info!(link = self.link, room = %room, attempt = self.attempts, "transport connecting");
		self.publish(fx);
		fx.push(TransportEffect::Connect { link: self.link, room });
	}

	fn close(&mut self, reason: String, fx: &mut Vec<TransportEffect>) {
		self.torn_down = true;
		if self.reconnect_pending {
			self.reconnect_pending = false;
			fx.push(TransportEffect::CancelReconnect);
		}
		match self.state {
			TransportState::Connecting | TransportState::Open => {
				info!(link = self.link, reason = %reason, "transport closing");
				self.state = TransportState::Closing;
				fx.push(TransportEffect::CloseLink {
					link: self.link,
					code: close_code::NORMAL,
					reason,
				});
				self.publish(fx);
			}
			TransportState::Idle | TransportState::Closing | TransportState::Closed => {}
		}
	}

	fn link_closed(&mut self, link: u64, code: u16, reason: &str, fx: &mut Vec<TransportEffect>) {
		if link != self.link
			|| !matches!(
				self.state,
				TransportState::Connecting | TransportState::Open | TransportState::Closing
			) {
			debug!(link, code, "ignoring close from stale link");
			return;
		}

		let requested = self.state == TransportState::Closing || self.torn_down;
		self.state = TransportState::Closed;
		self.publish(fx);

		if requested || close_code::is_expected(code) {
			info!(link, code, reason, "transport closed");
			return;
		}

		if close_code::is_terminal(code) {
			let error = if code == close_code::INVALID_TOKEN {
				TransportError::AuthRejected
			} else {
				TransportError::RoomNotFound
			};
			warn!(link, code, reason, "transport rejected; not reconnecting");
			self.set_error(Some(error), fx);
			return;
		}

		let attempt = self.attempts.saturating_add(1);
		match self.policy.delay_for(attempt) {
			Some(delay) => {
				warn!(link, code, reason, attempt, "transport closed abnormally; reconnecting");
				self.attempts = attempt;
				self.reconnect_pending = true;
				self.set_error(
					Some(TransportError::ConnectionLost {
						code,
						attempt,
						retry_in: delay,
					}),
					fx,
				);
				fx.push(TransportEffect::ScheduleReconnect { link, attempt, delay });
			}
			None => {
				warn!(link, code, attempts = self.attempts, "transport reconnect limit reached");
				self.set_error(
					Some(TransportError::GaveUp {
						code,
						attempts: self.attempts,
					}),
					fx,
				);
			}
		}
	}

	fn set_error(&mut self, error: Option<TransportError>, fx: &mut Vec<TransportEffect>) {
		if self.error != error {
			self.error = error.clone();
			fx.push(TransportEffect::ErrorChanged(error));
		}
	}

	fn publish(&mut self, fx: &mut Vec<TransportEffect>) {
		let now = self.state.public();
		if now != self.published {
			self.published = now;
			fx.push(TransportEffect::StateChanged(now));
		}
	}
}
