//! Request and response bodies for the REST endpoints.

use serde::{Deserialize, Serialize};
use stockchat_domain::{ChatEvent, RoomKind};

use crate::envelope::{ProtocolError, WireMessage};

/// `GET .../messages/` response.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
	#[serde(default)]
	pub results: Vec<WireMessage>,
	#[serde(default)]
	pub participants_count: Option<u64>,
}

impl HistoryResponse {
	/// Convert results in order, returning rejected entries separately so one bad row does not drop the page.
	pub fn into_events(self) -> (Vec<ChatEvent>, Vec<ProtocolError>) {
		let mut events = Vec::with_capacity(self.results.len());
		let mut errors = Vec::new();
		for msg in self.results {
			match msg.into_event() {
				Ok(e) => events.push(e),
				Err(e) => errors.push(e),
			}
		}
		(events, errors)
	}
}

/// `POST .../send-message/` body. The loser room also names its room type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendMessageRequest<'a> {
	pub content: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub room_type: Option<&'static str>,
}

impl<'a> SendMessageRequest<'a> {
	pub fn new(kind: RoomKind, content: &'a str) -> Self {
		let room_type = match kind {
			RoomKind::Stock => None,
			RoomKind::Loser => Some(RoomKind::Loser.as_str()),
		};
		Self { content, room_type }
	}
}

/// Error body returned by the backend (`{"error": ...}` or DRF's `{"detail": ...}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
	#[serde(default)]
	pub error: Option<String>,
	#[serde(default)]
	pub detail: Option<String>,
}

impl ApiErrorBody {
	pub fn message(self) -> Option<String> {
		self.error.or(self.detail).filter(|s| !s.trim().is_empty())
	}
}

/// Round outcome reported by the game endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
	Win,
	Lose,
	Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RspChoice {
	Scissors,
	Rock,
	Paper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RspRequest {
	pub choice: RspChoice,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RspResult {
	pub user_choice: RspChoice,
	pub bot_choice: RspChoice,
	pub result: GameOutcome,
	#[serde(default)]
	pub bonus_points: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaccaratBet {
	Player,
	Banker,
	Tie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BaccaratRequest {
	pub bet: BaccaratBet,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BaccaratResult {
	pub user_bet: BaccaratBet,
	pub outcome: BaccaratBet,
	pub result: GameOutcome,
	#[serde(default)]
	pub points_delta: Option<i64>,
	#[serde(default)]
	pub bonus_points: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndianPokerAction {
	Call,
	Fold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndianPokerRequest {
	pub action: IndianPokerAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndianPokerResult {
	pub action: IndianPokerAction,
	#[serde(default)]
	pub user_card: Option<u8>,
	#[serde(default)]
	pub dealer_card: Option<u8>,
	pub result: GameOutcome,
	#[serde(default)]
	pub points_delta: Option<i64>,
	#[serde(default)]
	pub bonus_points: Option<i64>,
}
