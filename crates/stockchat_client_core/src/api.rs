//! REST access to the chat, game and account endpoints.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use stockchat_domain::{ChatEvent, RoomDescriptor, UserProfile};
use stockchat_protocol::{
	ApiErrorBody, BaccaratBet, BaccaratRequest, BaccaratResult, HistoryResponse, IndianPokerAction, IndianPokerRequest,
	IndianPokerResult, RspChoice, RspRequest, RspResult, SendMessageRequest,
};
use tracing::{debug, warn};

use crate::auth::AuthProvider;
use crate::config::ClientConfig;
use crate::error::ClientCoreError;

/// Validated history page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
	pub events: Vec<ChatEvent>,
	pub participants_count: Option<u64>,
}

#[async_trait]
pub trait ChatApi: Send + Sync {
	async fn fetch_history(&self, room: &RoomDescriptor) -> Result<History, ClientCoreError>;
	async fn send_message(&self, room: &RoomDescriptor, content: &str) -> Result<(), ClientCoreError>;
}

#[async_trait]
pub trait GameApi: Send + Sync {
	async fn play_rsp(&self, choice: RspChoice) -> Result<RspResult, ClientCoreError>;
	async fn play_baccarat(&self, bet: BaccaratBet) -> Result<BaccaratResult, ClientCoreError>;
	async fn play_indian_poker(&self, action: IndianPokerAction) -> Result<IndianPokerResult, ClientCoreError>;
}

#[async_trait]
pub trait ProfileApi: Send + Sync {
	async fn fetch_profile(&self) -> Result<UserProfile, ClientCoreError>;
}

/// reqwest-backed client. The bearer token is read from the auth provider on every request.
#[derive(Clone)]
pub struct ApiClient {
	base_url: String,
	client: reqwest::Client,
	auth: Arc<dyn AuthProvider>,
}

impl ApiClient {
	pub fn new(
		base_url: impl Into<String>,
		timeout: Duration,
		auth: Arc<dyn AuthProvider>,
	) -> Result<Self, ClientCoreError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| ClientCoreError::Config(format!("build http client: {e}")))?;
		Ok(Self {
			base_url: base_url.into().trim_end_matches('/').to_string(),
			client,
			auth,
		})
	}

	pub fn from_config(cfg: &ClientConfig, auth: Arc<dyn AuthProvider>) -> Result<Self, ClientCoreError> {
		Self::new(cfg.api_base_url(), cfg.request_timeout, auth)
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	fn with_auth(&self, req: RequestBuilder) -> RequestBuilder {
		match self.auth.access_token() {
			Some(token) if !token.expose().trim().is_empty() => {
				req.header("Authorization", format!("Bearer {}", token.expose().trim()))
			}
			_ => req,
		}
	}

	async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T, ClientCoreError> {
		let resp = self
			.with_auth(self.client.get(self.url(path)))
			.send()
			.await
			.map_err(|e| ClientCoreError::from_reqwest(e, what))?;
		read_json(resp, what).await
	}

	async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
		&self,
		path: &str,
		body: &B,
		what: &str,
	) -> Result<T, ClientCoreError> {
		let resp = self
			.with_auth(self.client.post(self.url(path)).json(body))
			.send()
			.await
			.map_err(|e| ClientCoreError::from_reqwest(e, what))?;
		read_json(resp, what).await
	}
}

fn history_path(room: &RoomDescriptor) -> String {
	match room {
		RoomDescriptor::Stock(id) => format!("/stocks/rooms/{id}/messages/"),
		RoomDescriptor::Loser => "/stocks/loser-room/messages/".to_string(),
	}
}

fn send_path(room: &RoomDescriptor) -> String {
	match room {
		RoomDescriptor::Stock(id) => format!("/stocks/rooms/{id}/send-message/"),
		RoomDescriptor::Loser => "/stocks/loser-room/send-message/".to_string(),
	}
}

async fn error_from_response(resp: reqwest::Response) -> ClientCoreError {
	let status = resp.status();
	let body = resp.text().await.unwrap_or_default();
	let message = serde_json::from_str::<ApiErrorBody>(&body)
		.ok()
		.and_then(ApiErrorBody::message);
	ClientCoreError::from_status(status, message)
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response, what: &str) -> Result<T, ClientCoreError> {
	if !resp.status().is_success() {
		let err = error_from_response(resp).await;
		debug!(what, error = %err, "request failed");
		return Err(err);
	}
	resp.json::<T>()
		.await
		.map_err(|e| ClientCoreError::from_reqwest(e, what))
}

#[async_trait]
impl ChatApi for ApiClient {
	async fn fetch_history(&self, room: &RoomDescriptor) -> Result<History, ClientCoreError> {
		let page: HistoryResponse = self.get_json(&history_path(room), "fetch history").await?;
		let participants_count = page.participants_count;
		let (events, rejected) = page.into_events();
		for e in rejected {
			warn!(room = %room, error = %e, "dropping malformed history entry");
		}
		Ok(History {
			events,
			participants_count,
		})
	}

	async fn send_message(&self, room: &RoomDescriptor, content: &str) -> Result<(), ClientCoreError> {
		let body = SendMessageRequest::new(room.kind(), content);
		let resp = self
			.with_auth(self.client.post(self.url(&send_path(room))).json(&body))
			.send()
			.await
			.map_err(|e| ClientCoreError::from_reqwest(e, "send message"))?;
		if resp.status().is_success() {
			Ok(())
		} else {
			Err(error_from_response(resp).await)
		}
	}
}

#[async_trait]
impl GameApi for ApiClient {
	async fn play_rsp(&self, choice: RspChoice) -> Result<RspResult, ClientCoreError> {
		self.post_json("/game/rsp/", &RspRequest { choice }, "play rsp").await
	}

	async fn play_baccarat(&self, bet: BaccaratBet) -> Result<BaccaratResult, ClientCoreError> {
		self.post_json("/game/baccarat/", &BaccaratRequest { bet }, "play baccarat")
			.await
	}

	async fn play_indian_poker(&self, action: IndianPokerAction) -> Result<IndianPokerResult, ClientCoreError> {
		self.post_json("/game/indian-poker/", &IndianPokerRequest { action }, "play indian poker")
			.await
	}
}

#[async_trait]
impl ProfileApi for ApiClient {
	async fn fetch_profile(&self) -> Result<UserProfile, ClientCoreError> {
		self.get_json("/accounts/profile/", "fetch profile").await
	}
}
