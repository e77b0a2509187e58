//! Websocket link for a room transport.
//!
//! A link is a pair of channels pumped by a background task, so the owner
//! never touches the socket directly and tests can substitute the connector.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use stockchat_domain::RoomDescriptor;
use stockchat_protocol::{ApiErrorBody, close_code};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ClientCoreError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Owner → socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommand {
	Text(String),
	Close { code: u16, reason: String },
}

/// Socket → owner. `Closed` is the last frame a link delivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkFrame {
	Text(String),
	Closed { code: u16, reason: String },
	Error(String),
}

/// An established duplex connection.
#[derive(Debug)]
pub struct TransportLink {
	pub tx: mpsc::UnboundedSender<LinkCommand>,
	pub rx: mpsc::UnboundedReceiver<LinkFrame>,
}

pub type LinkConnector = Arc<dyn Fn(Url) -> BoxFuture<'static, Result<TransportLink, ClientCoreError>> + Send + Sync>;

/// Build `ws(s)://host/ws/chat/rooms/{id}/?token=...` or `.../ws/chat/loser-room/?token=...`.
///
/// The token query parameter is omitted when there is no token.
pub fn room_ws_url(ws_base: &str, room: &RoomDescriptor, token: Option<&str>) -> Result<Url, ClientCoreError> {
	let base = ws_base.trim_end_matches('/');
	let raw = match room {
		RoomDescriptor::Stock(id) => format!("{base}/ws/chat/rooms/{id}/"),
		RoomDescriptor::Loser => format!("{base}/ws/chat/loser-room/"),
	};
	let mut url = Url::parse(&raw).map_err(|e| ClientCoreError::Config(format!("invalid transport url {raw}: {e}")))?;
	if !matches!(url.scheme(), "ws" | "wss") {
		return Err(ClientCoreError::Config(format!("transport url must be ws:// or wss://: {raw}")));
	}
	if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
		url.query_pairs_mut().append_pair("token", token);
	}
	Ok(url)
}

/// Connector backed by tokio-tungstenite.
pub fn default_connector() -> LinkConnector {
	Arc::new(|url: Url| {
		Box::pin(async move { connect_tungstenite(url).await }) as BoxFuture<'static, Result<TransportLink, ClientCoreError>>
	})
}

/// Close code equivalent of a refused handshake.
///
/// The server rejects a bad token or a missing room before accepting the
/// socket, so the client sees an HTTP status instead of 4001/4002.
pub fn rejection_close_code(e: &ClientCoreError) -> Option<u16> {
	match e {
		ClientCoreError::Auth { .. } => Some(close_code::INVALID_TOKEN),
		ClientCoreError::Api { status: 404, .. } => Some(close_code::ROOM_NOT_FOUND),
		_ => None,
	}
}

fn handshake_error(path: &str, e: tungstenite::Error) -> ClientCoreError {
	match e {
		tungstenite::Error::Http(resp) => {
			let message = resp
				.body()
				.as_deref()
				.and_then(|b| serde_json::from_slice::<ApiErrorBody>(b).ok())
				.and_then(ApiErrorBody::message);
			warn!(path, status = resp.status().as_u16(), "transport handshake rejected");
			ClientCoreError::from_status_code(resp.status().as_u16(), message)
		}
		e => ClientCoreError::Network(format!("connect {path}: {e}")),
	}
}

async fn connect_tungstenite(url: Url) -> Result<TransportLink, ClientCoreError> {
	let (ws, _resp) = tokio_tungstenite::connect_async(url.as_str())
		.await
		.map_err(|e| handshake_error(url.path(), e))?;
	info!(path = %url.path(), "transport socket connected");

	let (mut sink, mut stream) = ws.split();
	let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<LinkCommand>();
	let (frame_tx, frame_rx) = mpsc::unbounded_channel::<LinkFrame>();

	tokio::spawn(async move {
		loop {
			tokio::select! {
				cmd = cmd_rx.recv() => {
					match cmd {
						Some(LinkCommand::Text(text)) => {
							if let Err(e) = sink.send(Message::Text(text.into())).await {
								warn!(error = %e, "transport send failed");
								let _ = frame_tx.send(LinkFrame::Error(e.to_string()));
							}
						}
						Some(LinkCommand::Close { code, reason }) => {
							let frame = CloseFrame {
								code: CloseCode::from(code),
								reason: reason.into(),
							};
							if let Err(e) = sink.send(Message::Close(Some(frame))).await {
								debug!(error = %e, "transport close frame not sent");
								let _ = frame_tx.send(LinkFrame::Closed { code, reason: String::new() });
								break;
							}
						}
						None => {
							let _ = sink.close().await;
							break;
						}
					}
				}

				msg = stream.next() => {
					match msg {
						Some(Ok(Message::Text(text))) => {
							let _ = frame_tx.send(LinkFrame::Text(text.as_str().to_owned()));
						}
						Some(Ok(Message::Close(frame))) => {
							let (code, reason) = frame
								.map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
								.unwrap_or((1005, String::new()));
							let _ = frame_tx.send(LinkFrame::Closed { code, reason });
							break;
						}
						Some(Ok(_)) => {}
						Some(Err(e)) => {
							warn!(error = %e, "transport socket error");
							let _ = frame_tx.send(LinkFrame::Error(e.to_string()));
							let _ = frame_tx.send(LinkFrame::Closed {
								code: close_code::ABNORMAL,
								reason: String::new(),
							});
							break;
						}
						None => {
							let _ = frame_tx.send(LinkFrame::Closed {
								code: close_code::ABNORMAL,
								reason: String::new(),
							});
							break;
						}
					}
				}
			}
		}
		debug!("transport pump finished");
	});

	Ok(TransportLink {
		tx: cmd_tx,
		rx: frame_rx,
	})
}

#[cfg(test)]
mod tests {
	use stockchat_domain::RoomId;

	use super::*;

	#[test]
	fn stock_room_url_carries_token() {
		let room = RoomDescriptor::Stock(RoomId::new("42").unwrap());
		let url = room_ws_url("ws://localhost:8000", &room, Some("abc.def")).unwrap();
		assert_eq!(url.as_str(), "ws://localhost:8000/ws/chat/rooms/42/?token=abc.def");
	}

	#[test]
	fn loser_room_url_without_token() {
		let url = room_ws_url("wss://chat.example.com/", &RoomDescriptor::Loser, None).unwrap();
		assert_eq!(url.as_str(), "wss://chat.example.com/ws/chat/loser-room/");
		assert!(url.query().is_none());
	}

	#[test]
	fn token_is_query_escaped() {
		let url = room_ws_url("ws://h", &RoomDescriptor::Loser, Some("a b&c")).unwrap();
		assert_eq!(url.query(), Some("token=a+b%26c"));
	}

	fn http_rejection(status: u16, body: Option<&str>) -> tungstenite::Error {
		let resp = tungstenite::http::Response::builder()
			.status(status)
			.body(body.map(|b| b.as_bytes().to_vec()))
			.unwrap();
		tungstenite::Error::Http(Box::new(resp))
	}

	#[test]
	fn refused_handshake_maps_to_terminal_codes() {
		let forbidden = handshake_error("/ws/chat/rooms/7/", http_rejection(403, None));
		assert!(forbidden.is_auth(), "{forbidden:?}");
		assert_eq!(rejection_close_code(&forbidden), Some(close_code::INVALID_TOKEN));

		let missing = handshake_error(
			"/ws/chat/rooms/7/",
			http_rejection(404, Some(r#"{"detail":"Not found."}"#)),
		);
		assert_eq!(missing.server_message(), Some("Not found."));
		assert_eq!(rejection_close_code(&missing), Some(close_code::ROOM_NOT_FOUND));

		let flaky = handshake_error("/ws/chat/rooms/7/", http_rejection(502, None));
		assert_eq!(rejection_close_code(&flaky), None);
		assert_eq!(
			rejection_close_code(&ClientCoreError::Network("refused".into())),
			None
		);
	}

	#[test]
	fn http_base_is_rejected() {
		assert!(matches!(
			room_ws_url("http://h", &RoomDescriptor::Loser, None),
			Err(ClientCoreError::Config(_))
		));
	}
}
