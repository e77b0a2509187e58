use std::sync::Arc;
use std::time::Duration;

use stockchat_client_core::{ApiClient, AuthProvider, ChatApi, ClientCoreError, GameApi, SecretString, SharedAuth};
use stockchat_domain::{RoomDescriptor, RoomId};
use stockchat_protocol::{GameOutcome, RspChoice};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accept one connection, capture the request head, answer with a canned response.
async fn serve_once(status: &'static str, body: &'static str, delay: Duration) -> (String, JoinHandle<String>) {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
	let addr = listener.local_addr().expect("addr");
	let handle = tokio::spawn(async move {
		let (mut sock, _) = listener.accept().await.expect("accept");
		let mut buf = vec![0u8; 16 * 1024];
		let mut read = 0;
		loop {
			let n = sock.read(&mut buf[read..]).await.expect("read");
			read += n;
			if n == 0 || buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
				break;
			}
		}
		let request = String::from_utf8_lossy(&buf[..read]).to_string();
		tokio::time::sleep(delay).await;
		let resp = format!(
			"HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
			body.len()
		);
		let _ = sock.write_all(resp.as_bytes()).await;
		request
	});
	(format!("http://{addr}/api"), handle)
}

fn client(base: &str, auth: &SharedAuth, timeout: Duration) -> ApiClient {
	let auth: Arc<dyn AuthProvider> = Arc::new(auth.clone());
	ApiClient::new(base, timeout, auth).expect("client")
}

#[tokio::test]
async fn history_is_parsed_and_bearer_attached() {
	let (base, server) = serve_once(
		"200 OK",
		r#"{"results":[{"id":1,"content":"hi","created_at":"t","user":{"id":3,"username":"alice"}}],"participants_count":3}"#,
		Duration::ZERO,
	)
	.await;
	let auth = SharedAuth::new(Some(SecretString::new("tok123")));
	let api = client(&base, &auth, Duration::from_secs(5));

	let room = RoomDescriptor::Stock(RoomId::new("42").unwrap());
	let history = api.fetch_history(&room).await.expect("history");
	assert_eq!(history.participants_count, Some(3));
	assert_eq!(history.events.len(), 1);
	assert_eq!(history.events[0].id, "1");

	let request = server.await.expect("server");
	assert!(request.starts_with("GET /api/stocks/rooms/42/messages/ "), "{request}");
	assert!(request.to_ascii_lowercase().contains("authorization: bearer tok123"), "{request}");
}

#[tokio::test]
async fn missing_token_sends_no_authorization_header() {
	let (base, server) = serve_once("201 Created", "{}", Duration::ZERO).await;
	let api = client(&base, &SharedAuth::new(None), Duration::from_secs(5));

	api.send_message(&RoomDescriptor::Loser, "hello").await.expect("send");

	let request = server.await.expect("server");
	assert!(request.starts_with("POST /api/stocks/loser-room/send-message/ "), "{request}");
	assert!(!request.to_ascii_lowercase().contains("authorization:"), "{request}");
}

#[tokio::test]
async fn game_error_body_is_surfaced() {
	let (base, _server) = serve_once(
		"400 Bad Request",
		r#"{"error":"You can only play once a day."}"#,
		Duration::ZERO,
	)
	.await;
	let api = client(&base, &SharedAuth::default(), Duration::from_secs(5));

	match api.play_rsp(RspChoice::Rock).await {
		Err(ClientCoreError::Api { status, message }) => {
			assert_eq!(status, 400);
			assert_eq!(message.as_deref(), Some("You can only play once a day."));
		}
		other => panic!("expected Api error, got: {other:?}"),
	}
}

#[tokio::test]
async fn rsp_result_decodes() {
	let (base, _server) = serve_once(
		"200 OK",
		r#"{"user_choice":"scissors","bot_choice":"paper","result":"win","bonus_points":40}"#,
		Duration::ZERO,
	)
	.await;
	let api = client(&base, &SharedAuth::default(), Duration::from_secs(5));
	let r = api.play_rsp(RspChoice::Scissors).await.expect("rsp");
	assert_eq!(r.result, GameOutcome::Win);
	assert_eq!(r.bonus_points, Some(40));
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
	let (base, _server) = serve_once("401 Unauthorized", r#"{"detail":"token expired"}"#, Duration::ZERO).await;
	let api = client(&base, &SharedAuth::default(), Duration::from_secs(5));
	let err = api.fetch_history(&RoomDescriptor::Loser).await.unwrap_err();
	assert!(err.is_auth(), "{err:?}");
	assert_eq!(err.server_message(), Some("token expired"));
}

#[tokio::test]
async fn slow_server_times_out() {
	let (base, _server) = serve_once("200 OK", "{}", Duration::from_secs(2)).await;
	let api = client(&base, &SharedAuth::default(), Duration::from_millis(200));
	match api.send_message(&RoomDescriptor::Loser, "x").await {
		Err(ClientCoreError::Timeout(_)) => {}
		other => panic!("expected Timeout, got: {other:?}"),
	}
}

#[tokio::test]
async fn refused_connection_is_a_network_error() {
	let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
	let addr = listener.local_addr().expect("addr");
	drop(listener);
	let api = client(&format!("http://{addr}/api"), &SharedAuth::default(), Duration::from_secs(2));
	let err = api.fetch_history(&RoomDescriptor::Loser).await.unwrap_err();
	assert!(matches!(err, ClientCoreError::Network(_)), "{err:?}");
}
