use proptest::prelude::*;
use stockchat_domain::{Author, RoomDescriptor, RoomId, RoomKind, is_bot_message};
use stockchat_protocol::{
	ApiErrorBody, GameOutcome, HistoryResponse, ProtocolError, RspChoice, RspResult, SendMessageRequest, ServerEvent,
	close_code, encode_chat_message, parse_server_event,
};

fn chat_json(id: &str, username: &str, content: &str) -> String {
	format!(
		r#"{{"type":"chat_message","message":{{"id":{id},"content":"{content}","created_at":"2024-05-01T10:00:00+09:00","user":{{"id":7,"username":"{username}","nickname":null,"has_loser_badge":true,"has_champion_badge":false}}}}}}"#
	)
}

#[test]
fn chat_message_with_integer_id_is_normalized() {
	let ev = parse_server_event(&chat_json("42", "alice", "hello")).expect("parse");
	match ev {
		ServerEvent::ChatMessage(e) => {
			assert_eq!(e.id, "42");
			assert_eq!(e.content, "hello");
			assert_eq!(e.author.username(), "alice");
			match e.author {
				Author::User(u) => {
					assert_eq!(u.id, Some(7));
					assert!(u.has_loser_badge);
				}
				Author::Bot => panic!("expected a user author"),
			}
		}
		other => panic!("expected ChatMessage, got: {other:?}"),
	}
}

#[test]
fn chat_message_from_bot_username_is_bot() {
	let ev = parse_server_event(&chat_json("\"b-1\"", "chatbot", "hi")).expect("parse");
	let ServerEvent::ChatMessage(e) = ev else {
		panic!("expected ChatMessage");
	};
	assert!(is_bot_message(&e));
}

#[test]
fn chat_message_without_user_is_rejected() {
	let text = r#"{"type":"chat_message","message":{"id":1,"content":"x"}}"#;
	match parse_server_event(text) {
		Err(ProtocolError::MissingField { field, .. }) => assert_eq!(field, "message.user"),
		other => panic!("expected MissingField, got: {other:?}"),
	}
}

#[test]
fn chat_message_without_id_is_rejected() {
	let text = r#"{"type":"chat_message","message":{"content":"x","user":{"username":"a"}}}"#;
	assert!(matches!(
		parse_server_event(text),
		Err(ProtocolError::MissingField { field: "message.id", .. })
	));
}

#[test]
fn connection_established_tolerates_string_message() {
	let text = r#"{"type":"connection_established","message":"연결 성공","user":"alice"}"#;
	assert_eq!(parse_server_event(text).expect("parse"), ServerEvent::ConnectionEstablished);
}

#[test]
fn user_joined_and_left() {
	let joined = parse_server_event(r#"{"type":"user_joined","username":"bob","participants_count":4}"#).expect("joined");
	assert_eq!(
		joined,
		ServerEvent::UserJoined {
			username: "bob".into(),
			participants_count: Some(4)
		}
	);

	let left = parse_server_event(r#"{"type":"user_left","participants_count":3}"#).expect("left");
	assert_eq!(
		left,
		ServerEvent::UserLeft {
			participants_count: Some(3)
		}
	);
}

#[test]
fn unknown_and_malformed_payloads_are_errors() {
	assert!(matches!(
		parse_server_event(r#"{"type":"typing"}"#),
		Err(ProtocolError::UnknownType(t)) if t == "typing"
	));
	assert!(matches!(parse_server_event("not json"), Err(ProtocolError::Decode(_))));
	assert!(matches!(parse_server_event(r#"{"message":{}}"#), Err(ProtocolError::Decode(_))));
}

#[test]
fn outbound_envelope_for_stock_and_loser_rooms() {
	let stock = RoomDescriptor::Stock(RoomId::new("42").unwrap());
	let v: serde_json::Value = serde_json::from_str(&encode_chat_message(&stock, "hi").unwrap()).unwrap();
	assert_eq!(v["type"], "chat_message");
	assert_eq!(v["content"], "hi");
	assert_eq!(v["room_type"], "stock");
	assert_eq!(v["room_id"], "42");

	let v: serde_json::Value = serde_json::from_str(&encode_chat_message(&RoomDescriptor::Loser, "yo").unwrap()).unwrap();
	assert_eq!(v["room_type"], "loser");
	assert!(v["room_id"].is_null());
}

#[test]
fn send_body_names_room_type_only_for_loser_room() {
	let stock = serde_json::to_value(SendMessageRequest::new(RoomKind::Stock, "a")).unwrap();
	assert_eq!(stock, serde_json::json!({"content": "a"}));
	let loser = serde_json::to_value(SendMessageRequest::new(RoomKind::Loser, "a")).unwrap();
	assert_eq!(loser, serde_json::json!({"content": "a", "room_type": "loser"}));
}

#[test]
fn history_keeps_good_rows_and_reports_bad_ones() {
	let body = r#"{"results":[
		{"id":1,"content":"hi","created_at":"t","user":{"username":"a"}},
		{"id":2,"content":"broken"},
		{"id":3,"content":"there","created_at":"t","user":{"username":"b"}}
	],"participants_count":3}"#;
	let h: HistoryResponse = serde_json::from_str(body).unwrap();
	assert_eq!(h.participants_count, Some(3));
	let (events, errors) = h.into_events();
	let contents: Vec<_> = events.iter().map(|e| e.content.as_str()).collect();
	assert_eq!(contents, vec!["hi", "there"]);
	assert_eq!(errors.len(), 1);
}

#[test]
fn rsp_result_and_error_body_decode() {
	let r: RspResult =
		serde_json::from_str(r#"{"user_choice":"scissors","bot_choice":"paper","result":"win","bonus_points":40}"#).unwrap();
	assert_eq!(r.user_choice, RspChoice::Scissors);
	assert_eq!(r.result, GameOutcome::Win);
	assert_eq!(r.bonus_points, Some(40));

	let e: ApiErrorBody = serde_json::from_str(r#"{"error":"You can only play once a day."}"#).unwrap();
	assert_eq!(e.message().as_deref(), Some("You can only play once a day."));
	let e: ApiErrorBody = serde_json::from_str(r#"{"detail":"  "}"#).unwrap();
	assert_eq!(e.message(), None);
}

#[test]
fn close_code_classification() {
	assert!(close_code::is_expected(1000));
	assert!(close_code::is_expected(1001));
	assert!(!close_code::is_expected(1006));
	assert!(close_code::is_terminal(4001));
	assert!(close_code::is_terminal(4002));
	assert!(!close_code::is_terminal(1006));
}

proptest! {
	#[test]
	fn arbitrary_text_never_panics(s in ".{0,256}") {
		let _ = parse_server_event(&s);
	}

	#[test]
	fn integer_ids_roundtrip_as_decimal(id in any::<i64>()) {
		let ev = parse_server_event(&chat_json(&id.to_string(), "u", "c")).unwrap();
		match ev {
			ServerEvent::ChatMessage(e) => prop_assert_eq!(e.id, id.to_string()),
			other => prop_assert!(false, "unexpected {:?}", other),
		}
	}
}
