use std::sync::Arc;
use std::time::Duration;

use stockchat_client_core::{
	AuthProvider, ChatApi, ClientConfig, ClientCoreError, GameApi, History, LinkCommand, LinkConnector, LinkFrame,
	TransportLink, rejection_close_code, room_ws_url,
};
use stockchat_domain::{ChatEvent, RoomDescriptor};
use stockchat_protocol::{ServerEvent, close_code};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::controller::{RoomCommand, RoomHandle, ShutdownHandle};
use super::reconnect::{ReconnectPolicy, schedule_reconnect};
use super::types::{RoomView, UiEvent};
use crate::bot;
use crate::store::MessageStore;
use crate::transport::{TransportEffect, TransportError, TransportInput, TransportSession, TransportState};

pub const MSG_SEND_FAILED: &str = "메시지 전송에 실패했습니다. 다시 시도해주세요.";
pub const MSG_HISTORY_FAILED: &str = "메시지를 불러오는데 실패했습니다.";
pub const MSG_HISTORY_EMPTY: &str = "현재 채팅방에 메시지가 없습니다. 첫 메시지를 작성해보세요!";

#[derive(Debug, Clone)]
pub struct RoomSettings {
	pub ws_base_url: String,
	pub connect_timeout: Duration,
	pub reconnect: ReconnectPolicy,
	pub entry_welcome_delay: Duration,
}

impl RoomSettings {
	pub fn from_config(cfg: &ClientConfig) -> Self {
		Self {
			ws_base_url: cfg.ws_base_url(),
			connect_timeout: cfg.connect_timeout,
			reconnect: ReconnectPolicy {
				delay: cfg.reconnect_delay,
				max_attempts: cfg.reconnect_max_attempts,
			},
			entry_welcome_delay: cfg.entry_welcome_delay,
		}
	}
}

impl Default for RoomSettings {
	fn default() -> Self {
		Self::from_config(&ClientConfig::default())
	}
}

/// Collaborators of the room task.
#[derive(Clone)]
pub struct RoomDeps {
	pub chat: Arc<dyn ChatApi>,
	pub games: Arc<dyn GameApi>,
	pub auth: Arc<dyn AuthProvider>,
	pub connector: LinkConnector,
	pub settings: RoomSettings,
}

pub fn ui_send_error(ui_tx: &mpsc::UnboundedSender<UiEvent>, message: String) {
	let _ = ui_tx.send(UiEvent::Error { message });
}

/// Spawn the room task on the current runtime.
pub fn spawn_room_task(deps: RoomDeps, ui_tx: mpsc::UnboundedSender<UiEvent>) -> (RoomHandle, ShutdownHandle) {
	let (cmd_tx, cmd_rx) = mpsc::channel(64);
	let (shutdown_tx, shutdown_rx) = oneshot::channel();
	let join = tokio::spawn(run_room_task(cmd_rx, ui_tx, shutdown_rx, deps));
	(RoomHandle::new(cmd_tx), ShutdownHandle::new(shutdown_tx, join))
}

/// Async completions, tagged with the session that started them.
enum Completion {
	History {
		session: u64,
		result: Result<History, ClientCoreError>,
		initial: bool,
	},
	LinkReady {
		session: u64,
		link: u64,
		result: Result<TransportLink, ClientCoreError>,
	},
	Transport {
		session: u64,
		input: TransportInput,
	},
	RestSent {
		session: u64,
		text: String,
		result: Result<(), ClientCoreError>,
	},
	BotReply {
		session: u64,
		event: Option<ChatEvent>,
	},
	WelcomeDue {
		session: u64,
	},
}

impl Completion {
	fn session(&self) -> u64 {
		match self {
			Completion::History { session, .. }
			| Completion::LinkReady { session, .. }
			| Completion::Transport { session, .. }
			| Completion::RestSent { session, .. }
			| Completion::BotReply { session, .. }
			| Completion::WelcomeDue { session } => *session,
		}
	}
}

struct ActiveLink {
	link: u64,
	tx: mpsc::UnboundedSender<LinkCommand>,
	forwarder: JoinHandle<()>,
}

pub async fn run_room_task(
	mut cmd_rx: mpsc::Receiver<RoomCommand>,
	ui_tx: mpsc::UnboundedSender<UiEvent>,
	mut shutdown_rx: oneshot::Receiver<()>,
	deps: RoomDeps,
) {
	let (done_tx, mut done_rx) = mpsc::unbounded_channel();
	let mut task = RoomTask::new(deps, ui_tx, done_tx);

	loop {
		tokio::select! {
			_ = &mut shutdown_rx => {
				task.teardown("shutdown");
				break;
			}

			cmd = cmd_rx.recv() => {
				let Some(cmd) = cmd else {
					task.teardown("room handle dropped");
					break;
				};
				task.on_command(cmd);
			}

			Some(done) = done_rx.recv() => {
				task.on_completion(done);
			}
		}
	}
	debug!("room task finished");
}

struct RoomTask {
	deps: RoomDeps,
	ui_tx: mpsc::UnboundedSender<UiEvent>,
	done_tx: mpsc::UnboundedSender<Completion>,

	session: u64,
	room: Option<RoomDescriptor>,
	store: MessageStore,
	participants: u64,
	transport: TransportSession,
	link: Option<ActiveLink>,

	connect_task: Option<JoinHandle<()>>,
	reconnect_timer: Option<JoinHandle<()>>,
	welcome_timer: Option<JoinHandle<()>>,
	background: Vec<JoinHandle<()>>,

	welcome_scheduled: bool,
	loading: bool,
	sending: bool,
	error: Option<String>,
	restored_input: Option<String>,
}

impl RoomTask {
	fn new(deps: RoomDeps, ui_tx: mpsc::UnboundedSender<UiEvent>, done_tx: mpsc::UnboundedSender<Completion>) -> Self {
		let transport = TransportSession::new(deps.settings.reconnect);
		Self {
			deps,
			ui_tx,
			done_tx,
			session: 0,
			room: None,
			store: MessageStore::new(),
			participants: 0,
			transport,
			link: None,
			connect_task: None,
			reconnect_timer: None,
			welcome_timer: None,
			background: Vec::new(),
			welcome_scheduled: false,
			loading: false,
			sending: false,
			error: None,
			restored_input: None,
		}
	}

	fn on_command(&mut self, cmd: RoomCommand) {
		match cmd {
			RoomCommand::Enter { room } => self.enter(room),
			RoomCommand::SendMessage { text } => self.send_message(text),
			RoomCommand::Exit => {
				info!(room = ?self.room, "exiting room");
				self.teardown("exit");
				let _ = self.ui_tx.send(UiEvent::Disconnected {
					reason: "exit".to_string(),
				});
			}
			RoomCommand::Snapshot { reply } => {
				let _ = reply.send(self.view());
			}
		}
	}

	fn on_completion(&mut self, done: Completion) {
		if done.session() != self.session {
			debug!(
				session = done.session(),
				current = self.session,
				"dropping completion from superseded session"
			);
			return;
		}

		match done {
			Completion::History {
				result, initial, ..
			} => self.on_history(result, initial),
			Completion::LinkReady { link, result, .. } => self.on_link_ready(link, result),
			Completion::Transport { input, .. } => {
				let closed = match &input {
					TransportInput::LinkClosed { link, .. } => Some(*link),
					_ => None,
				};
				let fx = self.transport.handle(input);
				self.apply(fx);
				if let Some(link) = closed
					&& self.link.as_ref().is_some_and(|l| l.link == link)
				{
					self.link = None;
				}
			}
			Completion::RestSent { text, result, .. } => self.on_rest_sent(text, result),
			Completion::BotReply { event, .. } => {
				if let Some(event) = event {
					self.append(event);
				}
			}
			Completion::WelcomeDue { .. } => {
				self.welcome_timer = None;
				if self.store.has_bot_message() {
					return;
				}
				if let Some(user) = self.deps.auth.current_user() {
					self.append(bot::entry_welcome(&user.username));
				}
			}
		}
	}

	fn enter(&mut self, room: RoomDescriptor) {
		if self.room.is_some() {
			self.teardown("room switch");
		}
		self.session = self.session.wrapping_add(1);
		info!(room = %room, session = self.session, "entering room");
		self.room = Some(room.clone());
		self.loading = true;
		self.spawn_history(room, true, None);
	}

	/// Fetch history, then optionally run `command` through the bot, posting both in order.
	fn spawn_history(&mut self, room: RoomDescriptor, initial: bool, command: Option<String>) {
		let chat = self.deps.chat.clone();
		let games = self.deps.games.clone();
		let auth = self.deps.auth.clone();
		let tx = self.done_tx.clone();
		let session = self.session;
		let handle = tokio::spawn(async move {
			let result = chat.fetch_history(&room).await;
			let _ = tx.send(Completion::History {
				session,
				result,
				initial,
			});
			if let Some(text) = command {
				let user = auth.current_user();
				let event = bot::interpret(&text, user.as_ref(), games.as_ref()).await;
				let _ = tx.send(Completion::BotReply { session, event });
			}
		});
		self.track(handle);
	}

	fn spawn_bot(&mut self, text: String) {
		let games = self.deps.games.clone();
		let auth = self.deps.auth.clone();
		let tx = self.done_tx.clone();
		let session = self.session;
		let handle = tokio::spawn(async move {
			let user = auth.current_user();
			let event = bot::interpret(&text, user.as_ref(), games.as_ref()).await;
			let _ = tx.send(Completion::BotReply { session, event });
		});
		self.track(handle);
	}

	fn track(&mut self, handle: JoinHandle<()>) {
		self.background.retain(|h| !h.is_finished());
		self.background.push(handle);
	}

	fn on_history(&mut self, result: Result<History, ClientCoreError>, initial: bool) {
		if initial {
			self.loading = false;
		}

		let mut auth_failed = false;
		match result {
			Ok(history) => {
				debug!(count = history.events.len(), initial, "history loaded");
				if let Some(count) = history.participants_count {
					self.set_participants(count);
				}
				let start = self.store.len();
				if self.store.merge(history.events) > 0 {
					self.emit_appended(start);
				}
				if initial {
					self.maybe_schedule_welcome();
				}
			}
			Err(e) => {
				warn!(error = %e, initial, "history load failed");
				let message = if e.status() == Some(400) {
					MSG_HISTORY_EMPTY
				} else {
					MSG_HISTORY_FAILED
				};
				self.set_error(Some(message.to_string()));
				if e.is_auth() {
					auth_failed = true;
					let _ = self.ui_tx.send(UiEvent::AuthFailed);
				}
			}
		}

		if initial && !auth_failed {
			self.open_transport();
		}
	}

	fn maybe_schedule_welcome(&mut self) {
		if self.welcome_scheduled || self.store.is_empty() || self.store.has_bot_message() {
			return;
		}
		self.welcome_scheduled = true;
		let delay = self.deps.settings.entry_welcome_delay;
		let tx = self.done_tx.clone();
		let session = self.session;
		self.welcome_timer = Some(tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			let _ = tx.send(Completion::WelcomeDue { session });
		}));
	}

	fn open_transport(&mut self) {
		let Some(room) = self.room.clone() else {
			return;
		};
		let fx = self.transport.handle(TransportInput::Open { room });
		self.apply(fx);
	}

	fn on_link_ready(&mut self, link: u64, result: Result<TransportLink, ClientCoreError>) {
		self.connect_task = None;
		if link != self.transport.current_link() || self.transport.state() != TransportState::Connecting {
			debug!(link, "dropping link that is no longer wanted");
			return;
		}

		let fx = match result {
			Ok(TransportLink { tx, rx }) => {
				let forwarder = tokio::spawn(forward_link_frames(rx, self.session, link, self.done_tx.clone()));
				self.link = Some(ActiveLink { link, tx, forwarder });
				self.transport.handle(TransportInput::LinkOpened { link })
			}
			Err(e) => match rejection_close_code(&e) {
				Some(code) => {
					warn!(link, code, error = %e, "transport handshake refused");
					self.transport.handle(TransportInput::LinkClosed {
						link,
						code,
						reason: e.to_string(),
					})
				}
				None => self.transport.handle(TransportInput::ConnectFailed {
					link,
					error: e.to_string(),
				}),
			},
		};
		self.apply(fx);
	}

	fn apply(&mut self, fx: Vec<TransportEffect>) {
		for effect in fx {
			match effect {
				TransportEffect::Connect { link, room } => self.connect(link, room),
				TransportEffect::Send { link, text } => match &self.link {
					Some(active) if active.link == link => {
						if active.tx.send(LinkCommand::Text(text)).is_err() {
							warn!(link, "transport link is gone; message not sent");
						}
					}
					_ => warn!(link, "no active link for send"),
				},
				TransportEffect::CloseLink { link, code, reason } => {
					if let Some(t) = self.connect_task.take() {
						t.abort();
					}
					if let Some(active) = self.link.take_if(|l| l.link == link) {
						let _ = active.tx.send(LinkCommand::Close { code, reason });
						active.forwarder.abort();
					}
				}
				TransportEffect::ScheduleReconnect { link, attempt, delay } => {
					if let Some(t) = self.reconnect_timer.take() {
						t.abort();
					}
					let (deadline, next_retry_in_ms) = schedule_reconnect(delay);
					let tx = self.done_tx.clone();
					let session = self.session;
					self.reconnect_timer = Some(tokio::spawn(async move {
						tokio::time::sleep_until(deadline).await;
						let _ = tx.send(Completion::Transport {
							session,
							input: TransportInput::ReconnectDue { link },
						});
					}));
					let _ = self.ui_tx.send(UiEvent::Reconnecting {
						attempt,
						next_retry_in_ms,
					});
				}
				TransportEffect::CancelReconnect => {
					if let Some(t) = self.reconnect_timer.take() {
						t.abort();
					}
				}
				TransportEffect::Deliver(event) => self.on_server_event(event),
				TransportEffect::StateChanged(state) => {
					let room = self.room.clone();
					let ev = match (state, room) {
						(stockchat_domain::ConnectionState::Connecting, Some(room)) => UiEvent::Connecting { room },
						(stockchat_domain::ConnectionState::Open, Some(room)) => UiEvent::Connected { room },
						_ => UiEvent::Disconnected {
							reason: "closed".to_string(),
						},
					};
					let _ = self.ui_tx.send(ev);
				}
				TransportEffect::ErrorChanged(error) => {
					if matches!(error, Some(TransportError::AuthRejected)) {
						let _ = self.ui_tx.send(UiEvent::AuthFailed);
					}
					self.set_error(error.map(|e| e.to_string()));
				}
			}
		}
	}

	fn connect(&mut self, link: u64, room: RoomDescriptor) {
		if let Some(t) = self.connect_task.take() {
			t.abort();
		}

		let token = self.deps.auth.access_token();
		let url = match room_ws_url(
			&self.deps.settings.ws_base_url,
			&room,
			token.as_ref().map(|t| t.expose()),
		) {
			Ok(url) => url,
			Err(e) => {
				warn!(error = %e, "cannot build transport url");
				let _ = self.done_tx.send(Completion::Transport {
					session: self.session,
					input: TransportInput::ConnectFailed {
						link,
						error: e.to_string(),
					},
				});
				return;
			}
		};

		let connector = self.deps.connector.clone();
		let timeout = self.deps.settings.connect_timeout;
		let tx = self.done_tx.clone();
		let session = self.session;
		self.connect_task = Some(tokio::spawn(async move {
			let result = match tokio::time::timeout(timeout, connector(url)).await {
				Ok(result) => result,
				Err(_) => Err(ClientCoreError::Timeout(format!(
					"transport connect exceeded {}ms",
					timeout.as_millis()
				))),
			};
			let _ = tx.send(Completion::LinkReady { session, link, result });
		}));
	}

	fn on_server_event(&mut self, event: ServerEvent) {
		let me = self.deps.auth.current_user();
		match event {
			ServerEvent::ChatMessage(event) => {
				let own = me.as_ref().is_some_and(|u| u.username == event.author.username());
				let command = (own && event.is_command()).then(|| event.content.clone());
				if self.append(event)
					&& let Some(text) = command
				{
					self.spawn_bot(text);
				}
			}
			ServerEvent::UserJoined {
				username,
				participants_count,
			} => {
				if let Some(count) = participants_count {
					self.set_participants(count);
				}
				let is_me = me.as_ref().is_some_and(|u| u.username == username);
				if !is_me && !self.store.contains_bot_content(&bot::texts::join_welcome(&username)) {
					self.append(bot::join_welcome(&username));
				}
			}
			ServerEvent::UserLeft { participants_count } => {
				if let Some(count) = participants_count {
					self.set_participants(count);
				}
			}
			ServerEvent::ConnectionEstablished => {}
		}
	}

	fn send_message(&mut self, text: String) {
		let content = text.trim().to_string();
		if content.is_empty() {
			return;
		}
		let Some(room) = self.room.clone() else {
			warn!("send_message without an active room");
			return;
		};
		self.restored_input = None;

		if self.transport.is_open() {
			match self.transport.send(&content) {
				Ok(effect) => self.apply(vec![effect]),
				Err(e) => warn!(error = %e, "transport send rejected"),
			}
			return;
		}

		if self.sending {
			debug!("fallback send already in flight");
			self.restore_input(content);
			return;
		}

		self.sending = true;
		let chat = self.deps.chat.clone();
		let tx = self.done_tx.clone();
		let session = self.session;
		let handle = tokio::spawn(async move {
			let result = chat.send_message(&room, &content).await;
			let _ = tx.send(Completion::RestSent {
				session,
				text: content,
				result,
			});
		});
		self.track(handle);
	}

	fn on_rest_sent(&mut self, text: String, result: Result<(), ClientCoreError>) {
		self.sending = false;
		match result {
			Ok(()) => {
				let Some(room) = self.room.clone() else {
					return;
				};
				let command = bot::parse_command(&text).map(|_| text);
				self.spawn_history(room, false, command);
			}
			Err(e) => {
				warn!(error = %e, "fallback send failed");
				self.restore_input(text);
				self.set_error(Some(MSG_SEND_FAILED.to_string()));
				if e.is_auth() {
					let _ = self.ui_tx.send(UiEvent::AuthFailed);
				}
			}
		}
	}

	fn restore_input(&mut self, text: String) {
		self.restored_input = Some(text.clone());
		let _ = self.ui_tx.send(UiEvent::InputRestored { text });
	}

	fn append(&mut self, event: ChatEvent) -> bool {
		let start = self.store.len();
		if self.store.append(event) {
			self.emit_appended(start);
			true
		} else {
			false
		}
	}

	fn emit_appended(&self, start: usize) {
		let appended: Vec<ChatEvent> = self.store.events()[start..]
			.iter()
			.filter(|e| !e.is_temporary())
			.cloned()
			.collect();
		if !appended.is_empty() {
			let _ = self.ui_tx.send(UiEvent::TimelineChanged {
				revision: self.store.revision(),
				appended,
			});
		}
	}

	fn set_participants(&mut self, count: u64) {
		if self.participants != count {
			self.participants = count;
			let _ = self.ui_tx.send(UiEvent::ParticipantsChanged { count });
		}
	}

	fn set_error(&mut self, error: Option<String>) {
		if self.error == error {
			return;
		}
		self.error = error.clone();
		match error {
			Some(message) => ui_send_error(&self.ui_tx, message),
			None => {
				let _ = self.ui_tx.send(UiEvent::ErrorCleared);
			}
		}
	}

	/// Close the transport, cancel timers and in-flight work, drop room state.
	fn teardown(&mut self, reason: &str) {
		let fx = self.transport.handle(TransportInput::Close {
			reason: reason.to_string(),
		});
		self.apply(fx);
		// The forwarder is aborted below, so the link's own close never arrives.
		if self.transport.state() == TransportState::Closing {
			let fx = self.transport.handle(TransportInput::LinkClosed {
				link: self.transport.current_link(),
				code: close_code::NORMAL,
				reason: reason.to_string(),
			});
			self.apply(fx);
		}

		if let Some(active) = self.link.take() {
			let _ = active.tx.send(LinkCommand::Close {
				code: close_code::NORMAL,
				reason: reason.to_string(),
			});
			active.forwarder.abort();
		}
		for t in [
			self.connect_task.take(),
			self.reconnect_timer.take(),
			self.welcome_timer.take(),
		]
		.into_iter()
		.flatten()
		{
			t.abort();
		}
		for t in self.background.drain(..) {
			t.abort();
		}

		self.session = self.session.wrapping_add(1);
		self.room = None;
		self.store.clear();
		self.participants = 0;
		self.welcome_scheduled = false;
		self.loading = false;
		self.sending = false;
		self.error = None;
		self.restored_input = None;
	}

	fn view(&self) -> RoomView {
		RoomView {
			room: self.room.clone(),
			timeline: self.store.effective_timeline().cloned().collect(),
			revision: self.store.revision(),
			participants_count: self.participants,
			connection: self.transport.connection_state(),
			transport: self.transport.state(),
			error: self.error.clone(),
			loading: self.loading,
			sending: self.sending,
			restored_input: self.restored_input.clone(),
		}
	}
}

async fn forward_link_frames(
	mut rx: mpsc::UnboundedReceiver<LinkFrame>,
	session: u64,
	link: u64,
	done_tx: mpsc::UnboundedSender<Completion>,
) {
	while let Some(frame) = rx.recv().await {
		let (input, last) = match frame {
			LinkFrame::Text(text) => (TransportInput::LinkText { link, text }, false),
			LinkFrame::Error(error) => (TransportInput::LinkError { link, error }, false),
			LinkFrame::Closed { code, reason } => (TransportInput::LinkClosed { link, code, reason }, true),
		};
		if done_tx.send(Completion::Transport { session, input }).is_err() || last {
			return;
		}
	}
	let _ = done_tx.send(Completion::Transport {
		session,
		input: TransportInput::LinkClosed {
			link,
			code: close_code::ABNORMAL,
			reason: "link dropped".to_string(),
		},
	});
}
