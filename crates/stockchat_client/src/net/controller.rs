use stockchat_domain::RoomDescriptor;
use tokio::sync::{mpsc, oneshot};

use super::types::RoomView;

#[derive(Debug)]
pub enum RoomCommand {
	Enter { room: RoomDescriptor },
	SendMessage { text: String },
	Exit,
	Snapshot { reply: oneshot::Sender<RoomView> },
}

/// Cloneable handle to a running room task.
#[derive(Clone)]
pub struct RoomHandle {
	pub(super) cmd_tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
	pub fn new(cmd_tx: mpsc::Sender<RoomCommand>) -> Self {
		Self { cmd_tx }
	}

	pub async fn enter(&self, room: RoomDescriptor) -> Result<(), String> {
		self.cmd_tx
			.send(RoomCommand::Enter { room })
			.await
			.map_err(|_| "room task is not running".to_string())
	}

	pub async fn send_message(&self, text: impl Into<String>) -> Result<(), String> {
		self.cmd_tx
			.send(RoomCommand::SendMessage { text: text.into() })
			.await
			.map_err(|_| "room task is not running".to_string())
	}

	pub async fn exit(&self) -> Result<(), String> {
		self.cmd_tx
			.send(RoomCommand::Exit)
			.await
			.map_err(|_| "room task is not running".to_string())
	}

	pub async fn snapshot(&self) -> Result<RoomView, String> {
		let (reply, rx) = oneshot::channel();
		self.cmd_tx
			.send(RoomCommand::Snapshot { reply })
			.await
			.map_err(|_| "room task is not running".to_string())?;
		rx.await.map_err(|_| "room task dropped the snapshot request".to_string())
	}
}

pub struct ShutdownHandle {
	pub(super) shutdown_tx: oneshot::Sender<()>,
	pub(super) join_handle: tokio::task::JoinHandle<()>,
}

impl ShutdownHandle {
	pub fn new(shutdown_tx: oneshot::Sender<()>, join_handle: tokio::task::JoinHandle<()>) -> Self {
		Self {
			shutdown_tx,
			join_handle,
		}
	}

	/// Stop the room task (closing its transport) and wait for it to finish.
	pub async fn shutdown(self) {
		let _ = self.shutdown_tx.send(());
		let _ = self.join_handle.await;
	}
}
