//! Room session controller.
//!
//! One task owns the message store and transport session for the active
//! room. Callers drive it through [`RoomHandle`] and observe it through
//! [`UiEvent`]s; completions of spawned work carry the session generation
//! that started them, so results for a room that was left are dropped.

pub mod backend;
pub mod controller;
pub mod reconnect;
pub mod types;

pub use backend::{MSG_HISTORY_EMPTY, MSG_HISTORY_FAILED, MSG_SEND_FAILED, RoomDeps, RoomSettings, spawn_room_task};
pub use controller::{RoomCommand, RoomHandle, ShutdownHandle};
pub use reconnect::ReconnectPolicy;
pub use types::{RoomView, UiEvent};
