#![forbid(unsafe_code)]

pub mod bot;
pub mod net;
pub mod store;
pub mod transport;

pub use net::{RoomDeps, RoomHandle, RoomSettings, RoomView, ShutdownHandle, UiEvent, spawn_room_task};
pub use store::MessageStore;
pub use transport::{TransportEffect, TransportError, TransportInput, TransportSession, TransportState};
