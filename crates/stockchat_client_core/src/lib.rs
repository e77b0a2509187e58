#![forbid(unsafe_code)]

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ws;

pub use api::{ApiClient, ChatApi, GameApi, History, ProfileApi};
pub use auth::{AuthProvider, SecretString, SharedAuth};
pub use config::{ClientConfig, default_config_path, load_client_config, load_client_config_from_path};
pub use error::ClientCoreError;
pub use ws::{
	BoxFuture, LinkCommand, LinkConnector, LinkFrame, TransportLink, default_connector, rejection_close_code,
	room_ws_url,
};
