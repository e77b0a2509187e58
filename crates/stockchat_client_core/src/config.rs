use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, anyhow};
use serde::Deserialize;
use stockchat_util::endpoint::ServerEndpoint;
use tracing::{info, warn};

use crate::auth::SecretString;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_ENTRY_WELCOME_DELAY: Duration = Duration::from_secs(1);

/// Default config path: `~/.stockchat/config.toml`.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
	let home = dirs::home_dir().ok_or_else(|| anyhow!("could not determine home directory"))?;
	Ok(home.join(".stockchat").join("config.toml"))
}

/// Load the client config from TOML and env overrides.
pub fn load_client_config() -> anyhow::Result<ClientConfig> {
	let path = default_config_path()?;
	load_client_config_from_path(&path)
}

/// Same as `load_client_config` but with an explicit config path.
pub fn load_client_config_from_path(path: &Path) -> anyhow::Result<ClientConfig> {
	let file_cfg = read_toml_if_exists(path)
		.with_context(|| format!("read config from {}", path.display()))?
		.unwrap_or_default();

	let mut cfg = ClientConfig::from_file(file_cfg)?;

	apply_env_overrides(&mut cfg);

	Ok(cfg)
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
	/// REST base, e.g. `http://localhost:8000/api`.
	pub api: ServerEndpoint,
	/// Explicit transport endpoint; derived from `api` when unset.
	pub ws: Option<ServerEndpoint>,
	pub request_timeout: Duration,
	/// Limit for a single transport connect attempt.
	pub connect_timeout: Duration,
	pub reconnect_delay: Duration,
	/// `None` retries forever.
	pub reconnect_max_attempts: Option<u32>,
	pub entry_welcome_delay: Duration,
	pub access_token: Option<SecretString>,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			api: ServerEndpoint {
				secure: false,
				host: "localhost".to_string(),
				port: Some(8000),
				path: "/api".to_string(),
			},
			ws: None,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			reconnect_delay: DEFAULT_RECONNECT_DELAY,
			reconnect_max_attempts: None,
			entry_welcome_delay: DEFAULT_ENTRY_WELCOME_DELAY,
			access_token: None,
		}
	}
}

impl ClientConfig {
	pub fn api_base_url(&self) -> String {
		self.api.http_base()
	}

	pub fn ws_base_url(&self) -> String {
		self.ws.as_ref().unwrap_or(&self.api).ws_base()
	}

	/// Replace the API endpoint from a `http(s)://host[:port][/path]` string.
	pub fn set_api_url(&mut self, url: &str) -> anyhow::Result<()> {
		self.api = ServerEndpoint::parse(url).map_err(|e| anyhow!(e)).context("api url")?;
		Ok(())
	}

	/// Pin the transport endpoint instead of deriving it from the API host.
	pub fn set_ws_url(&mut self, url: &str) -> anyhow::Result<()> {
		self.ws = Some(ServerEndpoint::parse(url).map_err(|e| anyhow!(e)).context("ws url")?);
		Ok(())
	}

	fn from_file(file: FileConfig) -> anyhow::Result<Self> {
		let mut cfg = Self::default();

		if let Some(url) = file.server.api_url.filter(|s| !s.trim().is_empty()) {
			cfg.set_api_url(&url)?;
		}
		if let Some(url) = file.server.ws_url.filter(|s| !s.trim().is_empty()) {
			cfg.set_ws_url(&url)?;
		}

		cfg.access_token = file.access_token.filter(|s| !s.trim().is_empty()).map(SecretString::new);

		if let Some(ms) = file.network.request_timeout_ms.filter(|v| *v > 0) {
			cfg.request_timeout = Duration::from_millis(ms);
		}
		if let Some(ms) = file.network.connect_timeout_ms.filter(|v| *v > 0) {
			cfg.connect_timeout = Duration::from_millis(ms);
		}
		if let Some(ms) = file.network.reconnect_delay_ms {
			cfg.reconnect_delay = Duration::from_millis(ms);
		}
		cfg.reconnect_max_attempts = file.network.reconnect_max_attempts.filter(|v| *v > 0);

		if let Some(ms) = file.chat.entry_welcome_delay_ms {
			cfg.entry_welcome_delay = Duration::from_millis(ms);
		}

		Ok(cfg)
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
	access_token: Option<String>,

	#[serde(default)]
	server: FileServerSettings,

	#[serde(default)]
	network: FileNetworkSettings,

	#[serde(default)]
	chat: FileChatSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileServerSettings {
	api_url: Option<String>,
	ws_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileNetworkSettings {
	request_timeout_ms: Option<u64>,
	connect_timeout_ms: Option<u64>,
	reconnect_delay_ms: Option<u64>,
	reconnect_max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FileChatSettings {
	entry_welcome_delay_ms: Option<u64>,
}

fn read_toml_if_exists(path: &Path) -> anyhow::Result<Option<FileConfig>> {
	match fs::read_to_string(path) {
		Ok(s) => {
			let cfg: FileConfig = toml::from_str(&s).context("parse TOML")?;
			Ok(Some(cfg))
		}
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
		Err(e) => Err(anyhow!(e).context("read config file")),
	}
}

fn apply_env_overrides(cfg: &mut ClientConfig) {
	apply_overrides(cfg, |key| std::env::var(key).ok());
}

fn apply_overrides(cfg: &mut ClientConfig, var: impl Fn(&str) -> Option<String>) {
	if let Some(v) = var("STOCKCHAT_API_URL") {
		let v = v.trim().to_string();
		if !v.is_empty() {
			match cfg.set_api_url(&v) {
				Ok(()) => info!("client config: api_url overridden by env"),
				Err(e) => warn!(error = %e, "client config: ignoring invalid STOCKCHAT_API_URL"),
			}
		}
	}

	if let Some(v) = var("STOCKCHAT_WS_URL") {
		let v = v.trim().to_string();
		if !v.is_empty() {
			match cfg.set_ws_url(&v) {
				Ok(()) => info!("client config: ws_url overridden by env"),
				Err(e) => warn!(error = %e, "client config: ignoring invalid STOCKCHAT_WS_URL"),
			}
		}
	}

	if let Some(v) = var("STOCKCHAT_ACCESS_TOKEN") {
		let v = v.trim().to_string();
		if !v.is_empty() {
			cfg.access_token = Some(SecretString::new(v));
			info!("client auth: access_token overridden by env");
		}
	}

	if let Some(v) = var("STOCKCHAT_REQUEST_TIMEOUT_MS")
		&& let Ok(ms) = v.trim().parse::<u64>()
		&& ms > 0
	{
		cfg.request_timeout = Duration::from_millis(ms);
		info!(ms, "client config: request_timeout overridden by env");
	}

	if let Some(v) = var("STOCKCHAT_CONNECT_TIMEOUT_MS")
		&& let Ok(ms) = v.trim().parse::<u64>()
		&& ms > 0
	{
		cfg.connect_timeout = Duration::from_millis(ms);
		info!(ms, "client config: connect_timeout overridden by env");
	}

	if let Some(v) = var("STOCKCHAT_RECONNECT_DELAY_MS")
		&& let Ok(ms) = v.trim().parse::<u64>()
	{
		cfg.reconnect_delay = Duration::from_millis(ms);
		info!(ms, "client config: reconnect_delay overridden by env");
	}

	if let Some(v) = var("STOCKCHAT_RECONNECT_MAX_ATTEMPTS")
		&& let Ok(max) = v.trim().parse::<u32>()
	{
		cfg.reconnect_max_attempts = (max > 0).then_some(max);
		info!(max, "client config: reconnect_max_attempts overridden by env");
	}
}
