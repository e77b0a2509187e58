#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use stockchat_client::net::RoomSettings;
use stockchat_client::{RoomDeps, UiEvent, spawn_room_task};
use stockchat_client_core::{
	ApiClient, ProfileApi, SharedAuth, default_config_path, default_connector, load_client_config_from_path,
};
use stockchat_domain::{RoomDescriptor, RoomId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn usage_and_exit() -> ! {
	eprintln!(
		"Usage: stockchat [--room ID | --loser] [--api URL] [--ws URL] [--config PATH]\n\
\n\
Options:\n\
\t--room     Stock room id\n\
\t--loser    Join the loser room\n\
\t--api      REST base url (default from config)\n\
\t--ws       Realtime base url (default derived from --api)\n\
\t--config   Config file (default: ~/.stockchat/config.toml)\n\
\t--help     Show this help\n\
"
	);
	std::process::exit(2)
}

struct Args {
	room: RoomDescriptor,
	api: Option<String>,
	ws: Option<String>,
	config: Option<PathBuf>,
}

fn parse_args() -> Args {
	let mut room = None;
	let mut api = None;
	let mut ws = None;
	let mut config = None;

	let mut it = std::env::args().skip(1);
	while let Some(arg) = it.next() {
		match arg.as_str() {
			"--help" | "-h" => usage_and_exit(),
			"--room" => {
				let v = it.next().unwrap_or_else(|| usage_and_exit());
				let id = RoomId::new(&v).unwrap_or_else(|e| {
					eprintln!("invalid room id {v:?}: {e}");
					usage_and_exit();
				});
				room = Some(RoomDescriptor::Stock(id));
			}
			"--loser" => room = Some(RoomDescriptor::Loser),
			"--api" => api = Some(it.next().unwrap_or_else(|| usage_and_exit())),
			"--ws" => ws = Some(it.next().unwrap_or_else(|| usage_and_exit())),
			"--config" => config = Some(PathBuf::from(it.next().unwrap_or_else(|| usage_and_exit()))),
			other => {
				eprintln!("Unknown argument: {other}");
				usage_and_exit();
			}
		}
	}

	let Some(room) = room else {
		eprintln!("one of --room or --loser is required");
		usage_and_exit();
	};

	Args { room, api, ws, config }
}

fn init_tracing() {
	let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,stockchat_client=debug".to_string());
	tracing_subscriber::registry()
		.with(tracing_subscriber::EnvFilter::new(filter))
		.with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
		.init();
}

fn render(ev: &UiEvent) {
	match ev {
		UiEvent::Connecting { room } => println!("* connecting to {room}"),
		UiEvent::Connected { room } => println!("* connected to {room}"),
		UiEvent::Disconnected { reason } => println!("* disconnected ({reason})"),
		UiEvent::Reconnecting {
			attempt,
			next_retry_in_ms,
		} => println!("* reconnecting (attempt {attempt}, in {next_retry_in_ms}ms)"),
		UiEvent::TimelineChanged { appended, .. } => {
			for e in appended {
				println!("[{}] {}: {}", e.created_at, e.author.display_name(), e.content);
			}
		}
		UiEvent::ParticipantsChanged { count } => println!("* {count} participants"),
		UiEvent::Error { message } => println!("! {message}"),
		UiEvent::ErrorCleared => {}
		UiEvent::InputRestored { text } => println!("* not sent, retry: {text}"),
		UiEvent::AuthFailed => println!("! authentication failed; check access_token"),
	}
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	init_tracing();
	let args = parse_args();

	let config_path = match args.config {
		Some(p) => p,
		None => default_config_path()?,
	};
	let mut cfg = load_client_config_from_path(&config_path)?;
	info!(path = %config_path.display(), "loaded client config (toml + env overrides)");
	if let Some(api) = args.api.as_deref() {
		cfg.set_api_url(api)?;
	}
	if let Some(ws) = args.ws.as_deref() {
		cfg.set_ws_url(ws)?;
	}

	let auth = SharedAuth::new(cfg.access_token.clone());
	let api = Arc::new(ApiClient::from_config(&cfg, Arc::new(auth.clone()))?);

	if cfg.access_token.is_some() {
		match api.fetch_profile().await {
			Ok(profile) => {
				info!(username = %profile.username, "signed in");
				auth.set_profile(Some(profile));
			}
			Err(e) => warn!(error = %e, "failed to load profile; bot commands run anonymously"),
		}
	} else {
		warn!("no access token configured; connecting anonymously");
	}

	let deps = RoomDeps {
		chat: api.clone(),
		games: api.clone(),
		auth: Arc::new(auth),
		connector: default_connector(),
		settings: RoomSettings::from_config(&cfg),
	};

	let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
	let (room, shutdown) = spawn_room_task(deps, ui_tx);
	room.enter(args.room).await.map_err(anyhow::Error::msg)?;

	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	loop {
		tokio::select! {
			ev = ui_rx.recv() => {
				let Some(ev) = ev else { break };
				render(&ev);
			}

			line = lines.next_line() => {
				match line? {
					Some(line) if line.trim() == "/quit" => break,
					Some(line) => {
						if let Err(e) = room.send_message(line).await {
							warn!(error = %e, "send failed");
							break;
						}
					}
					None => break,
				}
			}

			_ = tokio::signal::ctrl_c() => break,
		}
	}

	let _ = room.exit().await;
	shutdown.shutdown().await;
	Ok(())
}
