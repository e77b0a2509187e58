//! Local command bot: maps `!`-prefixed input to a synthetic bot event.

mod id;
pub mod texts;

use stockchat_client_core::GameApi;
use stockchat_domain::{Author, ChatEvent, UserProfile};
use stockchat_protocol::{BaccaratBet, IndianPokerAction, RspChoice};
use tracing::{debug, warn};

pub use id::generate_bot_message_id;

pub const COMMAND_SIGIL: char = '!';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameKind {
	Rsp,
	Baccarat,
	IndianPoker,
}

/// A game command whose argument has been validated and normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameCommand {
	Rsp(RspChoice),
	Baccarat(BaccaratBet),
	IndianPoker(IndianPokerAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
	Help,
	GameList,
	Points,
	Ranking,
	Play(GameCommand),
	/// Game command with a missing or unaccepted argument.
	Usage(GameKind),
	Unknown,
}

fn game_kind(name: &str) -> Option<GameKind> {
	match name {
		"!가위바위보" | "!rps" => Some(GameKind::Rsp),
		"!바카라" | "!baccarat" => Some(GameKind::Baccarat),
		"!인디언포커" | "!poker" => Some(GameKind::IndianPoker),
		_ => None,
	}
}

// Argument spellings are matched case-sensitively.
fn game_arg(kind: GameKind, arg: &str) -> Option<GameCommand> {
	match kind {
		GameKind::Rsp => match arg {
			"가위" | "scissors" => Some(GameCommand::Rsp(RspChoice::Scissors)),
			"바위" | "rock" => Some(GameCommand::Rsp(RspChoice::Rock)),
			"보" | "paper" => Some(GameCommand::Rsp(RspChoice::Paper)),
			_ => None,
		},
		GameKind::Baccarat => match arg {
			"플레이어" | "player" => Some(GameCommand::Baccarat(BaccaratBet::Player)),
			"뱅커" | "banker" => Some(GameCommand::Baccarat(BaccaratBet::Banker)),
			"타이" | "tie" => Some(GameCommand::Baccarat(BaccaratBet::Tie)),
			_ => None,
		},
		GameKind::IndianPoker => match arg {
			"콜" | "call" => Some(GameCommand::IndianPoker(IndianPokerAction::Call)),
			"폴드" | "fold" => Some(GameCommand::IndianPoker(IndianPokerAction::Fold)),
			_ => None,
		},
	}
}

/// Classify input. `None` means the text is not a command at all.
pub fn parse_command(text: &str) -> Option<BotCommand> {
	let text = text.trim_end();
	if !text.starts_with(COMMAND_SIGIL) {
		return None;
	}

	let mut tokens = text.split_whitespace();
	let name = tokens.next().unwrap_or_default().to_lowercase();
	let args: Vec<&str> = tokens.collect();

	if let Some(kind) = game_kind(&name) {
		return Some(match args.as_slice() {
			[arg] => game_arg(kind, arg).map_or(BotCommand::Usage(kind), BotCommand::Play),
			_ => BotCommand::Usage(kind),
		});
	}

	if !args.is_empty() {
		return Some(BotCommand::Unknown);
	}

	Some(match name.as_str() {
		"!명령어" | "!챗봇" | "!help" => BotCommand::Help,
		"!게임" | "!games" => BotCommand::GameList,
		"!포인트" | "!points" => BotCommand::Points,
		"!랭킹" | "!ranking" => BotCommand::Ranking,
		_ => BotCommand::Unknown,
	})
}

/// Build a bot-authored event.
pub fn bot_event(prefix: &str, content: impl Into<String>) -> ChatEvent {
	ChatEvent {
		id: generate_bot_message_id(prefix),
		content: content.into(),
		created_at: chrono::Utc::now().to_rfc3339(),
		author: Author::Bot,
	}
}

pub fn entry_welcome(username: &str) -> ChatEvent {
	bot_event("bot-welcome", texts::entry_welcome(username))
}

pub fn join_welcome(username: &str) -> ChatEvent {
	bot_event("bot-join", texts::join_welcome(username))
}

/// Run `text` through the bot.
///
/// Returns `None` for non-commands without touching `games`. Game failures
/// become bot replies; this never fails.
pub async fn interpret(text: &str, user: Option<&UserProfile>, games: &dyn GameApi) -> Option<ChatEvent> {
	let command = parse_command(text)?;
	debug!(?command, "bot command");

	let event = match command {
		BotCommand::Help => bot_event("bot-commands", texts::COMMAND_LIST),
		BotCommand::GameList => bot_event("bot-games", texts::GAME_LIST),
		BotCommand::Points => bot_event("bot-points", texts::points(user)),
		BotCommand::Ranking => bot_event("bot-ranking", texts::RANKING),
		BotCommand::Usage(kind) => bot_event("bot-usage", texts::usage(kind)),
		BotCommand::Unknown => bot_event("bot-unknown", texts::UNKNOWN),
		BotCommand::Play(game) => bot_event("bot-game", play(game, games).await),
	};
	Some(event)
}

async fn play(game: GameCommand, games: &dyn GameApi) -> String {
	let result = match game {
		GameCommand::Rsp(choice) => games.play_rsp(choice).await.map(|r| texts::rsp_result(&r)),
		GameCommand::Baccarat(bet) => games.play_baccarat(bet).await.map(|r| texts::baccarat_result(&r)),
		GameCommand::IndianPoker(action) => games
			.play_indian_poker(action)
			.await
			.map(|r| texts::indian_poker_result(&r)),
	};
	result.unwrap_or_else(|e| {
		warn!(?game, error = %e, "game request failed");
		texts::game_error(&e)
	})
}
