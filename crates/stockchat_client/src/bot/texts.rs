use stockchat_client_core::ClientCoreError;
use stockchat_domain::UserProfile;
use stockchat_protocol::{
	BaccaratBet, BaccaratResult, GameOutcome, IndianPokerAction, IndianPokerResult, RspChoice, RspResult,
};

use super::GameKind;

pub fn entry_welcome(username: &str) -> String {
	format!("안녕하세요 {username}님! 미니게임 챗봇입니다. \n명령어 목록을 보려면 '!명령어'를 입력해주세요.")
}

pub fn join_welcome(username: &str) -> String {
	format!("{username}님이 입장하셨습니다. 환영합니다! 미니게임을 하려면 '!게임'을 입력해보세요.")
}

pub const COMMAND_LIST: &str = "📋 명령어 목록:
!명령어 - 사용 가능한 명령어 목록 표시
!게임 - 미니게임 목록 표시
!포인트 - 보유 포인트 확인
!랭킹 - 포인트 랭킹 확인

미니게임에서 승리하면 보너스 포인트를 획득할 수 있습니다!";

pub const GAME_LIST: &str = "🎮 미니게임 목록:
!가위바위보 [가위/바위/보] - 가위바위보 게임
!바카라 [플레이어/뱅커/타이] - 바카라 게임
!인디언포커 [콜/폴드] - 인디언 포커 게임

미니게임에서 승리하면 보너스 포인트를 획득할 수 있습니다!";

pub const RANKING: &str = "🏆 현재 포인트 랭킹은 준비 중입니다. 곧 업데이트될 예정입니다!";

pub const UNKNOWN: &str = "❓ 알 수 없는 명령어입니다. '!명령어'를 입력하여 사용 가능한 명령어를 확인하세요.";

pub const GAME_FAILED: &str = "⚠️ 게임 처리 중 오류가 발생했습니다. 잠시 후 다시 시도해주세요.";

pub fn points(user: Option<&UserProfile>) -> String {
	let name = user.map(UserProfile::display_name).unwrap_or("회원");
	let balance = user.and_then(|u| u.bonus_points).unwrap_or(0);
	format!(
		"💰 {name}님의 보유 포인트: {balance} 포인트\n\n매일 첫 접속 시 10포인트가 지급됩니다.\n미니게임에서 승리하면 추가 포인트를 획득할 수 있습니다!"
	)
}

pub fn usage(kind: GameKind) -> &'static str {
	match kind {
		GameKind::Rsp => "✂️ 사용법: !가위바위보 [가위/바위/보]\n예) !가위바위보 가위",
		GameKind::Baccarat => "🃏 사용법: !바카라 [플레이어/뱅커/타이]\n예) !바카라 뱅커",
		GameKind::IndianPoker => "🂠 사용법: !인디언포커 [콜/폴드]\n예) !인디언포커 콜",
	}
}

fn outcome(o: GameOutcome) -> &'static str {
	match o {
		GameOutcome::Win => "승리",
		GameOutcome::Lose => "패배",
		GameOutcome::Draw => "무승부",
	}
}

fn rsp(c: RspChoice) -> &'static str {
	match c {
		RspChoice::Scissors => "가위",
		RspChoice::Rock => "바위",
		RspChoice::Paper => "보",
	}
}

fn bet(b: BaccaratBet) -> &'static str {
	match b {
		BaccaratBet::Player => "플레이어",
		BaccaratBet::Banker => "뱅커",
		BaccaratBet::Tie => "타이",
	}
}

fn action(a: IndianPokerAction) -> &'static str {
	match a {
		IndianPokerAction::Call => "콜",
		IndianPokerAction::Fold => "폴드",
	}
}

fn points_lines(delta: Option<i64>, balance: Option<i64>) -> String {
	let mut out = String::new();
	if let Some(d) = delta {
		out.push_str(&format!("\n포인트 변동: {d:+}"));
	}
	if let Some(b) = balance {
		out.push_str(&format!("\n보유 포인트: {b} 포인트"));
	}
	out
}

pub fn rsp_result(r: &RspResult) -> String {
	format!(
		"✂️ 가위바위보 결과\n나: {} vs 챗봇: {}\n결과: {}!{}",
		rsp(r.user_choice),
		rsp(r.bot_choice),
		outcome(r.result),
		points_lines(None, r.bonus_points)
	)
}

pub fn baccarat_result(r: &BaccaratResult) -> String {
	format!(
		"🃏 바카라 결과\n베팅: {} / 결과: {}\n{}!{}",
		bet(r.user_bet),
		bet(r.outcome),
		outcome(r.result),
		points_lines(r.points_delta, r.bonus_points)
	)
}

pub fn indian_poker_result(r: &IndianPokerResult) -> String {
	let cards = match (r.user_card, r.dealer_card) {
		(Some(u), Some(d)) => format!("\n내 카드: {u} / 딜러 카드: {d}"),
		_ => String::new(),
	};
	format!(
		"🂠 인디언 포커 결과\n선택: {}{}\n{}!{}",
		action(r.action),
		cards,
		outcome(r.result),
		points_lines(r.points_delta, r.bonus_points)
	)
}

pub fn game_error(e: &ClientCoreError) -> String {
	match e.server_message() {
		Some(msg) => format!("⚠️ {msg}"),
		None => GAME_FAILED.to_string(),
	}
}
