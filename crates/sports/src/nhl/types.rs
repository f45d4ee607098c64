//! Response shapes of the NHL stats API (only the fields we read).

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ScheduleResponse {
    #[serde(default)]
    pub dates: Vec<ScheduleDate>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleDate {
    pub date: NaiveDate,
    #[serde(default)]
    pub games: Vec<ScheduleGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleGame {
    pub game_pk: i64,
    pub game_date: DateTime<Utc>,
    pub status: GameStatus,
    pub teams: ScheduleTeams,
    #[serde(default)]
    pub linescore: Option<ScheduleLinescore>,
    #[serde(default)]
    pub venue: Option<Venue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatus {
    pub abstract_game_state: String,
    /// Numeric code as a string: 1-2 pre-game, 3-4 in progress, 5+ final
    pub coded_game_state: String,
}

impl GameStatus {
    pub fn code(&self) -> i64 {
        self.coded_game_state.trim().parse().unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleTeams {
    pub home: ScheduleTeam,
    pub away: ScheduleTeam,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTeam {
    pub team: TeamRef,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub league_record: Option<LeagueRecord>,
}

#[derive(Debug, Deserialize)]
pub struct TeamRef {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeagueRecord {
    #[serde(default)]
    pub wins: i64,
    #[serde(default)]
    pub losses: i64,
    #[serde(default)]
    pub ot: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleLinescore {
    #[serde(default)]
    pub current_period: u32,
    #[serde(default)]
    pub current_period_time_remaining: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Venue {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveFeed {
    pub game_data: LiveGameData,
    pub live_data: LiveData,
}

#[derive(Debug, Deserialize)]
pub struct LiveGameData {
    pub status: GameStatus,
}

#[derive(Debug, Deserialize)]
pub struct LiveData {
    #[serde(default)]
    pub plays: Plays,
    pub linescore: Linescore,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plays {
    #[serde(default)]
    pub all_plays: Vec<Play>,
}

#[derive(Debug, Deserialize)]
pub struct Play {
    pub result: PlayResult,
    pub about: PlayAbout,
    #[serde(default)]
    pub coordinates: Coordinates,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResult {
    pub event_type_id: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayAbout {
    pub period: u32,
    pub period_time: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Coordinates {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Linescore {
    #[serde(default)]
    pub current_period: u32,
    #[serde(default)]
    pub current_period_time_remaining: Option<String>,
    pub teams: LinescoreTeams,
    #[serde(default)]
    pub intermission_info: Option<IntermissionInfo>,
}

#[derive(Debug, Deserialize)]
pub struct LinescoreTeams {
    pub home: LinescoreTeam,
    pub away: LinescoreTeam,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinescoreTeam {
    pub team: TeamRef,
    #[serde(default)]
    pub goals: i64,
    #[serde(default)]
    pub shots_on_goal: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntermissionInfo {
    #[serde(default)]
    pub in_intermission: bool,
}
