//! Response shapes of the NBA data feed. Counts and scores arrive as strings.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ScoreboardResponse {
    #[serde(default)]
    pub games: Vec<ScoreboardGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardGame {
    pub game_id: String,
    #[serde(rename = "startTimeUTC")]
    pub start_time_utc: DateTime<Utc>,
    /// 1 scheduled, 2 in progress, 3 final
    pub status_num: i64,
    #[serde(default)]
    pub period: PeriodInfo,
    #[serde(default)]
    pub clock: String,
    #[serde(default)]
    pub arena: Option<Arena>,
    pub h_team: ScoreboardTeam,
    pub v_team: ScoreboardTeam,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodInfo {
    #[serde(default)]
    pub current: u32,
    #[serde(default)]
    pub is_halftime: bool,
    #[serde(default)]
    pub is_end_of_period: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardTeam {
    pub team_id: String,
    pub tri_code: String,
    #[serde(default)]
    pub win: String,
    #[serde(default)]
    pub loss: String,
    #[serde(default)]
    pub score: String,
}

#[derive(Debug, Deserialize)]
pub struct Arena {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct PlayByPlayResponse {
    #[serde(default)]
    pub plays: Vec<NbaPlay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NbaPlay {
    pub clock: String,
    pub event_msg_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub person_id: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub h_team_score: String,
    #[serde(default)]
    pub v_team_score: String,
}

impl NbaPlay {
    pub fn home_score(&self) -> i64 {
        self.h_team_score.trim().parse().unwrap_or(0)
    }

    pub fn away_score(&self) -> i64 {
        self.v_team_score.trim().parse().unwrap_or(0)
    }
}
