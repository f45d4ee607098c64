use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;

use crate::adapter::SportAdapter;
use crate::error::AdapterError;
use crate::http::{JsonClient, DEFAULT_TIMEOUT};
use crate::lifecycle::LifecycleState;
use crate::types::{
    Cursor, PlayByPlay, PlayByPlayQuery, PollMetadata, ScheduleEntry, ScheduleQuery,
    ScheduleSnapshot,
};

use super::types::{LinescoreTeam, LiveFeed, Play, ScheduleGame, ScheduleResponse, ScheduleTeam};

pub const DEFAULT_BASE_URL: &str = "https://statsapi.web.nhl.com";

const SPORT: &str = "nhl";

/// Plays already delivered, zero-padded so string order is numeric order.
const CURSOR_WIDTH: usize = 6;

/// NHL schedule and live feed client
pub struct NhlAdapter {
    client: JsonClient,
}

impl NhlAdapter {
    pub fn new(base_url: String) -> Result<Self, AdapterError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: String, timeout: Duration) -> Result<Self, AdapterError> {
        Ok(Self {
            client: JsonClient::new(base_url, timeout)?,
        })
    }
}

impl std::fmt::Debug for NhlAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NhlAdapter")
            .field("base_url", &self.client.base_url())
            .finish()
    }
}

fn classify(code: i64) -> LifecycleState {
    match code {
        c if c >= 5 => LifecycleState::Complete,
        3 | 4 => LifecycleState::Live,
        _ => LifecycleState::Preview,
    }
}

fn cursor_for(plays_seen: usize) -> Cursor {
    Cursor::new(format!("{:0width$}", plays_seen, width = CURSOR_WIDTH))
}

fn schedule_team(team: &ScheduleTeam) -> Value {
    let record = team.league_record.as_ref().map(|r| format!("{}-{}-{}", r.wins, r.losses, r.ot));
    json!({
        "teamId": team.team.id,
        "name": team.team.name,
        "abbr": team.team.abbreviation,
        "record": record,
        "score": team.score,
    })
}

fn schedule_entry(game: &ScheduleGame) -> ScheduleEntry {
    let status_code = game.status.code();
    let linescore = game.linescore.as_ref();
    let details = json!({
        "id": game.game_pk,
        "date": game.game_date.to_rfc3339(),
        "status": game.status.abstract_game_state,
        "statusCode": status_code,
        "period": linescore.map(|l| l.current_period),
        "time": linescore.and_then(|l| l.current_period_time_remaining.clone()),
        "home": schedule_team(&game.teams.home),
        "away": schedule_team(&game.teams.away),
        "venue": game.venue.as_ref().map(|v| v.name.clone()),
    });
    ScheduleEntry {
        event_id: game.game_pk.to_string(),
        start_time: game.game_date,
        status_code,
        details,
    }
}

fn linescore_team(team: &LinescoreTeam) -> Value {
    json!({
        "name": team.team.name,
        "score": team.goals,
        "shots": team.shots_on_goal,
    })
}

fn play_json(play: &Play) -> Value {
    json!({
        "description": play.result.description,
        "typeId": play.result.event_type_id,
        "period": play.about.period,
        "periodTime": play.about.period_time,
        "coordinates": {"x": play.coordinates.x, "y": play.coordinates.y},
    })
}

fn build_play_by_play(feed: &LiveFeed, cursor: &Cursor) -> PlayByPlay {
    let all_plays = &feed.live_data.plays.all_plays;
    // A cursor past the end means the provider rewound; resend everything.
    let seen = cursor
        .as_str()
        .parse::<usize>()
        .ok()
        .filter(|seen| *seen <= all_plays.len())
        .unwrap_or(0);
    let plays: Vec<Value> = all_plays.iter().skip(seen).map(play_json).collect();

    let linescore = &feed.live_data.linescore;
    let in_intermission = linescore
        .intermission_info
        .as_ref()
        .map(|i| i.in_intermission)
        .unwrap_or(false);
    let lifecycle = match classify(feed.game_data.status.code()) {
        LifecycleState::Live if in_intermission => LifecycleState::Intermission,
        state => state,
    };

    let payload = json!({
        "game": {
            "home": linescore_team(&linescore.teams.home),
            "away": linescore_team(&linescore.teams.away),
            "status": {
                "period": linescore.current_period,
                "periodTimeRemaining": linescore.current_period_time_remaining,
            },
        },
        "plays": plays,
    });

    PlayByPlay {
        payload,
        metadata: PollMetadata {
            lifecycle,
            cursor: cursor_for(all_plays.len()),
            current_period: (linescore.current_period > 0).then_some(linescore.current_period),
        },
    }
}

#[async_trait]
impl SportAdapter for NhlAdapter {
    fn name(&self) -> &str {
        SPORT
    }

    async fn schedule(&self, query: &ScheduleQuery) -> Result<ScheduleSnapshot, AdapterError> {
        let mut params = vec![("expand", "schedule.linescore".to_string())];
        if let Some(date) = query.date {
            params.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        let response: ScheduleResponse = self.client.get("/api/v1/schedule", &params).await?;

        let Some(day) = response.dates.first() else {
            return Ok(ScheduleSnapshot {
                sport: SPORT.to_string(),
                date: query.date.unwrap_or_else(|| Utc::now().date_naive()),
                events: Vec::new(),
            });
        };

        debug!(date = %day.date, games = day.games.len(), "nhl schedule fetched");
        Ok(ScheduleSnapshot {
            sport: SPORT.to_string(),
            date: day.date,
            events: day.games.iter().map(schedule_entry).collect(),
        })
    }

    async fn play_by_play(
        &self,
        query: &PlayByPlayQuery,
    ) -> Result<Option<PlayByPlay>, AdapterError> {
        let game_pk: u64 = query
            .event_id
            .parse()
            .map_err(|_| AdapterError::InvalidEventId(query.event_id.clone()))?;

        let path = format!("/api/v1/game/{}/feed/live", game_pk);
        let feed: Option<LiveFeed> = self.client.get_optional(&path, &[]).await?;
        Ok(feed.map(|feed| build_play_by_play(&feed, &query.cursor)))
    }

    fn classify_status(&self, status_code: i64) -> LifecycleState {
        classify(status_code)
    }

    fn default_cursor(&self) -> Cursor {
        cursor_for(0)
    }
}
