use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
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

use super::types::{NbaPlay, PlayByPlayResponse, ScoreboardGame, ScoreboardResponse, ScoreboardTeam};

pub const DEFAULT_BASE_URL: &str = "https://data.nba.net";

const SPORT: &str = "nba";

/// Feed days are keyed by US Eastern date; standard-time offset is close enough
/// since no games tip off between 00:00 and 01:00 ET.
const EASTERN_OFFSET_HOURS: i64 = 5;

const END_OF_PERIOD: &str = "13";
const REGULATION_PERIODS: u32 = 4;
/// Regulation plus a generous number of overtimes.
const MAX_PERIODS: u32 = 14;
const PERIOD_START_CLOCK: &str = "12:00";

/// NBA scoreboard and play-by-play client
pub struct NbaAdapter {
    client: JsonClient,
}

impl NbaAdapter {
    pub fn new(base_url: String) -> Result<Self, AdapterError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: String, timeout: Duration) -> Result<Self, AdapterError> {
        Ok(Self {
            client: JsonClient::new(base_url, timeout)?,
        })
    }

    async fn fetch_period(
        &self,
        date: NaiveDate,
        game_id: &str,
        period: u32,
    ) -> Result<Option<Vec<NbaPlay>>, AdapterError> {
        let path = format!("/prod/v1/{}/{}_pbp_{}.json", date.format("%Y%m%d"), game_id, period);
        let response: Option<PlayByPlayResponse> = self.client.get_optional(&path, &[]).await?;
        Ok(response.map(|r| r.plays))
    }

    /// Every period that has plays so far, in order.
    async fn fetch_all(
        &self,
        date: NaiveDate,
        game_id: &str,
    ) -> Result<Vec<(u32, Vec<NbaPlay>)>, AdapterError> {
        let mut periods = Vec::new();
        for period in 1..=MAX_PERIODS {
            match self.fetch_period(date, game_id, period).await? {
                Some(plays) if !plays.is_empty() => periods.push((period, plays)),
                _ => break,
            }
        }
        Ok(periods)
    }
}

impl std::fmt::Debug for NbaAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NbaAdapter")
            .field("base_url", &self.client.base_url())
            .finish()
    }
}

fn provider_today() -> NaiveDate {
    (Utc::now() - chrono::Duration::hours(EASTERN_OFFSET_HOURS)).date_naive()
}

fn classify(status_num: i64) -> LifecycleState {
    match status_num {
        2 => LifecycleState::Live,
        3 => LifecycleState::Complete,
        _ => LifecycleState::Preview,
    }
}

/// `P{period}-{plays seen in that period}`, both zero-padded.
fn cursor_for(period: u32, seen: usize) -> Cursor {
    Cursor::new(format!("P{:02}-{:04}", period, seen))
}

fn parse_cursor(cursor: &Cursor) -> Option<(u32, usize)> {
    let (period, seen) = cursor.as_str().strip_prefix('P')?.split_once('-')?;
    Some((period.parse().ok()?, seen.parse().ok()?))
}

fn scoreboard_team(team: &ScoreboardTeam) -> Value {
    json!({
        "teamId": team.team_id,
        "abbr": team.tri_code,
        "record": format!("{}-{}", team.win, team.loss),
        "score": team.score.parse::<i64>().ok(),
    })
}

fn schedule_entry(game: &ScoreboardGame) -> ScheduleEntry {
    let details = json!({
        "id": game.game_id,
        "date": game.start_time_utc.to_rfc3339(),
        "statusCode": game.status_num,
        "period": game.period.current,
        "halftime": game.period.is_halftime,
        "endOfPeriod": game.period.is_end_of_period,
        "time": game.clock,
        "venue": game.arena.as_ref().map(|a| a.name.clone()),
        "home": scoreboard_team(&game.h_team),
        "away": scoreboard_team(&game.v_team),
    });
    ScheduleEntry {
        event_id: game.game_id.clone(),
        start_time: game.start_time_utc,
        status_code: game.status_num,
        details,
    }
}

fn play_json(period: u32, play: &NbaPlay) -> Value {
    json!({
        "description": play.description,
        "typeId": play.event_msg_type,
        "period": period,
        "periodTime": play.clock,
        "teamId": play.team_id,
        "playerId": play.person_id,
    })
}

fn build_play_by_play(periods: &[(u32, Vec<NbaPlay>)], cursor: &Cursor) -> Option<PlayByPlay> {
    let (last_period, last_plays) = periods.last()?;
    let (cursor_period, cursor_seen) = parse_cursor(cursor).unwrap_or((0, 0));

    let mut plays = Vec::new();
    for (period, period_plays) in periods {
        let skip = match period.cmp(&cursor_period) {
            std::cmp::Ordering::Less => period_plays.len(),
            std::cmp::Ordering::Equal => cursor_seen.min(period_plays.len()),
            std::cmp::Ordering::Greater => 0,
        };
        plays.extend(period_plays.iter().skip(skip).map(|p| play_json(*period, p)));
    }

    let last = last_plays.last();
    let (lifecycle, current_period) = match last {
        Some(play) if play.event_msg_type == END_OF_PERIOD => {
            if *last_period >= REGULATION_PERIODS && play.home_score() != play.away_score() {
                (LifecycleState::Complete, *last_period)
            } else {
                (LifecycleState::Intermission, last_period + 1)
            }
        }
        _ => (LifecycleState::Live, *last_period),
    };

    let payload = json!({
        "game": {
            "status": {
                "period": current_period,
                "periodTimeRemaining": last.map(|p| p.clock.as_str()).unwrap_or(PERIOD_START_CLOCK),
            },
            "home": {"score": last.map(NbaPlay::home_score).unwrap_or(0)},
            "away": {"score": last.map(NbaPlay::away_score).unwrap_or(0)},
        },
        "plays": plays,
    });

    Some(PlayByPlay {
        payload,
        metadata: PollMetadata {
            lifecycle,
            cursor: cursor_for(*last_period, last_plays.len()),
            current_period: Some(current_period),
        },
    })
}

#[async_trait]
impl SportAdapter for NbaAdapter {
    fn name(&self) -> &str {
        SPORT
    }

    async fn schedule(&self, query: &ScheduleQuery) -> Result<ScheduleSnapshot, AdapterError> {
        let date = query.date.unwrap_or_else(provider_today);
        let path = format!("/prod/v2/{}/scoreboard.json", date.format("%Y%m%d"));
        let scoreboard: Option<ScoreboardResponse> = self.client.get_optional(&path, &[]).await?;
        let games = scoreboard.map(|s| s.games).unwrap_or_default();

        debug!(date = %date, games = games.len(), "nba scoreboard fetched");
        Ok(ScheduleSnapshot {
            sport: SPORT.to_string(),
            date,
            events: games.iter().map(schedule_entry).collect(),
        })
    }

    async fn play_by_play(
        &self,
        query: &PlayByPlayQuery,
    ) -> Result<Option<PlayByPlay>, AdapterError> {
        if query.event_id.is_empty() || !query.event_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(AdapterError::InvalidEventId(query.event_id.clone()));
        }
        let date = query.date.unwrap_or_else(provider_today);

        let periods = if query.current_period == 0 {
            self.fetch_all(date, &query.event_id).await?
        } else {
            self.fetch_period(date, &query.event_id, query.current_period)
                .await?
                .map(|plays| vec![(query.current_period, plays)])
                .unwrap_or_default()
        };

        Ok(build_play_by_play(&periods, &query.cursor))
    }

    fn classify_status(&self, status_code: i64) -> LifecycleState {
        classify(status_code)
    }

    fn default_cursor(&self) -> Cursor {
        cursor_for(0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GAME: &str = "0022400001";

    async fn setup() -> (MockServer, NbaAdapter) {
        let server = MockServer::start().await;
        let adapter = NbaAdapter::new(server.uri()).unwrap();
        (server, adapter)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 22).unwrap()
    }

    fn play(clock: &str, msg_type: &str, home: i64, away: i64) -> Value {
        json!({
            "clock": clock,
            "eventMsgType": msg_type,
            "description": format!("{} at {}", msg_type, clock),
            "personId": "201939",
            "teamId": "1610612744",
            "hTeamScore": home.to_string(),
            "vTeamScore": away.to_string()
        })
    }

    async fn mount_period(server: &MockServer, period: u32, plays: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path(format!("/prod/v1/20241022/{}_pbp_{}.json", GAME, period)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "plays": plays })))
            .mount(server)
            .await;
    }

    fn query(cursor: Cursor, current_period: u32) -> PlayByPlayQuery {
        PlayByPlayQuery {
            event_id: GAME.to_string(),
            date: Some(date()),
            cursor,
            current_period,
        }
    }

    #[tokio::test]
    async fn test_schedule_reads_scoreboard() {
        let (server, adapter) = setup().await;
        Mock::given(method("GET"))
            .and(path("/prod/v2/20241022/scoreboard.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "numGames": 1,
                "games": [{
                    "gameId": GAME,
                    "startTimeUTC": "2024-10-22T23:30:00.000Z",
                    "statusNum": 2,
                    "period": {"current": 3, "isHalftime": false, "isEndOfPeriod": false},
                    "clock": "4:12",
                    "arena": {"name": "TD Garden"},
                    "hTeam": {"teamId": "1610612738", "triCode": "BOS", "win": "1", "loss": "0", "score": "80"},
                    "vTeam": {"teamId": "1610612752", "triCode": "NYK", "win": "0", "loss": "1", "score": "71"}
                }]
            })))
            .mount(&server)
            .await;

        let snapshot = adapter.schedule(&ScheduleQuery::on(date())).await.unwrap();

        assert_eq!(snapshot.date, date());
        assert_eq!(snapshot.events.len(), 1);
        let entry = &snapshot.events[0];
        assert_eq!(entry.event_id, GAME);
        assert_eq!(entry.details["home"]["abbr"], "BOS");
        assert_eq!(entry.details["away"]["score"], 71);
        assert_eq!(adapter.classify_status(entry.status_code), LifecycleState::Live);
    }

    #[tokio::test]
    async fn test_schedule_missing_day_is_empty() {
        let (_server, adapter) = setup().await;
        let snapshot = adapter.schedule(&ScheduleQuery::on(date())).await.unwrap();
        assert!(snapshot.events.is_empty());
    }

    #[tokio::test]
    async fn test_incremental_plays_within_period() {
        let (server, adapter) = setup().await;
        mount_period(
            &server,
            2,
            vec![play("12:00", "12", 20, 18), play("11:40", "1", 22, 18), play("11:02", "2", 22, 18)],
        )
        .await;

        let result = adapter
            .play_by_play(&query(Cursor::new("P02-0001"), 2))
            .await
            .unwrap()
            .unwrap();

        let plays = result.payload["plays"].as_array().unwrap();
        assert_eq!(plays.len(), 2);
        assert_eq!(plays[0]["periodTime"], "11:40");
        assert_eq!(result.metadata.cursor, Cursor::new("P02-0003"));
        assert_eq!(result.metadata.lifecycle, LifecycleState::Live);
        assert_eq!(result.metadata.current_period, Some(2));
        assert_eq!(result.payload["game"]["home"]["score"], 22);
    }

    #[tokio::test]
    async fn test_end_of_period_moves_to_intermission() {
        let (server, adapter) = setup().await;
        mount_period(&server, 2, vec![play("0:01", "1", 50, 48), play("0:00", "13", 50, 48)]).await;

        let result = adapter
            .play_by_play(&query(Cursor::new("P01-0120"), 2))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.metadata.lifecycle, LifecycleState::Intermission);
        assert_eq!(result.metadata.current_period, Some(3));
        // cursor from an earlier period selects the whole current period
        assert_eq!(result.payload["plays"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_regulation_end_with_winner_is_complete() {
        let (server, adapter) = setup().await;
        mount_period(&server, 4, vec![play("0:00", "13", 101, 99)]).await;

        let result = adapter
            .play_by_play(&query(Cursor::new("P04-0000"), 4))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.metadata.lifecycle, LifecycleState::Complete);
        assert_eq!(result.metadata.current_period, Some(4));
    }

    #[tokio::test]
    async fn test_tied_after_regulation_goes_to_overtime() {
        let (server, adapter) = setup().await;
        mount_period(&server, 4, vec![play("0:00", "13", 100, 100)]).await;

        let result = adapter
            .play_by_play(&query(Cursor::new("P04-0000"), 4))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.metadata.lifecycle, LifecycleState::Intermission);
        assert_eq!(result.metadata.current_period, Some(5));
    }

    #[tokio::test]
    async fn test_whole_game_fetch_stops_at_missing_period() {
        let (server, adapter) = setup().await;
        mount_period(&server, 1, vec![play("12:00", "12", 0, 0), play("0:00", "13", 30, 28)]).await;
        mount_period(&server, 2, vec![play("12:00", "12", 30, 28), play("10:00", "1", 32, 28)]).await;

        let result = adapter
            .play_by_play(&query(adapter.default_cursor(), 0))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.payload["plays"].as_array().unwrap().len(), 4);
        assert_eq!(result.metadata.cursor, Cursor::new("P02-0002"));
        assert_eq!(result.metadata.lifecycle, LifecycleState::Live);
    }

    #[tokio::test]
    async fn test_period_not_published_yet_is_none() {
        let (_server, adapter) = setup().await;
        let result = adapter.play_by_play(&query(Cursor::new("P01-0100"), 2)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_rejects_non_numeric_game_id() {
        let (_server, adapter) = setup().await;
        let mut bad = query(adapter.default_cursor(), 1);
        bad.event_id = "../etc".to_string();
        assert!(matches!(
            adapter.play_by_play(&bad).await,
            Err(AdapterError::InvalidEventId(_))
        ));
    }

    #[test]
    fn test_cursor_parsing() {
        assert_eq!(parse_cursor(&Cursor::new("P03-0042")), Some((3, 42)));
        assert_eq!(parse_cursor(&Cursor::new("12:00")), None);
    }
}
