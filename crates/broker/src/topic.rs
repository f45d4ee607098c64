use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TopicParseError;

/// Identifier of a broadcast group for one tracked event, rendered `{sport}:{event}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TopicId {
    sport: String,
    event_id: String,
}

impl TopicId {
    pub fn new(sport: impl Into<String>, event_id: impl Into<String>) -> Self {
        Self {
            sport: sport.into().to_lowercase(),
            event_id: event_id.into(),
        }
    }

    pub fn sport(&self) -> &str {
        &self.sport
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sport, self.event_id)
    }
}

impl FromStr for TopicId {
    type Err = TopicParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sport, event_id) = s
            .split_once(':')
            .ok_or_else(|| TopicParseError::MissingSeparator(s.to_string()))?;
        if sport.is_empty() {
            return Err(TopicParseError::EmptyPart("sport"));
        }
        if event_id.is_empty() {
            return Err(TopicParseError::EmptyPart("event"));
        }
        Ok(TopicId::new(sport, event_id))
    }
}

impl TryFrom<String> for TopicId {
    type Error = TopicParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TopicId> for String {
    fn from(id: TopicId) -> Self {
        id.to_string()
    }
}
