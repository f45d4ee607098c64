//! sportcast-sports: lifecycle model and provider adapters.

pub mod adapter;
pub mod catalog;
pub mod error;
mod http;
pub mod lifecycle;
pub mod nba;
pub mod nhl;
pub mod types;

pub use adapter::SportAdapter;
pub use catalog::SportCatalog;
pub use error::{AdapterError, TransitionError};
pub use lifecycle::{apply_event, LifecycleEvent, LifecycleState};
pub use types::{
    Cursor, PlayByPlay, PlayByPlayQuery, PollMetadata, ScheduleEntry, ScheduleQuery,
    ScheduleSnapshot,
};
