//! NBA adapter over the league's public data feed.

mod adapter;
pub mod types;

pub use adapter::{NbaAdapter, DEFAULT_BASE_URL};
