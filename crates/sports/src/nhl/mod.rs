//! NHL adapter over the league's public stats REST API.

mod adapter;
pub mod types;

pub use adapter::{NhlAdapter, DEFAULT_BASE_URL};
