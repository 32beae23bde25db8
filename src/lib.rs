//! indexwatch - follow search index re-indexation progress.
//!
//! Loads the search engine's admin re-index page, finds its progress
//! indicators and polls their endpoints once per second, drawing a progress
//! bar per index. When the last running indexer finishes, the page is
//! loaded again so the freshly rendered state is picked up.

pub mod cli;
pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod page;
pub mod poller;

pub use error::{DisplayError, PollError};
