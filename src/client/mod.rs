//! HTTP access to the search engine admin pages and progress endpoints.

mod http_client;

pub use http_client::{resolve_user_agent, ClientConfig, HttpClient, PageResponse};

use async_trait::async_trait;

use crate::error::PollError;

/// Something that can answer a progress poll.
///
/// Implementations return the raw body of a successful response; non-success
/// statuses and transport failures are errors.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, url: &str) -> Result<String, PollError>;
}
