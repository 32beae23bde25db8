//! Error types shared by the poller, page loader and HTTP client.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of one fetch, page load or parse.
///
/// The polling loop never stops on these; it logs them and tries again on
/// the next cycle.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: StatusCode },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("not authenticated (ended up at {0})")]
    NotAuthenticated(String),

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failure to set up a display.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("invalid progress bar template: {0}")]
    Template(#[from] indicatif::style::TemplateError),
}
