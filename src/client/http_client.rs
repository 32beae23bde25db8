//! HTTP client with session login support.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use super::StatusSource;
use crate::error::PollError;

const USER_AGENT: &str = concat!("indexwatch/", env!("CARGO_PKG_VERSION"));

/// Resolve user agent from config value.
/// - None => default indexwatch user agent
/// - other => custom user agent string
pub fn resolve_user_agent(config: Option<&str>) -> String {
    match config {
        None => USER_AGENT.to_string(),
        Some(custom) => custom.to_string(),
    }
}

/// Settings used to build the underlying reqwest client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Custom user agent; None uses the default.
    pub user_agent: Option<String>,
    /// Overall request timeout. None keeps the transport defaults.
    pub timeout: Option<Duration>,
}

/// A loaded page, after redirects.
#[derive(Debug, Clone)]
pub struct PageResponse {
    /// URL the client ended up at.
    pub final_url: String,
    pub status: StatusCode,
    pub body: String,
}

impl PageResponse {
    /// Whether the secure filter bounced us to the login form.
    pub fn is_login_redirect(&self) -> bool {
        url::Url::parse(&self.final_url)
            .map(|u| u.path().trim_end_matches('/').ends_with("/login"))
            .unwrap_or(false)
    }
}

/// HTTP client used for page loads, progress polls and login.
///
/// Cookies are kept so a logged-in session carries over to every request.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(config: &ClientConfig) -> Result<Self, PollError> {
        let user_agent = resolve_user_agent(config.user_agent.as_deref());
        let mut builder = Client::builder()
            .user_agent(&user_agent)
            .cookie_store(true)
            .gzip(true)
            .brotli(true);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// GET a page and return its body, whatever the status.
    pub async fn get_page(&self, url: &str) -> Result<PageResponse, PollError> {
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        debug!(
            "GET {} -> {} ({} bytes, {}ms)",
            url,
            status.as_u16(),
            body.len(),
            start.elapsed().as_millis()
        );

        Ok(PageResponse {
            final_url,
            status,
            body,
        })
    }

    /// Log in through the admin login form.
    pub async fn login(
        &self,
        login_url: &str,
        username: &str,
        password: &str,
    ) -> Result<(), PollError> {
        let response = self
            .client
            .post(login_url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status {
                url: login_url.to_string(),
                status,
            });
        }

        let page = PageResponse {
            final_url: response.url().to_string(),
            status,
            body: String::new(),
        };
        if page.is_login_redirect() {
            return Err(PollError::NotAuthenticated(page.final_url));
        }

        info!("Logged in as {}", username);
        Ok(())
    }
}

#[async_trait]
impl StatusSource for HttpClient {
    async fn fetch_status(&self, url: &str) -> Result<String, PollError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_user_agent_default() {
        let ua = resolve_user_agent(None);
        assert!(ua.starts_with("indexwatch/"));
    }

    #[test]
    fn test_resolve_user_agent_custom() {
        let ua = resolve_user_agent(Some("MyBot/1.0"));
        assert_eq!(ua, "MyBot/1.0");
    }

    fn page_at(url: &str) -> PageResponse {
        PageResponse {
            final_url: url.to_string(),
            status: StatusCode::OK,
            body: String::new(),
        }
    }

    #[test]
    fn test_login_redirect_detection() {
        assert!(page_at("https://example.com/search/public/login").is_login_redirect());
        assert!(page_at("https://example.com/search/public/login/").is_login_redirect());
        assert!(page_at("https://example.com/public/login?next=%2Fadmin").is_login_redirect());
        assert!(!page_at("https://example.com/admin/reindex").is_login_redirect());
        assert!(!page_at("https://example.com/admin/loginhelp").is_login_redirect());
        assert!(!page_at("not a url").is_login_redirect());
    }

    #[test]
    fn test_client_builds_with_timeout() {
        let config = ClientConfig {
            user_agent: Some("test".to_string()),
            timeout: Some(Duration::from_secs(5)),
        };
        assert!(HttpClient::new(&config).is_ok());
    }
}
