//! Admin page loading and progress indicator discovery.
//!
//! Indicators are elements that either carry a `data-progress-url`
//! attribute (polled on their own) or the marker class with an id of the
//! form `progress_<key>` (polled together through the shared endpoint).

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::client::HttpClient;
use crate::error::PollError;
use crate::poller::{group_targets, IndicatorSpec, PollTarget};

/// Attribute naming the endpoint of a single indicator.
pub const PROGRESS_URL_ATTR: &str = "data-progress-url";
/// Id prefix linking an element to an index key.
pub const PROGRESS_ID_PREFIX: &str = "progress_";
/// Default class marking indicators fed by the shared endpoint.
pub const DEFAULT_MARKER_CLASS: &str = "progress";

/// A source of poll targets. Loading it again is how a reload happens.
#[async_trait]
pub trait Page: Send + Sync {
    async fn load(&self) -> Result<Vec<PollTarget>, PollError>;

    /// Short description for log messages.
    fn describe(&self) -> String;
}

/// The server-rendered re-index page.
pub struct HtmlPage {
    client: HttpClient,
    url: String,
    shared_progress_url: String,
    marker_class: String,
}

impl HtmlPage {
    pub fn new(
        client: HttpClient,
        url: impl Into<String>,
        shared_progress_url: impl Into<String>,
        marker_class: impl Into<String>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            shared_progress_url: shared_progress_url.into(),
            marker_class: marker_class.into(),
        }
    }
}

#[async_trait]
impl Page for HtmlPage {
    async fn load(&self) -> Result<Vec<PollTarget>, PollError> {
        // Always a plain GET, so a reload never re-submits a form.
        let page = self.client.get_page(&self.url).await?;
        if page.is_login_redirect() {
            return Err(PollError::NotAuthenticated(page.final_url));
        }
        if !page.status.is_success() {
            return Err(PollError::Status {
                url: self.url.clone(),
                status: page.status,
            });
        }

        let indicators = discover_indicators(
            &page.body,
            &page.final_url,
            &self.shared_progress_url,
            &self.marker_class,
        )?;
        debug!("Found {} indicator(s) on {}", indicators.len(), self.url);
        Ok(group_targets(indicators))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// A fixed list of endpoints, for polling without an admin page.
pub struct StaticPage {
    targets: Vec<PollTarget>,
}

impl StaticPage {
    pub fn new(targets: Vec<PollTarget>) -> Self {
        Self { targets }
    }

    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(urls.into_iter().map(PollTarget::new).collect())
    }
}

#[async_trait]
impl Page for StaticPage {
    async fn load(&self) -> Result<Vec<PollTarget>, PollError> {
        Ok(self.targets.clone())
    }

    fn describe(&self) -> String {
        match self.targets.as_slice() {
            [single] => single.url.clone(),
            targets => format!("{} endpoints", targets.len()),
        }
    }
}

/// Derive the shared endpoint from the page URL: `<page>/progress`.
///
/// Query and fragment of the page URL are dropped.
pub fn default_progress_url(page_url: &str) -> Result<String, PollError> {
    let invalid = |source| PollError::InvalidUrl {
        url: page_url.to_string(),
        source,
    };
    let mut url = Url::parse(page_url).map_err(invalid)?;
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| invalid(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .push("progress");
    Ok(url.to_string())
}

/// Find the progress indicators in a page.
///
/// Relative `data-progress-url` values are resolved against `page_url`.
/// Duplicate keys keep their first occurrence.
pub fn discover_indicators(
    html: &str,
    page_url: &str,
    shared_progress_url: &str,
    marker_class: &str,
) -> Result<Vec<IndicatorSpec>, PollError> {
    let base = Url::parse(page_url).map_err(|source| PollError::InvalidUrl {
        url: page_url.to_string(),
        source,
    })?;

    let query = format!("[{}], .{}", PROGRESS_URL_ATTR, marker_class);
    let selector = Selector::parse(&query)
        .map_err(|e| PollError::Malformed(format!("invalid indicator selector {:?}: {}", query, e)))?;

    let document = Html::parse_document(html);
    let mut indicators: Vec<IndicatorSpec> = Vec::new();

    for element in document.select(&selector) {
        let id = element.value().id().filter(|id| !id.is_empty());
        let own_url = element
            .value()
            .attr(PROGRESS_URL_ATTR)
            .map(str::trim)
            .filter(|u| !u.is_empty());

        let endpoint_url = match own_url {
            Some(raw) => base
                .join(raw)
                .map_err(|source| PollError::InvalidUrl {
                    url: raw.to_string(),
                    source,
                })?
                .to_string(),
            None => shared_progress_url.to_string(),
        };

        let key = match (id, own_url) {
            (Some(id), _) => id.strip_prefix(PROGRESS_ID_PREFIX).unwrap_or(id).to_string(),
            (None, Some(_)) => endpoint_url.clone(),
            (None, None) => {
                debug!("Skipping marker element without id");
                continue;
            }
        };

        if indicators.iter().any(|i| i.key == key) {
            continue;
        }
        indicators.push(IndicatorSpec { key, endpoint_url });
    }

    Ok(indicators)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://search.example.org/admin/reindex";
    const SHARED: &str = "https://search.example.org/admin/reindex/progress";

    fn keys(indicators: &[IndicatorSpec]) -> Vec<&str> {
        indicators.iter().map(|i| i.key.as_str()).collect()
    }

    #[test]
    fn test_discover_shared_indicators() {
        let html = r#"
            <table>
              <tr><td>books</td><td><div class="progress" id="progress_books"></div></td></tr>
              <tr id="formRow_books" style="display:none"><td>edit</td></tr>
              <tr><td>maps</td><td><div class="progress bar" id="progress_maps"></div></td></tr>
            </table>"#;
        let indicators = discover_indicators(html, PAGE, SHARED, "progress").unwrap();
        assert_eq!(keys(&indicators), vec!["books", "maps"]);
        assert!(indicators.iter().all(|i| i.endpoint_url == SHARED));
        assert_eq!(group_targets(indicators).len(), 1);
    }

    #[test]
    fn test_discover_per_indicator_urls() {
        let html = r#"
            <div id="progress_books" data-progress-url="progress?index=books"></div>
            <div data-progress-url="/other/status"></div>
            <div data-progress-url="https://elsewhere.example.org/p"></div>"#;
        let indicators = discover_indicators(html, PAGE, SHARED, "progress").unwrap();
        assert_eq!(
            indicators,
            vec![
                IndicatorSpec {
                    key: "books".to_string(),
                    endpoint_url: "https://search.example.org/admin/progress?index=books"
                        .to_string(),
                },
                IndicatorSpec {
                    key: "https://search.example.org/other/status".to_string(),
                    endpoint_url: "https://search.example.org/other/status".to_string(),
                },
                IndicatorSpec {
                    key: "https://elsewhere.example.org/p".to_string(),
                    endpoint_url: "https://elsewhere.example.org/p".to_string(),
                },
            ]
        );
        assert_eq!(group_targets(indicators).len(), 3);
    }

    #[test]
    fn test_discover_mixed_and_duplicates() {
        let html = r#"
            <div class="progress" id="progress_books"></div>
            <div class="progress"></div>
            <div class="progress" id="progress_books"></div>
            <span class="meter" id="custom" data-progress-url="/custom"></span>"#;
        let indicators = discover_indicators(html, PAGE, SHARED, "progress").unwrap();
        assert_eq!(keys(&indicators), vec!["books", "custom"]);
        assert_eq!(indicators[1].endpoint_url, "https://search.example.org/custom");
    }

    #[test]
    fn test_discover_custom_marker_class() {
        let html = r#"<div class="indexProgress" id="progress_a"></div><div class="progress" id="progress_b"></div>"#;
        let indicators = discover_indicators(html, PAGE, SHARED, "indexProgress").unwrap();
        assert_eq!(keys(&indicators), vec!["a"]);
    }

    #[test]
    fn test_discover_nothing() {
        let indicators = discover_indicators("<p>No indexes</p>", PAGE, SHARED, "progress").unwrap();
        assert!(indicators.is_empty());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            discover_indicators("", "not a url", SHARED, "progress"),
            Err(PollError::InvalidUrl { .. })
        ));
        assert!(matches!(
            discover_indicators("", PAGE, SHARED, "bad class!"),
            Err(PollError::Malformed(_))
        ));
    }

    #[test]
    fn test_default_progress_url() {
        let derive = |url| default_progress_url(url).unwrap();
        assert_eq!(derive(PAGE), SHARED);
        assert_eq!(derive("https://h/admin/reindex/"), "https://h/admin/reindex/progress");
        assert_eq!(derive("https://h/admin/reindex?x=1"), "https://h/admin/reindex/progress");
        assert_eq!(derive("https://h/admin/reindex#top"), "https://h/admin/reindex/progress");
        assert_eq!(derive("https://h/admin/reindex/?x=1#top"), "https://h/admin/reindex/progress");
        assert_eq!(derive("https://h"), "https://h/progress");
        assert!(matches!(
            default_progress_url("admin/reindex"),
            Err(PollError::InvalidUrl { .. })
        ));
        assert!(matches!(
            default_progress_url("mailto:admin@h"),
            Err(PollError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_static_page() {
        let page = StaticPage::from_urls(["http://h/a", "http://h/b"]);
        let targets = page.load().await.unwrap();
        assert_eq!(targets, vec![PollTarget::new("http://h/a"), PollTarget::new("http://h/b")]);
        assert_eq!(page.describe(), "2 endpoints");
        assert_eq!(StaticPage::from_urls(["http://h/a"]).describe(), "http://h/a");
    }
}
