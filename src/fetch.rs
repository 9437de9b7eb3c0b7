//! Retrieval of raw feed text.

use std::{borrow::Cow, future::Future, time::Duration};

use log::debug;
use url::Url;

use crate::{
    config::{ConfigError, Settings, resolve_url},
    source::CalendarSource,
};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to fetch {name}: {status}")]
    Status {
        name: String,
        status: reqwest::StatusCode,
    },

    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, url::ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Produces the raw ICS text of a source.
pub trait FeedFetcher {
    fn fetch(
        &self,
        source: &CalendarSource,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Rewrite `webcal://` subscription links to `https://`.
pub fn normalize_feed_url(url: &str) -> Cow<'_, str> {
    const SCHEME: &str = "webcal://";
    match url.get(..SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(SCHEME) => {
            Cow::Owned(format!("https://{}", &url[SCHEME.len()..]))
        }
        _ => Cow::Borrowed(url),
    }
}

/// Fetches feeds over HTTP, directly or through a relay.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    relay: Option<Url>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("opencal/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            relay: None,
        })
    }

    /// Route requests through `relay`, which is called with `?url=<feed>` or `?id=<source id>`.
    pub fn with_relay(mut self, relay: &str) -> Result<Self, FetchError> {
        let relay = Url::parse(relay).map_err(|e| FetchError::InvalidUrl(relay.to_owned(), e))?;
        self.relay = Some(relay);
        Ok(self)
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, FetchError> {
        let fetcher = Self::new(Duration::from_secs(settings.fetch_timeout_secs))?;
        match &settings.relay_url {
            Some(relay) => fetcher.with_relay(relay),
            None => Ok(fetcher),
        }
    }

    /// The URL requested for `source`.
    pub fn request_url(&self, source: &CalendarSource) -> Result<Url, FetchError> {
        if let Some(relay) = &self.relay {
            let mut url = relay.clone();
            if source.url.trim().is_empty() {
                url.query_pairs_mut().append_pair("id", &source.id);
            } else {
                url.query_pairs_mut()
                    .append_pair("url", &normalize_feed_url(source.url.trim()));
            }
            return Ok(url);
        }

        let raw = resolve_url(source)?;
        Url::parse(&normalize_feed_url(&raw)).map_err(|e| FetchError::InvalidUrl(raw, e))
    }
}

impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, source: &CalendarSource) -> Result<String, FetchError> {
        let url = self.request_url(source)?;
        debug!("{}: GET {url}", source.id);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                name: source.name.clone(),
                status,
            });
        }

        Ok(response.text().await?)
    }
}
