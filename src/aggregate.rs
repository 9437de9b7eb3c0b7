//! Concurrent refresh of every enabled source into one time-ordered event list.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{debug, info, warn};

use crate::{
    Error,
    component::CalendarEvent,
    config::{Settings, SourceProvider},
    fetch::{FeedFetcher, FetchError, HttpFetcher},
    parse_with,
    parser::ParserOptions,
    source::CalendarSource,
};

/// A source whose feed could not be retrieved during a refresh.
#[derive(Debug)]
pub struct SourceFailure {
    pub source_id: String,
    pub error: FetchError,
}

/// Outcome of a refresh.
#[derive(Debug, Default)]
pub struct Refresh {
    /// Events of all sources that succeeded, ordered by start.
    pub events: Vec<CalendarEvent>,
    pub failures: Vec<SourceFailure>,
}

pub struct Aggregator<F> {
    fetcher: F,
    options: ParserOptions,
}

impl Aggregator<HttpFetcher> {
    pub fn from_settings(settings: &Settings) -> Result<Self, Error> {
        Ok(Self::new(
            HttpFetcher::from_settings(settings)?,
            settings.parser_options()?,
        ))
    }
}

impl<F: FeedFetcher> Aggregator<F> {
    pub fn new(fetcher: F, options: ParserOptions) -> Self {
        Self { fetcher, options }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub async fn fetch_source(
        &self,
        source: &CalendarSource,
    ) -> Result<Vec<CalendarEvent>, FetchError> {
        let text = self.fetcher.fetch(source).await?;
        let events = parse_with(&text, &source.id, &self.options);
        debug!("{}: parsed {} events", source.id, events.len());
        Ok(events)
    }

    /// Fetch every enabled source concurrently.
    ///
    /// A failing source contributes no events and is reported in [`Refresh::failures`]; the
    /// others are unaffected.
    pub async fn refresh(&self, sources: &[CalendarSource]) -> Refresh {
        let enabled: Vec<&CalendarSource> = sources.iter().filter(|s| s.enabled).collect();
        let results = join_all(enabled.iter().map(|source| self.fetch_source(source))).await;

        let mut refresh = Refresh::default();
        for (source, result) in enabled.into_iter().zip(results) {
            match result {
                Ok(events) => refresh.events.extend(events),
                Err(error) => {
                    warn!("Error fetching calendar {}: {error}", source.name);
                    refresh.failures.push(SourceFailure {
                        source_id: source.id.clone(),
                        error,
                    });
                }
            }
        }

        // Stable, so same-start events keep source order
        refresh.events.sort_by(|a, b| a.start.cmp(&b.start));
        info!(
            "Loaded {} events ({} calendars failed)",
            refresh.events.len(),
            refresh.failures.len()
        );
        refresh
    }
}

/// The current sources and the events last loaded from them.
#[derive(Debug, Default)]
pub struct CalendarState {
    sources: Vec<CalendarSource>,
    pub events: Vec<CalendarEvent>,
    pub failures: Vec<SourceFailure>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl CalendarState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sources(&self) -> &[CalendarSource] {
        &self.sources
    }

    /// Replace the source list, returning whether it differs from the previous one.
    pub fn set_sources(&mut self, sources: Vec<CalendarSource>) -> bool {
        if self.sources == sources {
            return false;
        }
        self.sources = sources;
        true
    }

    pub async fn refresh<F: FeedFetcher>(&mut self, aggregator: &Aggregator<F>) {
        let Refresh { events, failures } = aggregator.refresh(&self.sources).await;
        self.events = events;
        self.failures = failures;
        self.last_updated = Some(Utc::now());
    }

    /// Take the sources of `provider` and refresh if they changed.
    pub async fn refresh_if_changed<F: FeedFetcher>(
        &mut self,
        provider: &impl SourceProvider,
        aggregator: &Aggregator<F>,
    ) -> bool {
        if !self.set_sources(provider.sources()) {
            return false;
        }
        self.refresh(aggregator).await;
        true
    }
}
