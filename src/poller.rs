//! Poll orchestration: fetch, decode, project, serialize.

use chrono::Utc;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::PollError;
use crate::fetch::{BasicClient, HttpClient, WithHeader, fetch_bytes};
use crate::parser::parse_feed;
use crate::projector::select_and_project;

/// Where a [`Poller`] is in its cycle.
///
/// `Succeeded` and `Failed` describe the last finished cycle and act as the
/// idle state until the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Runs one feed poll per call. Nothing but the state marker survives
/// between cycles.
pub struct Poller<C> {
    client: C,
    feed_url: String,
    state: PollState,
}

impl Poller<Box<dyn HttpClient>> {
    /// Builds a poller with the production client stack described by `config`:
    /// user agent outermost, then the optional API key header, then reqwest.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let basic = match config.timeout {
            Some(timeout) => BasicClient::with_timeout(timeout)?,
            None => BasicClient::new(),
        };

        let keyed: Box<dyn HttpClient> = match &config.api_key {
            Some(api_key) => Box::new(WithHeader::new(basic, &api_key.header, &api_key.key)?),
            None => Box::new(basic),
        };
        let client: Box<dyn HttpClient> =
            Box::new(WithHeader::user_agent(keyed, &config.user_agent)?);

        Ok(Self::new(client, config.feed_url.clone()))
    }
}

impl<C: HttpClient> Poller<C> {
    pub fn new(client: C, feed_url: impl Into<String>) -> Self {
        Self {
            client,
            feed_url: feed_url.into(),
            state: PollState::Idle,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Runs one cycle and returns the pretty-printed document.
    ///
    /// Any failure is logged at error level and returned unchanged; no
    /// output is produced for that cycle.
    #[tracing::instrument(name = "poll_cycle", skip(self), fields(feed_url = %self.feed_url))]
    pub async fn poll_once(&mut self) -> Result<String, PollError> {
        self.state = PollState::Running;
        debug!(polled_at = %Utc::now(), "Polling feed");

        match self.run_pipeline().await {
            Ok(text) => {
                self.state = PollState::Succeeded;
                Ok(text)
            }
            Err(e) => {
                error!(error = %e, kind = e.kind(), "Poll cycle failed");
                self.state = PollState::Failed;
                Err(e)
            }
        }
    }

    async fn run_pipeline(&self) -> Result<String, PollError> {
        let bytes = fetch_bytes(&self.client, &self.feed_url).await?;
        let feed = parse_feed(&bytes)?;
        debug!(entity_count = feed.entity.len(), "Feed parsed successfully");

        let document = select_and_project(&feed)?;
        let text = document.to_pretty_json()?;
        info!(shape = document.shape(), bytes = text.len(), "Feed projected");

        Ok(text)
    }
}
