mod basic;
mod client;
mod header;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use header::{BROWSER_USER_AGENT, HeaderError, WithHeader};

use bytes::Bytes;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::PollError;

const SLOW_FETCH: Duration = Duration::from_secs(15);

/// GETs `url` through `client` and returns the response body.
///
/// A non-success HTTP status is reported as [`PollError::Fetch`], the same as
/// a transport failure.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Bytes, PollError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| PollError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let fetch_start = Instant::now();
    let resp = client.execute(req).await?.error_for_status()?;
    let body = resp.bytes().await?;

    let elapsed = fetch_start.elapsed();
    if elapsed > SLOW_FETCH {
        warn!(elapsed_secs = elapsed.as_secs(), "Feed fetch was slow");
    }
    debug!(bytes = body.len(), "Feed bytes received");

    Ok(body)
}
