use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, InvalidHeaderName, InvalidHeaderValue, USER_AGENT};

/// Browser identity sent with every feed request. Some providers reject
/// requests that do not look like they come from a browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("invalid header name: {0}")]
    Name(#[from] InvalidHeaderName),
    #[error("invalid header value: {0}")]
    Value(#[from] InvalidHeaderValue),
}

/// An [`HttpClient`] wrapper that sets one header on every request,
/// replacing any value already present.
///
/// Used for the `User-Agent` identity and for feeds that expect an API key
/// header. Wrappers stack: `WithHeader::user_agent(WithHeader::new(..))`.
pub struct WithHeader<C> {
    inner: C,
    name: HeaderName,
    value: HeaderValue,
}

impl<C> WithHeader<C> {
    /// Validates `name` and `value` up front so `execute` cannot fail on them.
    pub fn new(inner: C, name: &str, value: &str) -> Result<Self, HeaderError> {
        Ok(Self {
            inner,
            name: HeaderName::from_bytes(name.as_bytes())?,
            value: HeaderValue::from_str(value)?,
        })
    }

    pub fn user_agent(inner: C, agent: &str) -> Result<Self, HeaderError> {
        Ok(Self {
            inner,
            name: USER_AGENT,
            value: HeaderValue::from_str(agent)?,
        })
    }

    /// Wraps `inner` with the default [`BROWSER_USER_AGENT`].
    pub fn browser(inner: C) -> Self {
        Self {
            inner,
            name: USER_AGENT,
            value: HeaderValue::from_static(BROWSER_USER_AGENT),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for WithHeader<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}
