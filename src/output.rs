//! Delivery of serialized documents to the downstream event channel.
//!
//! Supports stdout, file append, and HTTP POST to a webhook.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::SinkTarget;
use crate::fetch::{BasicClient, HttpClient};

/// Receives one serialized document per successful poll.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, payload: &str) -> Result<()>;
}

/// Builds the sink named by `target`.
pub fn sink_for(target: &SinkTarget) -> Result<Box<dyn EventSink>> {
    let sink: Box<dyn EventSink> = match target {
        SinkTarget::Stdout => Box::new(StdoutSink),
        SinkTarget::File(path) => Box::new(FileSink::new(path)),
        SinkTarget::Webhook(url) => Box::new(WebhookSink::new(BasicClient::new(), url)?),
    };
    Ok(sink)
}

pub struct StdoutSink;

#[async_trait]
impl EventSink for StdoutSink {
    async fn deliver(&self, payload: &str) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{payload}")?;
        out.flush()?;
        Ok(())
    }
}

/// Appends each document, followed by a newline, to a file.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl EventSink for FileSink {
    async fn deliver(&self, payload: &str) -> Result<()> {
        append_document(&self.path, payload)
    }
}

/// Appends `payload` and a trailing newline to `path`, creating the file if
/// it does not exist.
pub fn append_document(path: &Path, payload: &str) -> Result<()> {
    debug!(path = %path.display(), bytes = payload.len(), "Appending document");

    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    writeln!(file, "{payload}")?;
    file.flush()?;

    Ok(())
}

/// POSTs each document as `application/json`.
pub struct WebhookSink<C> {
    client: C,
    url: reqwest::Url,
}

impl<C: HttpClient> WebhookSink<C> {
    pub fn new(client: C, url: &str) -> Result<Self> {
        let url = reqwest::Url::parse(url).with_context(|| format!("invalid webhook url '{url}'"))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl<C: HttpClient> EventSink for WebhookSink<C> {
    async fn deliver(&self, payload: &str) -> Result<()> {
        let mut req = reqwest::Request::new(reqwest::Method::POST, self.url.clone());
        req.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *req.body_mut() = Some(payload.to_string().into());

        let resp = self.client.execute(req).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("webhook returned status {status}: {body}");
        }

        debug!(url = %self.url, %status, "Document delivered");
        Ok(())
    }
}
