use crate::error::{ErrorKind, Result};
use crate::{Fetcher, Response};
use async_trait::async_trait;
use exn::ResultExt;
use reqwest::Client;
use reqwest::header::LAST_MODIFIED;
use std::time::{Duration, Instant};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{PrimitiveDateTime, UtcDateTime};
use url::Url;

pub const USER_AGENT: &str = concat!("castdex/", env!("CARGO_PKG_VERSION"));

/// IMF-fixdate, the only format servers are allowed to generate.
const HTTP_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT");

/// Fetches feeds over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .or_raise(|| ErrorKind::Network("client initialization".to_string()))?;
        Ok(Self { client })
    }

    async fn exchange(&self, url: Url, uri: &str) -> Result<(Vec<u8>, Option<UtcDateTime>)> {
        let response = self.client.get(url).send().await.map_err(|err| transport(err, uri))?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status(status.as_u16(), uri.to_string()));
        }
        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_http_date);
        let body = response.bytes().await.map_err(|err| transport(err, uri))?;
        Ok((body.to_vec(), last_modified))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, uri: &str, timeout: Option<Duration>) -> Result<Response> {
        let url = Url::parse(uri).or_raise(|| ErrorKind::InvalidUri(uri.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            exn::bail!(ErrorKind::InvalidUri(uri.to_string()));
        }
        let started = Instant::now();
        let (body, last_modified) = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange(url, uri))
                .await
                .or_raise(|| ErrorKind::Timeout(uri.to_string()))??,
            None => self.exchange(url, uri).await?,
        };
        let elapsed = started.elapsed();
        tracing::debug!(bytes = body.len(), ?elapsed, "fetched feed");
        Ok(Response {
            body,
            last_modified,
            elapsed,
        })
    }
}

fn transport(err: reqwest::Error, uri: &str) -> crate::error::Error {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout(uri.to_string())
    } else {
        ErrorKind::Network(uri.to_string())
    };
    exn::Exn::from(err).raise(kind)
}

/// Parse an HTTP date header value (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn parse_http_date(value: &str) -> Option<UtcDateTime> {
    PrimitiveDateTime::parse(value.trim(), HTTP_DATE).ok().map(PrimitiveDateTime::as_utc)
}
