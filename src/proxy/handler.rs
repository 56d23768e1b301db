//! Upstream fetch for the egress proxy.
//!
//! Every target is checked against the [`AllowList`] before a request is
//! made, and again for each redirect hop. HLS playlists are rewritten so that
//! their segments, keys and variants come back through the proxy; everything
//! else is streamed through untouched with its range headers.

use std::sync::Arc;

use aniweave_common::{Error, Result};
use aniweave_hls::{is_playlist, rewrite::rewrite_text, ResourceKind};
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, StreamExt};
use reqwest::{redirect, Method};
use tracing::{debug, warn};
use url::Url;

use super::AllowList;
use crate::config::{Config, ProxyConfig};
use crate::providers::DEFAULT_USER_AGENT;

/// Largest playlist the proxy will buffer for rewriting.
const MAX_MANIFEST_BYTES: usize = 8 * 1024 * 1024;

const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

/// Response headers relayed from upstream as they are.
const RELAYED_HEADERS: [header::HeaderName; 5] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    header::ACCEPT_RANGES,
    header::LAST_MODIFIED,
];

/// One proxied fetch.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub url: String,
    pub kind: Option<ResourceKind>,
    /// Client `Range` header, forwarded verbatim.
    pub range: Option<HeaderValue>,
    pub head: bool,
}

impl ProxyRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: None,
            range: None,
            head: false,
        }
    }
}

pub struct ProxyService {
    client: reqwest::Client,
    allow: Arc<AllowList>,
    settings: ProxyConfig,
}

impl ProxyService {
    pub fn new(config: &Config) -> Result<Self> {
        let allow = Arc::new(AllowList::new(config.proxy_allow_list()));
        let max_redirects = config.proxy.max_redirects;

        let hop_allow = allow.clone();
        let policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() > max_redirects {
                attempt.error("too many redirects")
            } else if hop_allow.check_url(attempt.url()).is_ok() {
                attempt.follow()
            } else {
                warn!(url = %attempt.url(), "Proxy redirect leaves the allow-list");
                attempt.stop()
            }
        });

        let client = reqwest::Client::builder()
            .timeout(config.proxy.timeout())
            .user_agent(DEFAULT_USER_AGENT)
            .redirect(policy)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build proxy client: {e}")))?;

        Ok(Self {
            client,
            allow,
            settings: config.proxy.clone(),
        })
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow
    }

    /// Fetch `request` upstream and build the client response.
    pub async fn forward(&self, request: ProxyRequest) -> Result<Response> {
        let target = self.allow.check(&request.url)?;
        let host = target.host_str().unwrap_or_default().to_string();

        let method = if request.head { Method::HEAD } else { Method::GET };
        let mut builder = self.client.request(method, target.clone());
        if let Some(referer) = self.settings.referer_for(&host) {
            builder = builder.header(header::REFERER, referer);
            if let Some(origin) = origin_of(referer) {
                builder = builder.header(header::ORIGIN, origin);
            }
        }
        if let Some(range) = &request.range {
            builder = builder.header(header::RANGE, range.clone());
        }

        let upstream = builder
            .send()
            .await
            .map_err(|e| self.fetch_error(&host, e))?;

        let status = upstream.status();
        if status.is_redirection() {
            let location = upstream
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            return Err(Error::InvalidProxyTarget(format!(
                "redirect to {location} is not allowed"
            )));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(Error::not_found(&host, upstream.url().path()));
        }
        if !status.is_success() {
            return Err(Error::upstream(&host, format!("HTTP {status}")));
        }

        let final_url = upstream.url().clone();
        let content_type = upstream
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let manifest_hint =
            request.kind == Some(ResourceKind::Manifest) || content_type.contains("mpegurl");
        debug!(
            url = %final_url,
            status = status.as_u16(),
            content_type = %content_type,
            kind = ?request.kind,
            "Proxy upstream response"
        );

        let mut response = Response::builder().status(status.as_u16());
        for name in RELAYED_HEADERS {
            // A rewritten playlist no longer has the upstream length.
            if manifest_hint && name == header::CONTENT_LENGTH {
                continue;
            }
            if let Some(value) = upstream.headers().get(&name) {
                response = response.header(name, value.clone());
            }
        }

        if request.head {
            return response
                .body(Body::empty())
                .map_err(|e| Error::Internal(e.to_string()));
        }

        let mut body = Box::pin(upstream.bytes_stream());
        let first = body
            .next()
            .await
            .transpose()
            .map_err(|e| self.fetch_error(&host, e))?;
        let Some(first) = first else {
            return response
                .body(Body::empty())
                .map_err(|e| Error::Internal(e.to_string()));
        };

        // Partial content is never rewritten.
        let sniffed = is_playlist(&String::from_utf8_lossy(&first[..first.len().min(64)]));
        if status == StatusCode::OK && (manifest_hint || sniffed) {
            let mut buf = BytesMut::from(&first[..]);
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|e| self.fetch_error(&host, e))?;
                if buf.len() + chunk.len() > MAX_MANIFEST_BYTES {
                    return Err(Error::upstream(&host, "playlist too large"));
                }
                buf.extend_from_slice(&chunk);
            }
            return self.manifest_response(buf.freeze(), &final_url, &content_type);
        }

        let rest = stream::once(async move { Ok::<Bytes, reqwest::Error>(first) }).chain(body);
        response
            .body(Body::from_stream(rest))
            .map_err(|e| Error::Internal(e.to_string()))
    }

    fn manifest_response(&self, body: Bytes, base: &Url, content_type: &str) -> Result<Response> {
        let text = String::from_utf8_lossy(&body);
        let builder = Response::builder()
            .status(StatusCode::OK)
            .header(header::CACHE_CONTROL, "no-cache");

        if !is_playlist(&text) {
            // Labelled as a manifest but is not one; pass it on as it came.
            let content_type = if content_type.is_empty() {
                "application/octet-stream"
            } else {
                content_type
            };
            return builder
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CONTENT_LENGTH, body.len())
                .body(Body::from(body))
                .map_err(|e| Error::Internal(e.to_string()));
        }

        let rewritten = rewrite_text(&text, base, &self.settings.endpoint);
        debug!(base = %base, bytes = rewritten.len(), "Playlist rewritten");
        builder
            .header(header::CONTENT_TYPE, MANIFEST_CONTENT_TYPE)
            .header(header::CONTENT_LENGTH, rewritten.len())
            .body(Body::from(rewritten))
            .map_err(|e| Error::Internal(e.to_string()))
    }

    fn fetch_error(&self, host: &str, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(host, self.settings.timeout())
        } else if e.is_redirect() {
            Error::upstream(host, "too many redirects")
        } else {
            Error::upstream(host, e.to_string())
        }
    }
}

fn origin_of(referer: &str) -> Option<String> {
    let url = Url::parse(referer).ok()?;
    Some(url.origin().ascii_serialization())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_from_referer() {
        assert_eq!(
            origin_of("https://www.animeunity.so/anime/1").as_deref(),
            Some("https://www.animeunity.so")
        );
        assert_eq!(origin_of("not a url"), None);
    }
}
