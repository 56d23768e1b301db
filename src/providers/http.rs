//! Rate-limited upstream client shared by all adapters.

use std::num::NonZeroU32;

use aniweave_common::{Error, ProviderId, Result};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{redirect, StatusCode};
use tracing::{debug, warn};

use super::{site_url, RedirectMode, RequestProfile};

/// Maximum redirects followed in [`RedirectMode::Follow`].
const MAX_REDIRECTS: usize = 10;

/// Response shape an adapter expects before handing the body to an extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// A `text/*` document; anything else is a challenge or error page.
    Html,
    /// A JSON payload; an HTML body means a block page.
    Json,
    Any,
}

impl Expect {
    fn accepts(self, content_type: &str) -> bool {
        let ct = content_type.to_ascii_lowercase();
        match self {
            Expect::Html => ct.starts_with("text/"),
            Expect::Json => !ct.contains("html"),
            Expect::Any => true,
        }
    }
}

/// HTTP client for one provider.
pub struct ProviderHttp {
    provider: ProviderId,
    profile: RequestProfile,
    client: reqwest::Client,
    manual: Option<reqwest::Client>,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl ProviderHttp {
    pub fn new(provider: ProviderId, profile: RequestProfile) -> Result<Self> {
        let headers = default_headers(&profile)?;

        let client = reqwest::Client::builder()
            .timeout(profile.timeout)
            .default_headers(headers.clone())
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| Error::Internal(format!("{provider}: failed to build client: {e}")))?;

        let manual = match profile.redirect {
            RedirectMode::Follow => None,
            RedirectMode::Manual => Some(
                reqwest::Client::builder()
                    .timeout(profile.timeout)
                    .default_headers(headers)
                    .redirect(redirect::Policy::none())
                    .build()
                    .map_err(|e| {
                        Error::Internal(format!("{provider}: failed to build client: {e}"))
                    })?,
            ),
        };

        let per_second = NonZeroU32::new(profile.rate_limit_per_sec).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            provider,
            profile,
            client,
            manual,
            rate_limiter,
        })
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn profile(&self) -> &RequestProfile {
        &self.profile
    }

    pub fn base_url(&self) -> &str {
        &self.profile.base_url
    }

    /// Absolute URL for a site path or handle.
    pub fn url(&self, path: &str) -> String {
        site_url(&self.profile.base_url, path)
    }

    /// GET a document and return its body.
    pub async fn get_text(&self, url: &str, expect: Expect) -> Result<String> {
        self.get_text_with(url, expect, &[]).await
    }

    /// GET with extra request headers (XHR markers, a foreign referer).
    pub async fn get_text_with(
        &self,
        url: &str,
        expect: Expect,
        headers: &[(&str, &str)],
    ) -> Result<String> {
        self.rate_limiter.until_ready().await;
        debug!(provider = %self.provider, url, "Fetching");

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::not_found(self.provider, url));
        }
        if !status.is_success() {
            warn!(provider = %self.provider, url, status = status.as_u16(), "Upstream error status");
            return Err(Error::upstream(
                self.provider,
                format!("HTTP {} from {url}", status.as_u16()),
            ));
        }

        if let Some(content_type) = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !expect.accepts(content_type) {
                return Err(Error::upstream(
                    self.provider,
                    format!("unexpected content-type '{content_type}' from {url}"),
                ));
            }
        }

        response.text().await.map_err(|e| self.transport_error(e))
    }

    /// GET without following redirects and return the redirect target.
    ///
    /// A 2xx response whose body is itself an absolute URL is accepted too.
    pub async fn redirect_location(&self, url: &str) -> Result<String> {
        let client = self.manual.as_ref().ok_or_else(|| {
            Error::Internal(format!("{}: manual redirects not enabled", self.provider))
        })?;

        self.rate_limiter.until_ready().await;
        debug!(provider = %self.provider, url, "Fetching redirect target");

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or(Error::NoValidSource {
                    provider: self.provider,
                })?;
            return Ok(resolve_location(url, location));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(Error::not_found(self.provider, url));
        }
        if !status.is_success() {
            return Err(Error::upstream(
                self.provider,
                format!("HTTP {} from {url}", status.as_u16()),
            ));
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let body = body.trim();
        if body.starts_with("http://") || body.starts_with("https://") {
            Ok(body.to_string())
        } else {
            Err(Error::NoValidSource {
                provider: self.provider,
            })
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::timeout(self.provider, self.profile.timeout)
        } else {
            Error::upstream(self.provider, err.to_string())
        }
    }
}

fn default_headers(profile: &RequestProfile) -> Result<HeaderMap> {
    let value = |v: &str| {
        HeaderValue::from_str(v).map_err(|e| Error::Internal(format!("invalid header value: {e}")))
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, value(&profile.user_agent)?);
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("it-IT,it;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    if let Some(referer) = &profile.referer {
        headers.insert(header::REFERER, value(referer)?);
    }
    if let Some(origin) = &profile.origin {
        headers.insert(header::ORIGIN, value(origin)?);
    }
    Ok(headers)
}

fn resolve_location(request_url: &str, location: &str) -> String {
    url::Url::parse(request_url)
        .and_then(|base| base.join(location))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| location.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::time::Duration;
    use wiremock::matchers::{header as header_is, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn http_for(server: &MockServer, redirect: RedirectMode) -> ProviderHttp {
        let profile = RequestProfile::same_site(server.uri(), Duration::from_secs(2))
            .with_redirect(redirect);
        ProviderHttp::new(ProviderId::AnimeWorld, profile).unwrap()
    }

    #[test]
    fn expectations() {
        assert!(Expect::Html.accepts("text/html; charset=UTF-8"));
        assert!(!Expect::Html.accepts("application/octet-stream"));
        assert!(Expect::Json.accepts("application/json"));
        assert!(Expect::Json.accepts("text/plain"));
        assert!(!Expect::Json.accepts("text/html"));
    }

    #[tokio::test]
    async fn sends_profile_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/play/x"))
            .and(header_is("referer", format!("{}/", server.uri()).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let http = http_for(&server, RedirectMode::Follow);
        let body = http
            .get_text(&http.url("/play/x"), Expect::Html)
            .await
            .unwrap();
        assert_eq!(body, "<html></html>");
    }

    #[tokio::test]
    async fn status_mapping() {
        let server = MockServer::start().await;
        Mock::given(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(path("/blocked"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<title>Just a moment...</title>", "text/html"),
            )
            .mount(&server)
            .await;

        let http = http_for(&server, RedirectMode::Follow);
        assert_matches!(
            http.get_text(&http.url("/missing"), Expect::Html).await,
            Err(Error::NotFound { .. })
        );
        assert_matches!(
            http.get_text(&http.url("/broken"), Expect::Html).await,
            Err(Error::Upstream { .. })
        );
        assert_matches!(
            http.get_text(&http.url("/blocked"), Expect::Json).await,
            Err(Error::Upstream { .. })
        );
    }

    #[tokio::test]
    async fn timeout_joins_taxonomy() {
        let server = MockServer::start().await;
        Mock::given(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let http = http_for(&server, RedirectMode::Follow);
        assert_matches!(
            http.get_text(&http.url("/slow"), Expect::Any).await,
            Err(Error::Timeout { .. })
        );
    }

    #[tokio::test]
    async fn manual_redirect_exposes_location() {
        let server = MockServer::start().await;
        Mock::given(path("/embed-url/9"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "https://vixcloud.co/embed/1"),
            )
            .mount(&server)
            .await;

        let http = http_for(&server, RedirectMode::Manual);
        let target = http
            .redirect_location(&http.url("/embed-url/9"))
            .await
            .unwrap();
        assert_eq!(target, "https://vixcloud.co/embed/1");

        let follow = http_for(&server, RedirectMode::Follow);
        assert_matches!(
            follow.redirect_location(&follow.url("/embed-url/9")).await,
            Err(Error::Internal(_))
        );
    }
}
