//! `/api/proxy`: allow-listed egress for media, playlists and keys.

use aniweave_common::Error;
use aniweave_hls::ResourceKind;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, Method},
    response::Response,
    routing::get,
    Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use crate::proxy::ProxyRequest;
use crate::server::{AppContext, AppError};

pub fn proxy_routes() -> Router<AppContext> {
    // HEAD is served by the GET route; axum drops the body.
    Router::new().route("/proxy", get(proxy))
}

#[derive(Debug, Deserialize)]
struct ProxyParams {
    url: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

async fn proxy(
    State(ctx): State<AppContext>,
    method: Method,
    headers: HeaderMap,
    WithRejection(Query(params), _): WithRejection<Query<ProxyParams>, AppError>,
) -> Result<Response, AppError> {
    let url = params
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| Error::validation("url is required"))?;
    let kind = params
        .kind
        .as_deref()
        .filter(|k| !k.is_empty())
        .map(|k| k.parse::<ResourceKind>().map_err(Error::validation))
        .transpose()?;

    let request = ProxyRequest {
        url,
        kind,
        range: headers.get(header::RANGE).cloned(),
        head: method == Method::HEAD,
    };
    Ok(ctx.proxy.forward(request).await?)
}
