//! Stream resolution and chapter pages.

use std::collections::HashMap;

use aniweave_common::{Error, ProviderId, StreamDescriptor, StreamOptions};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use futures::future::join_all;
use serde_json::{json, Map, Value};

use super::lookup::{direct_slot, CHAPTER_PROVIDERS, EPISODE_PROVIDERS};
use crate::server::{AppContext, AppError};

pub fn stream_routes() -> Router<AppContext> {
    Router::new()
        .route("/stream", get(stream))
        .route("/pages", get(pages))
}

fn param<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn ordinal(params: &HashMap<String, String>) -> Result<u32, Error> {
    match param(params, "ep") {
        Some(ep) => ep
            .parse()
            .ok()
            .filter(|n: &u32| *n >= 1)
            .ok_or_else(|| Error::validation(format!("ep must be a positive integer, got {ep}"))),
        None => Ok(1),
    }
}

fn descriptor_json(descriptor: &StreamDescriptor) -> Value {
    let mut value = json!({
        "available": true,
        "stream_url": descriptor.playable_url(),
    });
    if let (Value::Object(target), Ok(Value::Object(fields))) =
        (&mut value, serde_json::to_value(descriptor))
    {
        target.extend(fields);
    }
    value
}

async fn stream(
    State(ctx): State<AppContext>,
    WithRejection(Query(params), _): WithRejection<Query<HashMap<String, String>>, AppError>,
) -> Result<Json<Value>, AppError> {
    let requested: Vec<(ProviderId, &str)> = EPISODE_PROVIDERS
        .iter()
        .filter_map(|p| param(&params, p.query_key()).map(|handle| (*p, handle)))
        .collect();
    if requested.is_empty() {
        return Err(Error::validation(
            "a provider id (AW, AS, AU, AP, AG, HI, UN) is required",
        )
        .into());
    }

    let ordinal = ordinal(&params)?;
    let options = StreamOptions {
        quality: param(&params, "res").map(String::from),
        audio_track: param(&params, "audio").map(String::from),
    };

    let resolver = &ctx.resolver;
    let results = join_all(requested.iter().map(|(provider, handle)| {
        let slot = direct_slot(*provider, handle, ordinal, &params);
        let options = &options;
        async move { (*provider, resolver.resolve(&slot, *provider, options).await) }
    }))
    .await;

    if results.len() == 1 {
        let (provider, result) = results.into_iter().next().ok_or_else(|| {
            Error::Internal("stream results vanished".into())
        })?;
        let descriptor = result?;
        if provider == ProviderId::HNime {
            return Ok(Json(json!({ "ok": true, "embeds": [descriptor_json(&descriptor)] })));
        }
        let mut body = Map::new();
        body.insert("ok".to_string(), Value::Bool(true));
        body.insert(provider.as_str().to_string(), descriptor_json(&descriptor));
        return Ok(Json(Value::Object(body)));
    }

    let attempts = results.len();
    if results.iter().all(|(_, result)| result.is_err()) {
        let last = results
            .into_iter()
            .filter_map(|(_, result)| result.err())
            .last()
            .unwrap_or_else(|| Error::Internal("stream results vanished".into()));
        return Err(Error::AllProvidersFailed {
            attempts,
            last: Box::new(last),
        }
        .into());
    }

    // Partial success: every provider reports its own availability.
    let mut body = Map::new();
    for (provider, result) in results {
        let entry = match result {
            Ok(descriptor) => descriptor_json(&descriptor),
            Err(e) => json!({
                "available": false,
                "code": e.kind(),
                "error": e.to_string(),
            }),
        };
        body.insert(provider.as_str().to_string(), entry);
    }
    body.insert("ok".to_string(), Value::Bool(true));
    Ok(Json(Value::Object(body)))
}

async fn pages(
    State(ctx): State<AppContext>,
    WithRejection(Query(params), _): WithRejection<Query<HashMap<String, String>>, AppError>,
) -> Result<Json<Value>, AppError> {
    let (provider, handle) = CHAPTER_PROVIDERS
        .iter()
        .find_map(|p| param(&params, p.query_key()).map(|handle| (*p, handle)))
        .ok_or_else(|| Error::validation("a chapter reference (MW or CX) is required"))?;

    let slot = direct_slot(provider, handle, ordinal(&params)?, &params);
    let pages = ctx.resolver.chapter_pages(&slot, provider).await?;
    Ok(Json(json!({
        "ok": true,
        "provider": provider,
        "pages": pages,
    })))
}
