//! Series metadata and reconciled episode/chapter listings.

use std::collections::{BTreeMap, HashMap};

use aniweave_common::{Error, ProviderId, SeriesQuery};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::{json, Value};

use super::lookup::{classify_path, keyed_queries, CHAPTER_PROVIDERS, EPISODE_PROVIDERS};
use crate::catalog::Listing;
use crate::server::{AppContext, AppError};

pub fn catalog_routes() -> Router<AppContext> {
    Router::new()
        .route("/meta", get(meta))
        .route("/episodes", get(episodes))
        .route("/chapters", get(chapters))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaParams {
    path: Option<String>,
    unity_id: Option<String>,
    animepahe_id: Option<String>,
}

/// Primary lookup first, then every other supplied handle in order.
fn meta_chain(ctx: &AppContext, params: &MetaParams) -> Result<Vec<SeriesQuery>, Error> {
    let mut chain = Vec::new();
    if let Some(path) = params.path.as_deref().filter(|p| !p.trim().is_empty()) {
        chain.push(classify_path(&ctx.config, path)?);
    }
    if let Some(id) = params.unity_id.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        chain.push(SeriesQuery::new(ProviderId::Unity, id));
    }
    if let Some(id) = params.animepahe_id.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        chain.push(SeriesQuery::new(ProviderId::AnimePahe, id));
    }
    if chain.is_empty() {
        return Err(Error::validation(
            "one of path, unityId or animepaheId is required",
        ));
    }
    Ok(chain)
}

async fn meta(
    State(ctx): State<AppContext>,
    WithRejection(Query(params), _): WithRejection<Query<MetaParams>, AppError>,
) -> Result<Json<Value>, AppError> {
    let mut chain = meta_chain(&ctx, &params)?.into_iter();
    let primary = chain
        .next()
        .ok_or_else(|| Error::validation("no lookup supplied"))?;
    let lookup = ctx.catalog.meta(primary, chain.collect()).await?;

    let record = lookup.record;
    Ok(Json(json!({
        "ok": true,
        "meta": {
            "title": record.title,
            "image_url": record.image_url,
            "description": record.description,
            "genres": record.genres,
            "related": record.related,
            "count": record.episodes_or_chapters.len(),
        },
        "provider": lookup.source.provider,
        "source": lookup.source,
        "fallback": lookup.fallback,
        "attempts": lookup.attempts,
    })))
}

async fn episodes(
    State(ctx): State<AppContext>,
    WithRejection(Query(params), _): WithRejection<Query<HashMap<String, String>>, AppError>,
) -> Result<Json<Value>, AppError> {
    let mut queries = Vec::new();
    if let Some(path) = params.get("path").filter(|p| !p.trim().is_empty()) {
        queries.push(classify_path(&ctx.config, path)?);
    }
    for query in keyed_queries(&params, &EPISODE_PROVIDERS) {
        if !queries.iter().any(|q| q.provider == query.provider) {
            queries.push(query);
        }
    }
    if queries.is_empty() {
        return Err(Error::validation("path or a provider id (AW, AS, AU, AP, AG, HI, UN) is required").into());
    }

    let listing = ctx.catalog.listing(&queries).await?;
    Ok(Json(listing_body("episodes", listing)))
}

async fn chapters(
    State(ctx): State<AppContext>,
    WithRejection(Query(params), _): WithRejection<Query<HashMap<String, String>>, AppError>,
) -> Result<Json<Value>, AppError> {
    let queries = keyed_queries(&params, &CHAPTER_PROVIDERS);
    if queries.is_empty() {
        return Err(Error::validation("a provider id (MW, CX) is required").into());
    }

    let listing = ctx.catalog.listing(&queries).await?;
    Ok(Json(listing_body("chapters", listing)))
}

fn listing_body(field: &str, listing: Listing) -> Value {
    let errors: BTreeMap<ProviderId, Value> = listing
        .failures
        .iter()
        .map(|(provider, e)| {
            (
                *provider,
                json!({ "code": e.kind(), "error": e.to_string() }),
            )
        })
        .collect();

    let mut body = json!({
        "ok": true,
        "title": listing.series.title,
        "source": listing.series.sources,
        "offsets": listing.offsets,
        "skipped": listing.skipped,
    });
    body[field] = json!(listing.series.ordinals);
    if !errors.is_empty() {
        body["errors"] = json!(errors);
    }
    body
}
