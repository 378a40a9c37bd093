use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use warp::{reject, Filter, Rejection, Reply};

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::handlers_assets::media_reply;
use crate::immich_client::{ImmichClient, ImmichError};
use crate::validation::validate_uuid;
use crate::warp_helpers::{with_cache, with_client, with_config, UpstreamError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeopleQuery {
    #[serde(default)]
    pub with_hidden: bool,
}

/// Keeps only named people, sorted case-insensitively by name. Immich
/// answers either `{"people": [...]}` or a bare array.
pub fn normalize_people(data: &Value) -> Value {
    let people = match data {
        Value::Object(obj) => obj.get("people").cloned().unwrap_or(Value::Null),
        other => other.clone(),
    };

    let mut named: Vec<Value> = people
        .as_array()
        .map(|list| {
            list.iter()
                .filter(|p| p.get("name").and_then(Value::as_str).is_some_and(|n| !n.is_empty()))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    named.sort_by_key(|p| {
        p.get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase()
    });

    json!({ "total": named.len(), "people": named })
}

pub async fn list_people(
    query: PeopleQuery,
    client: ImmichClient,
    cache: ResponseCache,
    config: Arc<Config>,
) -> Result<impl Reply, Rejection> {
    let cache_key = format!("people_{}", query.with_hidden);
    if let Some(cached) = cache.get(&cache_key) {
        return Ok(warp::reply::json(&cached));
    }

    // A failing people list must not break the page, so errors become an
    // empty list with an error field.
    match client.people(query.with_hidden).await {
        Ok(data) => {
            let result = normalize_people(&data);
            cache.set(&cache_key, result.clone(), config.cache.people_ttl);
            Ok(warp::reply::json(&result))
        }
        Err(e) => {
            log::error!("Failed to get people: {}", e);
            let reason = match &e {
                ImmichError::Status { status, .. } => status.as_u16().to_string(),
                other => other.to_string(),
            };
            Ok(warp::reply::json(&json!({
                "people": [],
                "total": 0,
                "error": format!("Failed to get people: {}", reason)
            })))
        }
    }
}

pub async fn get_person(person_id: String, client: ImmichClient) -> Result<impl Reply, Rejection> {
    validate_uuid(&person_id, "person_id").map_err(reject::custom)?;

    match client.person(&person_id).await {
        Ok(person) => Ok(warp::reply::json(&person)),
        Err(e) => Err(reject::custom(UpstreamError::with_message(
            &e,
            "Person not found",
        ))),
    }
}

pub async fn get_person_thumbnail(
    person_id: String,
    client: ImmichClient,
) -> Result<Box<dyn Reply>, Rejection> {
    validate_uuid(&person_id, "person_id").map_err(reject::custom)?;

    let media = client
        .person_thumbnail(&person_id)
        .await
        .map_err(|e| reject::custom(UpstreamError::with_message(&e, "Thumbnail not found")))?;

    Ok(Box::new(media_reply(
        media,
        "image/jpeg",
        Some("public, max-age=3600"),
    )))
}

pub fn build_people_routes(
    client: ImmichClient,
    cache: ResponseCache,
    config: Arc<Config>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let list = warp::path!("api" / "people")
        .and(warp::get())
        .and(warp::query::<PeopleQuery>())
        .and(with_client(client.clone()))
        .and(with_cache(cache))
        .and(with_config(config))
        .and_then(list_people);

    let person = warp::path!("api" / "people" / String)
        .and(warp::get())
        .and(with_client(client.clone()))
        .and_then(get_person);

    let thumbnail = warp::path!("api" / "people" / String / "thumbnail")
        .and(warp::get())
        .and(with_client(client))
        .and_then(get_person_thumbnail);

    list.or(person).or(thumbnail)
}
