use serde_json::json;
use std::convert::Infallible;
use warp::{reject, Filter, Rejection, Reply};

use crate::immich_client::{ImmichClient, ImmichError, ImmichResult};
use crate::warp_helpers::{with_client, UpstreamError};

/// Human-readable connectivity state reported by `/api/health`. An answer
/// with a non-success status is a bare `error`; only transport failures
/// carry their detail.
pub fn immich_status(ping: &ImmichResult<()>) -> String {
    match ping {
        Ok(()) => "connected".to_string(),
        Err(ImmichError::Status { .. }) => "error".to_string(),
        Err(e) => format!("error: {}", e),
    }
}

pub async fn health_check(client: ImmichClient) -> Result<impl Reply, Infallible> {
    let ping = client.ping().await;
    if let Err(e) = &ping {
        log::warn!("Immich ping failed: {}", e);
    }

    Ok(warp::reply::json(&json!({
        "status": "healthy",
        "immich": immich_status(&ping),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

pub async fn server_info(client: ImmichClient) -> Result<impl Reply, Rejection> {
    match client.server_about().await {
        Ok(about) => Ok(warp::reply::json(&about)),
        Err(e) => {
            log::error!("Failed to get server info: {}", e);
            Err(reject::custom(UpstreamError::with_message(
                &e,
                "Failed to get server info",
            )))
        }
    }
}

pub async fn statistics(client: ImmichClient) -> Result<impl Reply, Rejection> {
    match client.statistics().await {
        Ok(stats) => Ok(warp::reply::json(&stats)),
        Err(e) => {
            log::error!("Failed to get statistics: {}", e);
            Err(reject::custom(UpstreamError::with_message(
                &e,
                "Failed to get statistics",
            )))
        }
    }
}

pub fn build_health_routes(
    client: ImmichClient,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let health = warp::path!("api" / "health")
        .and(warp::get())
        .and(with_client(client.clone()))
        .and_then(health_check);

    let info = warp::path!("api" / "server-info")
        .and(warp::get())
        .and(with_client(client.clone()))
        .and_then(server_info);

    let stats = warp::path!("api" / "statistics")
        .and(warp::get())
        .and(with_client(client))
        .and_then(statistics);

    health.or(info).or(stats)
}
