use log::{debug, error, info, warn};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;
use warp::Filter;

use immich_display::cache::ResponseCache;
use immich_display::config::Config;
use immich_display::handlers_assets::build_asset_routes;
use immich_display::handlers_health::build_health_routes;
use immich_display::handlers_people::build_people_routes;
use immich_display::handlers_search::build_search_routes;
use immich_display::immich_client::ImmichClient;
use immich_display::warp_helpers::{cors, handle_rejection};

const CACHE_CLEANUP_INTERVAL_SECS: u64 = 60;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.default_log_level()),
    )
    .init();

    if let Err(e) = config.validate() {
        error!("{}", e);
        error!("Please check your environment variables.");
        return Err(e.into());
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("Starting Immich Read-Only Display on {}", addr);
    info!("Connecting to Immich at: {}", config.immich_url);

    if !is_addr_available(addr) {
        error!(
            "Port {} is already in use. Please stop any existing instance or use a different PORT.",
            config.port
        );
        return Err(format!("Port {} is already in use", config.port).into());
    }

    let client = ImmichClient::new(&config.immich_url, &config.immich_api_key)?;
    check_immich_connection(&client).await;

    let cache = ResponseCache::new();
    spawn_cache_cleanup(cache.clone());
    let config = Arc::new(config);

    let health_routes = build_health_routes(client.clone());
    let people_routes = build_people_routes(client.clone(), cache.clone(), config.clone());
    let search_routes = build_search_routes(client.clone(), cache, config.clone());
    let asset_routes = build_asset_routes(client);

    let routes = health_routes
        .or(people_routes)
        .or(search_routes)
        .or(asset_routes)
        .with(cors(&config.cors_origins))
        .with(warp::log("immich_display"))
        .recover(handle_rejection);

    info!("Server started successfully, listening on http://{}", addr);

    warp::serve(routes).run(addr).await;

    Ok(())
}

/// Expired entries are otherwise only dropped when read again.
fn spawn_cache_cleanup(cache: ResponseCache) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(CACHE_CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let removed = cache.cleanup_expired();
            if removed > 0 {
                debug!("Removed {} expired cache entries", removed);
            }
        }
    });
}

fn is_addr_available(addr: SocketAddr) -> bool {
    TcpListener::bind(addr).is_ok()
}

/// Startup connectivity probe; failures are logged, not fatal.
async fn check_immich_connection(client: &ImmichClient) {
    match client.ping().await {
        Ok(()) => info!("Connected to Immich at {}", client.base_url()),
        Err(e) => warn!("Cannot connect to Immich at {}: {}", client.base_url(), e),
    }
}
