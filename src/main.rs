mod api;
mod config;
mod error;
mod signal;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use warp::Filter;

use config::Config;
use signal::SignalingRelay;

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let relay = Arc::new(SignalingRelay::new(config.signaling.join_wait));
    relay.clone().start_liveness_sweeper(
        config.signaling.sweep_interval,
        config.signaling.session_timeout,
    );

    let routes = api::routes::signaling_socket_route(relay.clone())
        .or(api::routes::health_check())
        .or(api::routes::config_endpoint())
        .or(api::routes::rooms_list(relay.store()))
        .or(api::routes::room_delete(relay.store()));

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "Signaling server listening"
    );

    warp::serve(routes).run(config.bind_address()).await;
}
