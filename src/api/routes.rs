use std::convert::Infallible;
use std::sync::Arc;

use warp::http::StatusCode;
use warp::Filter;

use crate::signal::{code, RoomInfo, RoomStore, SignalingRelay};

use super::websocket;

/// The signaling WebSocket endpoint
pub fn signaling_socket_route(
    relay: Arc<SignalingRelay>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("signal")
        .and(warp::ws())
        .and(with_relay(relay))
        .map(|ws: warp::ws::Ws, relay: Arc<SignalingRelay>| {
            ws.on_upgrade(move |websocket| {
                websocket::handle_signaling_socket(websocket, relay)
            })
        })
}

pub fn health_check() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone
{
    warp::path("health")
        .and(warp::get())
        .map(|| {
            warp::reply::json(&serde_json::json!({
                "status": "healthy",
                "service": "Signaling Server",
                "version": env!("CARGO_PKG_VERSION")
            }))
        })
}

pub fn config_endpoint() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone
{
    warp::path("config")
        .and(warp::get())
        .map(|| {
            use std::env;

            let config = serde_json::json!({
                "JOIN_WAIT_MS": env::var("JOIN_WAIT_MS").ok(),
                "SESSION_TIMEOUT_SECS": env::var("SESSION_TIMEOUT_SECS").ok(),
                "STUN_SERVER_URL": env::var("STUN_SERVER_URL").ok(),
            });

            warp::reply::json(&config)
        })
}

/// Read-only room listing for the admin view, newest first
pub fn rooms_list(
    store: Arc<RoomStore>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("rooms")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_store(store))
        .and_then(|store: Arc<RoomStore>| async move {
            let rooms: Vec<RoomInfo> = store
                .list_rooms()
                .await
                .iter()
                .map(|room| room.info())
                .collect();
            Ok::<_, warp::Rejection>(warp::reply::json(&rooms))
        })
}

/// Explicit administrative deletion of a room row
pub fn room_delete(
    store: Arc<RoomStore>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path!("rooms" / String)
        .and(warp::delete())
        .and(with_store(store))
        .and_then(|room_code: String, store: Arc<RoomStore>| async move {
            if !code::validate(&room_code) {
                let body = warp::reply::json(&serde_json::json!({
                    "error": "invalid_room_code",
                    "room_code": room_code,
                }));
                return Ok::<_, warp::Rejection>(warp::reply::with_status(
                    body,
                    StatusCode::BAD_REQUEST,
                ));
            }

            match store.delete_room(&room_code).await {
                Ok(()) => {
                    let body = warp::reply::json(&serde_json::json!({
                        "deleted": true,
                        "room_code": room_code,
                    }));
                    Ok(warp::reply::with_status(body, StatusCode::OK))
                }
                Err(e) => {
                    let body = warp::reply::json(&serde_json::json!({
                        "error": e.kind(),
                        "room_code": room_code,
                    }));
                    Ok(warp::reply::with_status(body, StatusCode::NOT_FOUND))
                }
            }
        })
}

fn with_relay(
    relay: Arc<SignalingRelay>,
) -> impl Filter<Extract = (Arc<SignalingRelay>,), Error = Infallible> + Clone {
    warp::any().map(move || relay.clone())
}

fn with_store(
    store: Arc<RoomStore>,
) -> impl Filter<Extract = (Arc<RoomStore>,), Error = Infallible> + Clone {
    warp::any().map(move || store.clone())
}
