use std::net::SocketAddr;

use axum::{
    Json,
    Router,
    extract::{
        ConnectInfo,
        State,
    },
    http::StatusCode,
    routing::get,
};
use tracing::{
    debug,
    warn,
};

use crate::cluster::Cluster;
use crate::protocol::{
    ErrorResponse,
    RouteResponse,
    STATUS_SUCCESSFUL,
};
use crate::ring::RingError;

pub fn routes() -> Router<Cluster> {
    Router::new()
        .route("/home", get(handle_home))
        .route("/heartbeat", get(handle_heartbeat))
}

/// Resolve the calling client to a backend node.
///
/// The routing key is the client address; the ring takes any string key, so
/// the derivation policy stays in this layer.
async fn handle_home(
    State(cluster): State<Cluster>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Json<RouteResponse>, (StatusCode, Json<ErrorResponse>)> {
    let key = addr.ip().to_string();

    match cluster.lookup(&key) {
        Ok(node) => {
            debug!(key = %key, node = %node, "routed request");
            Ok(Json(RouteResponse {
                message: format!("Hello from {node}"),
                status: STATUS_SUCCESSFUL.to_string(),
            }))
        },
        Err(RingError::EmptyRing) => {
            warn!(key = %key, "no members on ring, cannot route");
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::failure("no backend nodes available")),
            ))
        },
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::failure(e.to_string())),
        )),
    }
}

async fn handle_heartbeat() -> StatusCode {
    StatusCode::OK
}
