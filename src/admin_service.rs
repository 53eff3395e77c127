use axum::{
    Json,
    Router,
    extract::State,
    http::StatusCode,
    routing::{
        delete,
        get,
        post,
    },
};
use tracing::error;

use crate::cluster::Cluster;
use crate::protocol::{
    ErrorResponse,
    HostnamesRequest,
    MembershipResponse,
};

pub fn routes() -> Router<Cluster> {
    Router::new()
        .route("/rep", get(handle_rep))
        .route("/add", post(handle_add))
        .route("/rm", delete(handle_rm))
}

/// Report the current membership.
async fn handle_rep(State(cluster): State<Cluster>) -> Json<MembershipResponse> {
    Json(MembershipResponse::successful(cluster.members()))
}

/// Add the requested hostnames to the ring, skipping ones already present.
///
/// Malformed identifiers are rejected before any mutation, so a bad batch
/// leaves the ring untouched.
async fn handle_add(
    State(cluster): State<Cluster>,
    Json(req): Json<HostnamesRequest>,
) -> Result<Json<MembershipResponse>, (StatusCode, Json<ErrorResponse>)> {
    if req.hostnames.iter().any(|hostname| hostname.is_empty()) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::failure("hostnames must not be empty")),
        ));
    }

    for hostname in &req.hostnames {
        if let Err(e) = cluster.add_node(hostname) {
            error!(hostname = %hostname, error = %e, "failed to add node");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::failure(e.to_string())),
            ));
        }
    }

    Ok(Json(MembershipResponse::successful(cluster.members())))
}

/// Remove the requested hostnames from the ring. Absent hostnames are
/// skipped, not errors.
async fn handle_rm(
    State(cluster): State<Cluster>,
    Json(req): Json<HostnamesRequest>,
) -> Json<MembershipResponse> {
    for hostname in &req.hostnames {
        cluster.remove_node(hostname);
    }

    Json(MembershipResponse::successful(cluster.members()))
}
