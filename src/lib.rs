pub mod admin_service;
pub mod cluster;
pub mod config;
pub mod observability;
pub mod protocol;
pub mod ring;
pub mod router_service;

use axum::Router;

use crate::cluster::Cluster;

/// The full HTTP surface: routing endpoints plus membership administration.
pub fn app(cluster: Cluster) -> Router {
    Router::new()
        .merge(router_service::routes())
        .merge(admin_service::routes())
        .with_state(cluster)
}
