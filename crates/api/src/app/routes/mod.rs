use axum::Router;

pub mod addresses;
pub mod common;
pub mod individuals;
pub mod organisations;
pub mod roles;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/individuals", individuals::router())
        .nest("/organisations", organisations::router())
        .nest("/roles", roles::router())
        .nest("/addresses", addresses::router())
}
