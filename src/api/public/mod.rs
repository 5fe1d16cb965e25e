pub mod auth;
pub mod catalog;
pub mod media;

use axum::Router;

use auth::auth_router;
use catalog::catalog_router;
use media::media_router;

pub fn public_api_router() -> Router {
    Router::new()
        .merge(auth_router())
        .merge(catalog_router())
        .merge(media_router())
}
