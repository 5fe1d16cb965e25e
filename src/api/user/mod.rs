pub mod account;
pub mod cart;
pub mod favorites;

use axum::{middleware::from_fn_with_state, Router};

use crate::entities::user::Role;
use crate::middleware::auth::auth_middleware;
use account::account_router;
use cart::cart_router;
use favorites::favorites_router;

pub fn user_api_router() -> Router {
    Router::new()
        .merge(cart_router())
        .merge(favorites_router())
        .merge(account_router())
        .route_layer(from_fn_with_state(Role::User, auth_middleware))
}
