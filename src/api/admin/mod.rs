pub mod category;
pub mod product;

use axum::{middleware::from_fn_with_state, Router};

use category::admin_category_router;
use product::admin_product_router;

use crate::entities::user::Role;
use crate::middleware::auth::auth_middleware;

pub fn admin_api_router() -> Router {
    Router::new()
        .merge(admin_category_router())
        .merge(admin_product_router())
        .route_layer(from_fn_with_state(Role::Admin, auth_middleware))
}
