pub mod admin;
pub mod extract;
pub mod public;
pub mod user;

use axum::{
    http::{header, HeaderValue, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    Extension, Json, Router,
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::middleware::{
    auth::{identify_middleware, AuthState, TokenKeys},
    logging::logging_middleware,
    profile_gate::profile_gate_middleware,
};
use admin::admin_api_router;
use public::public_api_router;
use user::user_api_router;

/// `303 See Other` to `location`, with the user-facing message in the body.
pub fn see_other(location: &str, message: impl Into<String>) -> Response {
    let location_value =
        HeaderValue::from_str(location).unwrap_or_else(|_| HeaderValue::from_static("/"));
    let mut response = (
        StatusCode::SEE_OTHER,
        Json(json!({
            "message": message.into(),
            "redirect": location,
        })),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::LOCATION, location_value);
    response
}

pub fn create_api_router(shared_db: Arc<DatabaseConnection>, config: Arc<Config>) -> Router {
    let keys = Arc::new(TokenKeys::new(config.secret.clone(), config.token_ttl_hours));
    let auth_state = AuthState {
        db: shared_db.clone(),
        keys: keys.clone(),
    };

    Router::new()
        .merge(public_api_router())
        .merge(user_api_router())
        .nest("/api/admin", admin_api_router())
        .layer(from_fn_with_state(shared_db.clone(), profile_gate_middleware))
        .layer(from_fn_with_state(auth_state, identify_middleware))
        .layer(from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(shared_db))
        .layer(Extension(config))
        .layer(Extension(keys))
}
