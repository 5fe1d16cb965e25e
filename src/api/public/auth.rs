use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::api::extract::{ApiJson, ApiQuery};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::TokenKeys;
use crate::services::{
    accounts::{self, LoginForm, RegisterForm},
    profiles,
};

pub fn auth_router() -> Router {
    Router::new()
        .route("/login/", get(login_page).post(login))
        .route("/register/", get(register_page).post(register))
}

#[derive(Deserialize)]
struct NextQuery {
    next: Option<String>,
}

async fn login_page(ApiQuery(query): ApiQuery<NextQuery>) -> impl IntoResponse {
    Json(json!({
        "message": "Log in with your username and password",
        "next": accounts::safe_next(query.next.as_deref()),
    }))
}

async fn register_page(ApiQuery(query): ApiQuery<NextQuery>) -> impl IntoResponse {
    Json(json!({
        "message": "Create an account to continue",
        "next": accounts::safe_next(query.next.as_deref()),
    }))
}

async fn login(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(keys): Extension<Arc<TokenKeys>>,
    ApiJson(payload): ApiJson<LoginForm>,
) -> ApiResult<impl IntoResponse> {
    let user = accounts::authenticate(&*db, &payload).await?;
    let token = keys
        .generate_token(&user)
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    tracing::info!(user_id = user.id, "User logged in");
    let redirect = accounts::safe_next(payload.next.as_deref()).unwrap_or_else(|| "/".into());
    Ok((
        StatusCode::OK,
        Json(json!({
            "token": token,
            "redirect": redirect,
        })),
    ))
}

async fn register(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
    Extension(keys): Extension<Arc<TokenKeys>>,
    ApiJson(payload): ApiJson<RegisterForm>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let user = accounts::create_user(&txn, &payload).await?;
    profiles::save(
        &txn,
        &config.media_root,
        &user,
        &payload.phone,
        &payload.address,
    )
    .await?;
    txn.commit().await?;

    let token = keys
        .generate_token(&user)
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    tracing::info!(user_id = user.id, username = %user.username, "Registered user");
    let redirect = accounts::safe_next(payload.next.as_deref()).unwrap_or_else(|| "/".into());
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration completed successfully",
            "token": token,
            "redirect": redirect,
        })),
    ))
}
