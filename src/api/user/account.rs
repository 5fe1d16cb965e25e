use axum::{
    extract::Extension,
    response::Response,
    routing::get,
    Json, Router,
};
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::api::{
    extract::{ApiJson, ApiQuery},
    see_other,
};
use crate::config::Config;
use crate::entities::user;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{auth::CurrentUser, profile_gate::COMPLETION_PATH};
use crate::services::{
    accounts,
    profiles::{self, ProfileForm, ProfilePage},
};

pub fn account_router() -> Router {
    Router::new()
        .route(COMPLETION_PATH, get(get_profile).post(update_profile))
        .route("/logout/", get(logout).post(logout))
}

#[derive(Deserialize)]
struct ProfileQuery {
    next: Option<String>,
}

#[derive(Serialize)]
struct ProfileResponse {
    #[serde(flatten)]
    page: ProfilePage,
    complete: bool,
    next: Option<String>,
}

async fn get_profile(
    ApiQuery(query): ApiQuery<ProfileQuery>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<ProfileResponse>> {
    let page = profiles::page(&*db, current.id).await?;
    Ok(Json(ProfileResponse {
        complete: page.profile.is_complete(),
        next: accounts::safe_next(query.next.as_deref()),
        page,
    }))
}

async fn update_profile(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(config): Extension<Arc<Config>>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<ProfileForm>,
) -> ApiResult<Response> {
    payload.validate()?;

    let txn = db.begin().await?;
    let account = user::Entity::find_by_id(current.id)
        .one(&txn)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;
    profiles::save(
        &txn,
        &config.media_root,
        &account,
        &payload.phone,
        &payload.address,
    )
    .await?;
    txn.commit().await?;

    let redirect = accounts::safe_next(payload.next.as_deref())
        .unwrap_or_else(|| COMPLETION_PATH.to_owned());
    Ok(see_other(&redirect, "Profile updated successfully!"))
}

async fn logout(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Response> {
    accounts::revoke_tokens(&*db, current.id).await?;
    tracing::info!(user_id = current.id, username = %current.username, "User logged out");
    Ok(see_other("/", "You have been logged out"))
}
