use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::api::extract::{ApiJson, ApiPath};
use crate::entities::category;
use crate::error::{ApiError, ApiResult};
use crate::services::catalog::{self, CategoryInput, CategoryPatch};

//ROUTERS
pub fn admin_category_router() -> Router {
    Router::new()
        .route("/category", post(create_category))
        .route(
            "/category/:id",
            get(admin_get_category)
                .patch(patch_category)
                .delete(delete_category),
        )
}

//ROUTES
async fn create_category(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    ApiJson(payload): ApiJson<CategoryInput>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let created = catalog::create_category(&txn, payload).await?;
    txn.commit().await?;

    tracing::info!(category_id = created.id, slug = %created.slug, "Created category");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn admin_get_category(
    ApiPath(id): ApiPath<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<Json<category::Model>> {
    category::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No category with {id} id was found")))
}

async fn patch_category(
    ApiPath(id): ApiPath<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    ApiJson(payload): ApiJson<CategoryPatch>,
) -> ApiResult<Json<category::Model>> {
    payload.validate()?;

    let txn = db.begin().await?;
    let updated = catalog::update_category(&txn, id, payload).await?;
    txn.commit().await?;
    Ok(Json(updated))
}

async fn delete_category(
    ApiPath(id): ApiPath<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    catalog::delete_category(&txn, id).await?;
    txn.commit().await?;

    tracing::info!(category_id = id, "Deleted category");
    Ok(Json(json!({
        "message": "Resource deleted successfully."
    })))
}
