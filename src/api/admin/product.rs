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
use crate::entities::product;
use crate::error::{ApiError, ApiResult};
use crate::services::catalog::{self, BulkRequest, ProductInput, ProductPatch};

//ROUTERS
pub fn admin_product_router() -> Router {
    Router::new()
        .route("/product", get(admin_get_products).post(create_product))
        .route("/product/bulk", post(bulk_update))
        .route(
            "/product/:id",
            get(admin_get_product)
                .patch(patch_product)
                .delete(delete_product),
        )
}

//ROUTES
async fn admin_get_products(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<Json<Vec<product::Model>>> {
    Ok(Json(catalog::all_products(&*db).await?))
}

async fn create_product(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    ApiJson(payload): ApiJson<ProductInput>,
) -> ApiResult<impl IntoResponse> {
    payload.validate()?;

    let txn = db.begin().await?;
    let created = catalog::create_product(&txn, payload).await?;
    txn.commit().await?;

    tracing::info!(product_id = created.id, slug = %created.slug, "Created product");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn admin_get_product(
    ApiPath(id): ApiPath<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<Json<product::Model>> {
    product::Entity::find_by_id(id)
        .one(&*db)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No product with {id} id was found")))
}

async fn patch_product(
    ApiPath(id): ApiPath<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    ApiJson(payload): ApiJson<ProductPatch>,
) -> ApiResult<Json<product::Model>> {
    payload.validate()?;

    let txn = db.begin().await?;
    let updated = catalog::update_product(&txn, id, payload).await?;
    txn.commit().await?;
    Ok(Json(updated))
}

async fn delete_product(
    ApiPath(id): ApiPath<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<impl IntoResponse> {
    let txn = db.begin().await?;
    catalog::delete_product(&txn, id).await?;
    txn.commit().await?;

    tracing::info!(product_id = id, "Deleted product");
    Ok(Json(json!({
        "message": "Resource deleted successfully."
    })))
}

async fn bulk_update(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    ApiJson(payload): ApiJson<BulkRequest>,
) -> ApiResult<impl IntoResponse> {
    let action = payload.action;
    let txn = db.begin().await?;
    let updated = catalog::bulk_update(&txn, payload).await?;
    txn.commit().await?;

    tracing::info!(?action, updated, "Applied bulk product action");
    Ok(Json(json!({
        "updated": updated
    })))
}
