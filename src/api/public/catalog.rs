use axum::{
    extract::Extension,
    routing::get,
    Json, Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::api::extract::ApiPath;
use crate::error::ApiResult;
use crate::services::catalog::{self, HomePage, ProductDetail, ProductListing};

pub fn catalog_router() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/products/", get(featured_products))
        .route("/category/:slug/", get(category_products))
        .route("/product/:slug/", get(product_detail))
}

async fn home(Extension(db): Extension<Arc<DatabaseConnection>>) -> ApiResult<Json<HomePage>> {
    Ok(Json(catalog::home(&*db).await?))
}

async fn featured_products(
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<Json<ProductListing>> {
    Ok(Json(catalog::featured(&*db).await?))
}

async fn category_products(
    ApiPath(slug): ApiPath<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<Json<ProductListing>> {
    Ok(Json(catalog::by_category(&*db, &slug).await?))
}

async fn product_detail(
    ApiPath(slug): ApiPath<String>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
) -> ApiResult<Json<ProductDetail>> {
    Ok(Json(catalog::detail(&*db, &slug).await?))
}
