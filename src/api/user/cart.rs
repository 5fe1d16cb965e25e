use axum::{
    extract::Extension,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;
use std::sync::Arc;

use crate::api::{extract::ApiPath, see_other};
use crate::error::ApiResult;
use crate::middleware::auth::CurrentUser;
use crate::services::{
    cart::{self, AddOutcome, CartLine, CartView, DecrementOutcome},
    profiles,
};

const CART_PATH: &str = "/cart/";

//ROUTERS
pub fn cart_router() -> Router {
    Router::new()
        .route("/cart/", get(get_cart))
        .route("/add-to-cart/:product_id/", get(add_to_cart).post(add_to_cart))
        .route(
            "/remove-from-cart/:item_id/",
            get(remove_from_cart).post(remove_from_cart),
        )
        .route(
            "/delete-from-cart/:item_id/",
            get(delete_from_cart).post(delete_from_cart),
        )
        .route("/checkout/", get(checkout))
}

async fn get_cart(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<CartView>> {
    Ok(Json(cart::view(&*db, user.id).await?))
}

async fn add_to_cart(
    ApiPath(product_id): ApiPath<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Response> {
    let txn = db.begin().await?;
    let (product, outcome) = cart::add(&txn, user.id, product_id).await?;
    txn.commit().await?;

    let message = match outcome {
        AddOutcome::Created => format!("{} added to cart!", product.name),
        AddOutcome::Incremented => format!("Quantity of {} updated!", product.name),
    };
    Ok(see_other(CART_PATH, message))
}

async fn remove_from_cart(
    ApiPath(item_id): ApiPath<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Response> {
    let txn = db.begin().await?;
    let (product, outcome) = cart::decrement(&txn, user.id, item_id).await?;
    txn.commit().await?;

    let message = match outcome {
        DecrementOutcome::Reduced(_) => format!("Quantity of {} reduced.", product.name),
        DecrementOutcome::Removed => format!("{} removed from cart.", product.name),
    };
    Ok(see_other(CART_PATH, message))
}

async fn delete_from_cart(
    ApiPath(item_id): ApiPath<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Response> {
    let txn = db.begin().await?;
    let product = cart::remove(&txn, user.id, item_id).await?;
    txn.commit().await?;

    Ok(see_other(
        CART_PATH,
        format!("{} removed from cart.", product.name),
    ))
}

#[derive(Serialize)]
struct CheckoutSummary {
    items: Vec<CartLine>,
    total: Decimal,
    shipping_address: String,
}

/// Read-only summary; nothing is recorded here.
async fn checkout(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    let CartView { items, total } = cart::view(&*db, user.id).await?;
    let profile = profiles::get_or_create(&*db, user.id).await?;

    Ok(Json(CheckoutSummary {
        items,
        total,
        shipping_address: profile.address,
    }))
}
