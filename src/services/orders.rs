//! Order snapshots. An order copies the cart's lines and current prices; the
//! copy does not change when product prices do. Status is stored as given and
//! never advanced here.

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;

use crate::entities::{order, order_line};
use crate::error::{ApiError, ApiResult};
use crate::services::cart;

#[derive(Serialize, Debug, Clone)]
pub struct OrderRecord {
    #[serde(flatten)]
    pub order: order::Model,
    pub lines: Vec<OrderLineView>,
}

/// An order line with its snapshot subtotal.
#[derive(Serialize, Debug, Clone)]
pub struct OrderLineView {
    #[serde(flatten)]
    pub line: order_line::Model,
    pub line_total: Decimal,
}

impl From<order_line::Model> for OrderLineView {
    fn from(line: order_line::Model) -> Self {
        OrderLineView {
            line_total: line_total(&line),
            line,
        }
    }
}

/// Writes a pending order holding the user's current cart. The cart itself is
/// left as it is. Run it inside a transaction.
pub async fn record_from_cart<C>(
    db: &C,
    user_id: i32,
    shipping_address: &str,
) -> ApiResult<OrderRecord>
where
    C: ConnectionTrait,
{
    let shipping_address = shipping_address.trim();
    if shipping_address.is_empty() {
        return Err(ApiError::BadRequest("A shipping address is required".into()));
    }

    let items = cart::lines(db, user_id).await?;
    if items.is_empty() {
        return Err(ApiError::BadRequest("Your cart is empty".into()));
    }

    let placed = order::ActiveModel {
        user_id: Set(user_id),
        placed_at: Set(chrono::Utc::now()),
        status: Set(order::Status::Pending),
        total: Set(cart::total(&items)),
        shipping_address: Set(shipping_address.to_owned()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let line = order_line::ActiveModel {
            order_id: Set(placed.id),
            product_id: Set(item.product.id),
            unit_price: Set(item.product.price),
            quantity: Set(item.quantity),
            ..Default::default()
        }
        .insert(db)
        .await?;
        lines.push(OrderLineView::from(line));
    }

    tracing::info!(order_id = placed.id, user_id, total = %placed.total, "Recorded order");
    Ok(OrderRecord {
        order: placed,
        lines,
    })
}

/// The user's orders, newest first.
pub async fn orders_for<C>(db: &C, user_id: i32) -> ApiResult<Vec<OrderRecord>>
where
    C: ConnectionTrait,
{
    let rows = order::Entity::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::PlacedAt)
        .find_with_related(order_line::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(order, lines)| OrderRecord {
            order,
            lines: lines.into_iter().map(OrderLineView::from).collect(),
        })
        .collect())
}

pub fn line_total(line: &order_line::Model) -> Decimal {
    line.unit_price * Decimal::from(line.quantity)
}
