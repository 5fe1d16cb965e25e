use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use serde::Serialize;

use crate::entities::{favorite, product};
use crate::error::{ApiError, ApiResult};

#[derive(Serialize, Debug, Clone)]
pub struct FavoriteEntry {
    pub id: i32,
    pub product: product::Model,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

async fn find_pair<C>(db: &C, user_id: i32, product_id: i32) -> ApiResult<Option<favorite::Model>>
where
    C: ConnectionTrait,
{
    Ok(favorite::Entity::find()
        .filter(favorite::Column::UserId.eq(user_id))
        .filter(favorite::Column::ProductId.eq(product_id))
        .one(db)
        .await?)
}

/// Get-or-create: returns the product and whether a new favorite was stored.
pub async fn add<C>(db: &C, user_id: i32, product_id: i32) -> ApiResult<(product::Model, bool)>
where
    C: ConnectionTrait,
{
    let product = product::Entity::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No product with {product_id} id was found")))?;

    if find_pair(db, user_id, product_id).await?.is_some() {
        return Ok((product, false));
    }

    let new_favorite = favorite::ActiveModel {
        user_id: Set(user_id),
        product_id: Set(product_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    match new_favorite.insert(db).await {
        Ok(_) => Ok((product, true)),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            Ok((product, false))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn remove<C>(db: &C, user_id: i32, product_id: i32) -> ApiResult<product::Model>
where
    C: ConnectionTrait,
{
    let missing = || ApiError::NotFound(format!("Product {product_id} is not in your favorites"));
    let (entry, product) = favorite::Entity::find()
        .filter(favorite::Column::UserId.eq(user_id))
        .filter(favorite::Column::ProductId.eq(product_id))
        .find_also_related(product::Entity)
        .one(db)
        .await?
        .ok_or_else(missing)?;
    let product = product.ok_or_else(missing)?;

    entry.delete(db).await?;
    Ok(product)
}

pub async fn list<C>(db: &C, user_id: i32) -> ApiResult<Vec<FavoriteEntry>>
where
    C: ConnectionTrait,
{
    let rows = favorite::Entity::find()
        .filter(favorite::Column::UserId.eq(user_id))
        .order_by_desc(favorite::Column::CreatedAt)
        .find_also_related(product::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(entry, product)| {
            Some(FavoriteEntry {
                id: entry.id,
                product: product?,
                created_at: entry.created_at,
            })
        })
        .collect())
}
