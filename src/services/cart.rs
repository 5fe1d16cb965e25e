//! Per-user cart ledger: one row per (user, product) holding a quantity of at
//! least one. Every item lookup is scoped to the requesting user, so another
//! user's row reads as missing.

use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::Serialize;

use crate::entities::{cart, product};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Created,
    Incremented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecrementOutcome {
    Reduced(u32),
    Removed,
}

#[derive(Serialize, Debug, Clone)]
pub struct CartLine {
    pub id: i32,
    pub product: product::Model,
    pub quantity: u32,
    pub line_total: Decimal,
}

#[derive(Serialize, Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total: Decimal,
}

async fn find_product<C>(db: &C, product_id: i32) -> ApiResult<product::Model>
where
    C: ConnectionTrait,
{
    product::Entity::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No product with {product_id} id was found")))
}

async fn find_item<C>(db: &C, user_id: i32, item_id: i32) -> ApiResult<(cart::Model, product::Model)>
where
    C: ConnectionTrait,
{
    let missing = || ApiError::NotFound(format!("No cart item with {item_id} id was found"));
    let (item, product) = cart::Entity::find_by_id(item_id)
        .filter(cart::Column::UserId.eq(user_id))
        .find_also_related(product::Entity)
        .one(db)
        .await?
        .ok_or_else(missing)?;
    let product = product.ok_or_else(missing)?;
    Ok((item, product))
}

/// `quantity = quantity + 1` in one statement; returns whether a row matched.
async fn increment<C>(db: &C, user_id: i32, product_id: i32) -> Result<bool, DbErr>
where
    C: ConnectionTrait,
{
    let result = cart::Entity::update_many()
        .col_expr(cart::Column::Quantity, Expr::col(cart::Column::Quantity).add(1))
        .col_expr(cart::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(cart::Column::UserId.eq(user_id))
        .filter(cart::Column::ProductId.eq(product_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn add<C>(db: &C, user_id: i32, product_id: i32) -> ApiResult<(product::Model, AddOutcome)>
where
    C: ConnectionTrait,
{
    let product = find_product(db, product_id).await?;

    if increment(db, user_id, product_id).await? {
        return Ok((product, AddOutcome::Incremented));
    }
    let outcome = insert_or_increment(db, user_id, product_id).await?;
    Ok((product, outcome))
}

/// Inserts a quantity-one row, falling back to an increment when the unique
/// (user, product) index reports the row already exists.
async fn insert_or_increment<C>(db: &C, user_id: i32, product_id: i32) -> Result<AddOutcome, DbErr>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now();
    let new_item = cart::ActiveModel {
        user_id: Set(user_id),
        product_id: Set(product_id),
        quantity: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    match new_item.insert(db).await {
        Ok(_) => Ok(AddOutcome::Created),
        // A concurrent request created the row first.
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            increment(db, user_id, product_id).await?;
            Ok(AddOutcome::Incremented)
        }
        Err(err) => Err(err),
    }
}

pub async fn decrement<C>(
    db: &C,
    user_id: i32,
    item_id: i32,
) -> ApiResult<(product::Model, DecrementOutcome)>
where
    C: ConnectionTrait,
{
    let (item, product) = find_item(db, user_id, item_id).await?;

    if item.quantity > 1 {
        let remaining = item.quantity - 1;
        let mut active: cart::ActiveModel = item.into();
        active.quantity = Set(remaining);
        active.updated_at = Set(chrono::Utc::now());
        active.update(db).await?;
        Ok((product, DecrementOutcome::Reduced(remaining)))
    } else {
        item.delete(db).await?;
        Ok((product, DecrementOutcome::Removed))
    }
}

pub async fn remove<C>(db: &C, user_id: i32, item_id: i32) -> ApiResult<product::Model>
where
    C: ConnectionTrait,
{
    let (item, product) = find_item(db, user_id, item_id).await?;
    item.delete(db).await?;
    Ok(product)
}

/// Cart rows with their products at current prices, newest first.
pub async fn lines<C>(db: &C, user_id: i32) -> ApiResult<Vec<CartLine>>
where
    C: ConnectionTrait,
{
    let rows = cart::Entity::find()
        .filter(cart::Column::UserId.eq(user_id))
        .order_by_desc(cart::Column::CreatedAt)
        .order_by_desc(cart::Column::Id)
        .find_also_related(product::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(item, product)| {
            let product = product?;
            Some(CartLine {
                id: item.id,
                line_total: product.price * Decimal::from(item.quantity),
                quantity: item.quantity,
                product,
            })
        })
        .collect())
}

pub fn total(lines: &[CartLine]) -> Decimal {
    lines.iter().map(|line| line.line_total).sum()
}

pub async fn view<C>(db: &C, user_id: i32) -> ApiResult<CartView>
where
    C: ConnectionTrait,
{
    let items = lines(db, user_id).await?;
    Ok(CartView {
        total: total(&items),
        items,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::entities::{category, test_support::memory_db, user};
    use crate::services::accounts::{create_user, tests::form};
    use sea_orm::{DatabaseConnection, PaginatorTrait};

    pub(crate) async fn seed_product(db: &DatabaseConnection, slug: &str, cents: i64) -> product::Model {
        let category = match category::Entity::find()
            .filter(category::Column::Slug.eq("geral"))
            .one(db)
            .await
            .unwrap()
        {
            Some(found) => found,
            None => category::ActiveModel {
                name: Set("Geral".into()),
                slug: Set("geral".into()),
                image: Set(None),
                description: Set(String::new()),
                ..Default::default()
            }
            .insert(db)
            .await
            .unwrap(),
        };

        let now = chrono::Utc::now();
        product::ActiveModel {
            category_id: Set(category.id),
            name: Set(slug.to_uppercase()),
            slug: Set(slug.into()),
            image: Set(None),
            description: Set(String::new()),
            price: Set(Decimal::new(cents, 2)),
            is_new: Set(false),
            featured: Set(false),
            available: Set(true),
            created: Set(now),
            updated: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub(crate) async fn seed_user(db: &DatabaseConnection, username: &str) -> user::Model {
        create_user(db, &form(username)).await.unwrap()
    }

    async fn rows_for(db: &DatabaseConnection, user_id: i32) -> u64 {
        cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .count(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn insert_racing_an_existing_row_increments_it() {
        let db = memory_db().await;
        let user = seed_user(&db, "ana").await;
        let product = seed_product(&db, "caneca", 1000).await;
        let now = chrono::Utc::now();
        cart::ActiveModel {
            user_id: Set(user.id),
            product_id: Set(product.id),
            quantity: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let outcome = insert_or_increment(&db, user.id, product.id).await.unwrap();

        assert_eq!(outcome, AddOutcome::Incremented);
        assert_eq!(rows_for(&db, user.id).await, 1);
        let row = cart::Entity::find()
            .filter(cart::Column::UserId.eq(user.id))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.quantity, 2);
    }

    #[tokio::test]
    async fn add_twice_increments_single_row() {
        let db = memory_db().await;
        let user = seed_user(&db, "ana").await;
        let p = seed_product(&db, "caneca", 1000).await;

        let (_, first) = add(&db, user.id, p.id).await.unwrap();
        let (_, second) = add(&db, user.id, p.id).await.unwrap();

        assert_eq!(first, AddOutcome::Created);
        assert_eq!(second, AddOutcome::Incremented);
        assert_eq!(rows_for(&db, user.id).await, 1);
        let items = lines(&db, user.id).await.unwrap();
        assert_eq!(items[0].quantity, 2);
    }

    #[tokio::test]
    async fn add_unknown_product_is_not_found() {
        let db = memory_db().await;
        let user = seed_user(&db, "ana").await;
        let result = add(&db, user.id, 999).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn ledger_scenario() {
        let db = memory_db().await;
        let user = seed_user(&db, "ana").await;
        let p = seed_product(&db, "caneca", 1000).await;

        add(&db, user.id, p.id).await.unwrap();
        let cart = view(&db, user.id).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 1);

        add(&db, user.id, p.id).await.unwrap();
        let cart = view(&db, user.id).await.unwrap();
        assert_eq!(cart.items[0].quantity, 2);
        assert_eq!(cart.total, Decimal::new(2000, 2));

        let item_id = cart.items[0].id;
        let (_, outcome) = decrement(&db, user.id, item_id).await.unwrap();
        assert_eq!(outcome, DecrementOutcome::Reduced(1));
        let cart = view(&db, user.id).await.unwrap();
        assert_eq!(cart.items[0].quantity, 1);
        assert_eq!(cart.total, Decimal::new(1000, 2));

        let (_, outcome) = decrement(&db, user.id, item_id).await.unwrap();
        assert_eq!(outcome, DecrementOutcome::Removed);
        let cart = view(&db, user.id).await.unwrap();
        assert!(cart.items.is_empty());
        assert_eq!(cart.total, Decimal::ZERO);
    }

    #[tokio::test]
    async fn total_follows_current_prices() {
        let db = memory_db().await;
        let user = seed_user(&db, "ana").await;
        let mug = seed_product(&db, "caneca", 1000).await;
        let pad = seed_product(&db, "mousepad", 2550).await;

        add(&db, user.id, mug.id).await.unwrap();
        add(&db, user.id, mug.id).await.unwrap();
        add(&db, user.id, pad.id).await.unwrap();
        assert_eq!(view(&db, user.id).await.unwrap().total, Decimal::new(4550, 2));

        let mut active: product::ActiveModel = mug.into();
        active.price = Set(Decimal::new(1200, 2));
        active.update(&db).await.unwrap();

        assert_eq!(view(&db, user.id).await.unwrap().total, Decimal::new(4950, 2));
    }

    #[tokio::test]
    async fn other_users_items_are_not_found() {
        let db = memory_db().await;
        let owner = seed_user(&db, "ana").await;
        let intruder = seed_user(&db, "bruno").await;
        let p = seed_product(&db, "caneca", 1000).await;
        add(&db, owner.id, p.id).await.unwrap();
        let item_id = lines(&db, owner.id).await.unwrap()[0].id;

        assert!(matches!(
            decrement(&db, intruder.id, item_id).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            remove(&db, intruder.id, item_id).await,
            Err(ApiError::NotFound(_))
        ));
        assert_eq!(rows_for(&db, owner.id).await, 1);
    }

    #[tokio::test]
    async fn remove_deletes_regardless_of_quantity() {
        let db = memory_db().await;
        let user = seed_user(&db, "ana").await;
        let p = seed_product(&db, "caneca", 1000).await;
        for _ in 0..3 {
            add(&db, user.id, p.id).await.unwrap();
        }
        let item_id = lines(&db, user.id).await.unwrap()[0].id;

        remove(&db, user.id, item_id).await.unwrap();
        assert_eq!(rows_for(&db, user.id).await, 0);
        assert!(matches!(
            remove(&db, user.id, item_id).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
