use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::entities::{category, order_line, product};
use crate::error::{ApiError, ApiResult};
use crate::services::slug::{slug_or_derive, SLUG_PATTERN};

const RELATED_LIMIT: usize = 4;

/// Upper bound of a price with ten digits, two of them decimals.
fn max_price() -> Decimal {
    Decimal::new(99_999_999_99, 2)
}

#[derive(Serialize, Debug, Clone)]
pub struct CategoryRef {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

impl From<&category::Model> for CategoryRef {
    fn from(value: &category::Model) -> Self {
        CategoryRef {
            id: value.id,
            name: value.name.clone(),
            slug: value.slug.clone(),
        }
    }
}

/// A product together with the category it is listed under.
#[derive(Serialize, Debug, Clone)]
pub struct ProductCard {
    #[serde(flatten)]
    pub product: product::Model,
    pub category: Option<CategoryRef>,
}

#[derive(Serialize, Debug)]
pub struct CategoryWithProducts {
    #[serde(flatten)]
    pub category: category::Model,
    pub products: Vec<product::Model>,
}

#[derive(Serialize, Debug)]
pub struct HomePage {
    pub categories: Vec<CategoryWithProducts>,
    pub new_products: Vec<ProductCard>,
    pub all_products: Vec<ProductCard>,
}

#[derive(Serialize, Debug)]
pub struct ProductListing {
    pub category: Option<category::Model>,
    pub categories: Vec<category::Model>,
    pub products: Vec<ProductCard>,
}

#[derive(Serialize, Debug)]
pub struct ProductDetail {
    pub product: ProductCard,
    pub related_products: Vec<product::Model>,
}

async fn all_categories<C>(db: &C) -> Result<Vec<category::Model>, DbErr>
where
    C: ConnectionTrait,
{
    category::Entity::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
}

fn cards(products: Vec<product::Model>, categories: &[category::Model]) -> Vec<ProductCard> {
    let by_id: HashMap<i32, &category::Model> = categories.iter().map(|c| (c.id, c)).collect();
    products
        .into_iter()
        .map(|product| ProductCard {
            category: by_id.get(&product.category_id).map(|c| CategoryRef::from(*c)),
            product,
        })
        .collect()
}

pub async fn home<C>(db: &C) -> ApiResult<HomePage>
where
    C: ConnectionTrait,
{
    let categories = all_categories(db).await?;
    let products = product::Entity::find()
        .filter(product::Column::Available.eq(true))
        .order_by_desc(product::Column::Created)
        .all(db)
        .await?;

    let mut grouped: HashMap<i32, Vec<product::Model>> = HashMap::new();
    for product in products.iter() {
        grouped
            .entry(product.category_id)
            .or_default()
            .push(product.clone());
    }

    let listed = cards(products, &categories);
    Ok(HomePage {
        new_products: listed.clone(),
        all_products: listed,
        categories: categories
            .into_iter()
            .map(|category| CategoryWithProducts {
                products: grouped.remove(&category.id).unwrap_or_default(),
                category,
            })
            .collect(),
    })
}

/// Featured, available products across all categories.
pub async fn featured<C>(db: &C) -> ApiResult<ProductListing>
where
    C: ConnectionTrait,
{
    let categories = all_categories(db).await?;
    let products = product::Entity::find()
        .filter(product::Column::Featured.eq(true))
        .filter(product::Column::Available.eq(true))
        .order_by_desc(product::Column::Created)
        .all(db)
        .await?;

    Ok(ProductListing {
        products: cards(products, &categories),
        category: None,
        categories,
    })
}

pub async fn by_category<C>(db: &C, slug: &str) -> ApiResult<ProductListing>
where
    C: ConnectionTrait,
{
    let category = category::Entity::find()
        .filter(category::Column::Slug.eq(slug))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No category with slug {slug} was found")))?;

    let categories = all_categories(db).await?;
    let products = product::Entity::find()
        .filter(product::Column::CategoryId.eq(category.id))
        .filter(product::Column::Available.eq(true))
        .order_by_desc(product::Column::Created)
        .all(db)
        .await?;

    Ok(ProductListing {
        products: cards(products, &categories),
        category: Some(category),
        categories,
    })
}

pub async fn detail<C>(db: &C, slug: &str) -> ApiResult<ProductDetail>
where
    C: ConnectionTrait,
{
    let product = product::Entity::find()
        .filter(product::Column::Slug.eq(slug))
        .filter(product::Column::Available.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No product with slug {slug} was found")))?;

    let category = product.find_related(category::Entity).one(db).await?;
    let mut related = product::Entity::find()
        .filter(product::Column::CategoryId.eq(product.category_id))
        .filter(product::Column::Available.eq(true))
        .filter(product::Column::Id.ne(product.id))
        .all(db)
        .await?;
    related.shuffle(&mut rand::thread_rng());
    related.truncate(RELATED_LIMIT);

    Ok(ProductDetail {
        product: ProductCard {
            category: category.as_ref().map(CategoryRef::from),
            product,
        },
        related_products: related,
    })
}

// Administration

#[derive(Deserialize, Validate, Debug)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 100), regex(path = *SLUG_PATTERN))]
    pub slug: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize, Validate, Debug, Default)]
pub struct CategoryPatch {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100), regex(path = *SLUG_PATTERN))]
    pub slug: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, Validate, Debug)]
pub struct ProductInput {
    pub category_id: i32,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 200), regex(path = *SLUG_PATTERN))]
    pub slug: Option<String>,
    pub price: Decimal,
    pub image: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub featured: bool,
    pub available: Option<bool>,
}

#[derive(Deserialize, Validate, Debug, Default)]
pub struct ProductPatch {
    pub category_id: Option<i32>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 200), regex(path = *SLUG_PATTERN))]
    pub slug: Option<String>,
    pub price: Option<Decimal>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub is_new: Option<bool>,
    pub featured: Option<bool>,
    pub available: Option<bool>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    MakeAvailable,
    MakeUnavailable,
    MarkAsNew,
    MarkAsFeatured,
}

#[derive(Deserialize, Debug)]
pub struct BulkRequest {
    pub action: BulkAction,
    pub ids: Vec<i32>,
}

/// Prices are non-negative, below `max_price` and carry at most two decimal
/// places. Extra precision is refused rather than rounded.
fn checked_price(price: Decimal) -> ApiResult<Decimal> {
    if price.is_sign_negative() || price > max_price() {
        return Err(ApiError::BadRequest(format!("Invalid price {price}")));
    }
    if price.normalize().scale() > 2 {
        return Err(ApiError::BadRequest(format!(
            "Price {price} has more than 2 decimal places"
        )));
    }
    Ok(price)
}

async fn ensure_category<C>(db: &C, category_id: i32) -> ApiResult<()>
where
    C: ConnectionTrait,
{
    category::Entity::find_by_id(category_id)
        .one(db)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::NotFound(format!("No category with {category_id} id was found")))
}

pub async fn create_category<C>(db: &C, input: CategoryInput) -> ApiResult<category::Model>
where
    C: ConnectionTrait,
{
    let slug = slug_or_derive(input.slug.as_deref(), &input.name);
    if slug.is_empty() {
        return Err(ApiError::BadRequest("Cannot derive a slug from this name".into()));
    }

    category::ActiveModel {
        name: Set(input.name.trim().to_owned()),
        slug: Set(slug),
        image: Set(input.image),
        description: Set(input.description),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|err| ApiError::unique_or_db(err, "Category slug already exists"))
}

pub async fn update_category<C>(db: &C, id: i32, patch: CategoryPatch) -> ApiResult<category::Model>
where
    C: ConnectionTrait,
{
    let found = category::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No category with {id} id was found")))?;

    let mut active: category::ActiveModel = found.into();
    if let Some(name) = patch.name {
        active.name = Set(name.trim().to_owned());
    }
    if let Some(slug) = patch.slug {
        active.slug = Set(slug);
    }
    if let Some(image) = patch.image {
        active.image = Set(Some(image));
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }

    active
        .update(db)
        .await
        .map_err(|err| ApiError::unique_or_db(err, "Category slug already exists"))
}

/// Deletes the category and, by cascade, its products. Refused while any of
/// those products appears on an order.
pub async fn delete_category<C>(db: &C, id: i32) -> ApiResult<()>
where
    C: ConnectionTrait,
{
    let found = category::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No category with {id} id was found")))?;

    let referenced = order_line::Entity::find()
        .inner_join(product::Entity)
        .filter(product::Column::CategoryId.eq(id))
        .count(db)
        .await?;
    if referenced > 0 {
        return Err(ApiError::Protected(format!(
            "Category {id} has products referenced by orders"
        )));
    }

    found.delete(db).await.map_err(protected_or_db)?;
    Ok(())
}

pub async fn create_product<C>(db: &C, input: ProductInput) -> ApiResult<product::Model>
where
    C: ConnectionTrait,
{
    ensure_category(db, input.category_id).await?;
    let price = checked_price(input.price)?;
    let slug = slug_or_derive(input.slug.as_deref(), &input.name);
    if slug.is_empty() {
        return Err(ApiError::BadRequest("Cannot derive a slug from this name".into()));
    }

    let now = chrono::Utc::now();
    product::ActiveModel {
        category_id: Set(input.category_id),
        name: Set(input.name.trim().to_owned()),
        slug: Set(slug),
        image: Set(input.image),
        description: Set(input.description),
        price: Set(price),
        is_new: Set(input.is_new),
        featured: Set(input.featured),
        available: Set(input.available.unwrap_or(true)),
        created: Set(now),
        updated: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|err| ApiError::unique_or_db(err, "Product slug already exists"))
}

pub async fn update_product<C>(db: &C, id: i32, patch: ProductPatch) -> ApiResult<product::Model>
where
    C: ConnectionTrait,
{
    let found = product::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No product with {id} id was found")))?;

    let mut active: product::ActiveModel = found.into();
    if let Some(category_id) = patch.category_id {
        ensure_category(db, category_id).await?;
        active.category_id = Set(category_id);
    }
    if let Some(name) = patch.name {
        active.name = Set(name.trim().to_owned());
    }
    if let Some(slug) = patch.slug {
        active.slug = Set(slug);
    }
    if let Some(price) = patch.price {
        active.price = Set(checked_price(price)?);
    }
    if let Some(image) = patch.image {
        active.image = Set(Some(image));
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }
    if let Some(is_new) = patch.is_new {
        active.is_new = Set(is_new);
    }
    if let Some(featured) = patch.featured {
        active.featured = Set(featured);
    }
    if let Some(available) = patch.available {
        active.available = Set(available);
    }
    active.updated = Set(chrono::Utc::now());

    active
        .update(db)
        .await
        .map_err(|err| ApiError::unique_or_db(err, "Product slug already exists"))
}

/// Deletes a product unless an order line still points at it.
pub async fn delete_product<C>(db: &C, id: i32) -> ApiResult<()>
where
    C: ConnectionTrait,
{
    let found = product::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No product with {id} id was found")))?;

    let referenced = order_line::Entity::find()
        .filter(order_line::Column::ProductId.eq(id))
        .count(db)
        .await?;
    if referenced > 0 {
        return Err(ApiError::Protected(format!(
            "Product {id} is referenced by {referenced} order line(s)"
        )));
    }

    found.delete(db).await.map_err(protected_or_db)?;
    Ok(())
}

fn protected_or_db(err: DbErr) -> ApiError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            ApiError::Protected("Still referenced by existing orders".into())
        }
        _ => ApiError::Db(err),
    }
}

/// Applies one flag change to every listed product; returns how many changed.
pub async fn bulk_update<C>(db: &C, request: BulkRequest) -> ApiResult<u64>
where
    C: ConnectionTrait,
{
    if request.ids.is_empty() {
        return Ok(0);
    }

    let (column, value) = match request.action {
        BulkAction::MakeAvailable => (product::Column::Available, true),
        BulkAction::MakeUnavailable => (product::Column::Available, false),
        BulkAction::MarkAsNew => (product::Column::IsNew, true),
        BulkAction::MarkAsFeatured => (product::Column::Featured, true),
    };

    let result = product::Entity::update_many()
        .col_expr(column, Expr::value(value))
        .col_expr(product::Column::Updated, Expr::value(chrono::Utc::now()))
        .filter(product::Column::Id.is_in(request.ids))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Every product, including unavailable ones, newest first.
pub async fn all_products<C>(db: &C) -> ApiResult<Vec<product::Model>>
where
    C: ConnectionTrait,
{
    Ok(product::Entity::find()
        .order_by_desc(product::Column::Created)
        .all(db)
        .await?)
}
