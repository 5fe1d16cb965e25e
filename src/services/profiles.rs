use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

use crate::entities::{profile, user};
use crate::error::{ApiError, ApiResult};
use crate::services::{
    accounts::{validate_phone, UserView},
    avatar,
    cart::{self, CartView},
    favorites::{self, FavoriteEntry},
    orders::{self, OrderRecord},
};

#[derive(Deserialize, Validate, Debug)]
pub struct ProfileForm {
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Everything shown on the account page.
#[derive(Serialize, Debug)]
pub struct ProfilePage {
    pub user: UserView,
    pub profile: profile::Model,
    pub cart: CartView,
    pub favorites: Vec<FavoriteEntry>,
    pub orders: Vec<OrderRecord>,
}

/// The user's profile, created on the spot for accounts that predate the save hook.
pub async fn get_or_create<C>(db: &C, user_id: i32) -> ApiResult<profile::Model>
where
    C: ConnectionTrait,
{
    let existing = profile::Entity::find()
        .filter(profile::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    if let Some(found) = existing {
        return Ok(found);
    }

    let now = chrono::Utc::now();
    let created = profile::ActiveModel {
        user_id: Set(user_id),
        phone: Set(String::new()),
        address: Set(String::new()),
        photo: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(created)
}

/// Stores phone and address. A profile without a photo gets a generated avatar.
pub async fn save<C>(
    db: &C,
    media_root: &Path,
    user: &user::Model,
    phone: &str,
    address: &str,
) -> ApiResult<profile::Model>
where
    C: ConnectionTrait,
{
    let current = get_or_create(db, user.id).await?;
    let photo = match current.photo.clone() {
        Some(photo) => photo,
        None => avatar::generate(media_root, &user.username).await?,
    };

    let mut active: profile::ActiveModel = current.into();
    active.phone = Set(phone.trim().to_owned());
    active.address = Set(address.trim().to_owned());
    active.photo = Set(Some(photo));
    active.updated_at = Set(chrono::Utc::now());
    Ok(active.update(db).await?)
}

pub async fn page<C>(db: &C, user_id: i32) -> ApiResult<ProfilePage>
where
    C: ConnectionTrait,
{
    let user = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(ProfilePage {
        profile: get_or_create(db, user_id).await?,
        cart: cart::view(db, user_id).await?,
        favorites: favorites::list(db, user_id).await?,
        orders: orders::orders_for(db, user_id).await?,
        user: user.into(),
    })
}
