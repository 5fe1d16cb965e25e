use argon2::{password_hash::PasswordVerifier, Argon2, PasswordHash};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::Serialize;
use std::str::FromStr;

use crate::entities::profile;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: Role,
    #[sea_orm(default_value = 0)]
    pub token_version: i32,
    pub date_joined: DateTimeUtc,
}

impl Model {
    pub fn check_hash(&self, password: &str) -> Result<(), String> {
        let parsed_hash = PasswordHash::new(&self.password).map_err(|err| err.to_string())?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| "Password verification failed".to_string())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumIter, DeriveActiveEnum, Serialize)]
#[sea_orm(
    enum_name = "role_enum",
    db_type = "String(StringLen::N(16))",
    rs_type = "String"
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {s}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "crate::entities::profile::Entity")]
    Profile,
    #[sea_orm(has_many = "crate::entities::cart::Entity")]
    Cart,
    #[sea_orm(has_many = "crate::entities::favorite::Entity")]
    Favorite,
    #[sea_orm(has_many = "crate::entities::order::Entity")]
    Order,
}

impl Related<crate::entities::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// Every new account gets an empty profile row.
    async fn after_save<C>(model: Model, db: &C, insert: bool) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        if insert {
            let now = chrono::Utc::now();
            let new_profile = profile::ActiveModel {
                user_id: Set(model.id),
                phone: Set(String::new()),
                address: Set(String::new()),
                photo: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            profile::Entity::insert(new_profile).exec(db).await?;
        }
        Ok(model)
    }
}
