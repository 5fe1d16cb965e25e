use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use crate::entities::user::{self, Entity as UserEntity, Role};
use crate::error::{ApiError, ApiResult};

static USERNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username pattern"));

#[derive(Deserialize, Validate, Debug)]
pub struct RegisterForm {
    #[validate(length(min = 1, max = 100), custom(function = "validate_full_name"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub last_name: String,
    #[validate(length(min = 1, max = 150), custom(function = "validate_username"))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(
        length(min = 8, message = "Password must have at least 8 characters"),
        custom(function = "validate_password")
    )]
    pub password1: String,
    #[validate(must_match(other = "password1", message = "The two passwords do not match"))]
    pub password2: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    /// Path to continue to after registration.
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Account fields safe to hand back to the client.
#[derive(Serialize, Debug)]
pub struct UserView {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub date_joined: chrono::DateTime<chrono::Utc>,
}

impl From<user::Model> for UserView {
    fn from(value: user::Model) -> Self {
        UserView {
            id: value.id,
            username: value.username,
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
            role: value.role,
            date_joined: value.date_joined,
        }
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn validate_full_name(value: &str) -> Result<(), ValidationError> {
    if value.split_whitespace().count() < 2 {
        return Err(invalid("full_name", "Please enter your full name"));
    }
    Ok(())
}

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    if !USERNAME.is_match(value) {
        return Err(invalid(
            "username",
            "Username may contain only letters, digits and @/./+/-/_",
        ));
    }
    Ok(())
}

pub fn validate_password(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("password_numeric", "Password cannot be entirely numeric"));
    }
    Ok(())
}

/// Digits only, area code included.
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("phone_digits", "Phone number must contain only digits"));
    }
    if value.len() < 10 {
        return Err(invalid("phone_short", "Invalid phone number (include the area code)"));
    }
    if value.len() > 20 {
        return Err(invalid("phone_long", "Phone number is too long"));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| err.to_string())
}

/// Inserts the account. The profile row appears through the user save hook.
pub async fn create_user<C>(db: &C, form: &RegisterForm) -> ApiResult<user::Model>
where
    C: ConnectionTrait,
{
    let taken = UserEntity::find()
        .filter(user::Column::Username.eq(&form.username))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(ApiError::Conflict("Username already exists".into()));
    }

    let password = hash_password(&form.password1).map_err(ApiError::Internal)?;
    let new_user = user::ActiveModel {
        username: Set(form.username.clone()),
        email: Set(form.email.clone()),
        first_name: Set(form.first_name.trim().to_owned()),
        last_name: Set(form.last_name.trim().to_owned()),
        password: Set(password),
        role: Set(Role::User),
        token_version: Set(0),
        date_joined: Set(chrono::Utc::now()),
        ..Default::default()
    };

    new_user
        .insert(db)
        .await
        .map_err(|err| ApiError::unique_or_db(err, "Username already exists"))
}

pub async fn authenticate<C>(db: &C, form: &LoginForm) -> ApiResult<user::Model>
where
    C: ConnectionTrait,
{
    let user = UserEntity::find()
        .filter(user::Column::Username.eq(&form.username))
        .one(db)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    user.check_hash(&form.password)
        .map_err(|_| ApiError::InvalidCredentials)?;
    Ok(user)
}

/// Invalidates every token issued to the user so far.
pub async fn revoke_tokens<C>(db: &C, user_id: i32) -> ApiResult<()>
where
    C: ConnectionTrait,
{
    UserEntity::update_many()
        .col_expr(
            user::Column::TokenVersion,
            Expr::col(user::Column::TokenVersion).add(1),
        )
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

/// A redirect target supplied by the client, kept only when it stays on this
/// site.
pub fn safe_next(next: Option<&str>) -> Option<String> {
    next.filter(|path| {
        path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
    })
    .map(str::to_owned)
}
