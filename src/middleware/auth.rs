use crate::entities::user::{self, Entity as UserEntity, Role};
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc};
use thiserror::Error;

use crate::api::see_other;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub role: String,
    /// Token version of the user at issue time; a logout bumps it.
    pub ver: i32,
    pub exp: usize,
}

/// The authenticated account behind the current request.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

#[derive(Clone, Debug)]
pub struct TokenKeys {
    secret: String,
    ttl_hours: i64,
}

#[derive(Clone, Debug)]
pub struct AuthState {
    pub db: Arc<DatabaseConnection>,
    pub keys: Arc<TokenKeys>,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid user id or role")]
    InvalidUserOrRole,
    #[error("Token expired or malformed")]
    TokenRejected,
    #[error("Token was revoked")]
    TokenRevoked,
    #[error("Failed to generate token")]
    GenerationFail,
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
}

impl TokenKeys {
    pub fn new(secret: impl Into<String>, ttl_hours: i64) -> Self {
        TokenKeys {
            secret: secret.into(),
            ttl_hours,
        }
    }

    pub fn generate_token(&self, user: &user::Model) -> Result<String, AuthError> {
        let exp = Utc::now()
            .checked_add_signed(Duration::hours(self.ttl_hours))
            .ok_or(AuthError::GenerationFail)?
            .timestamp() as usize;

        let claims = Claims {
            user_id: user.id,
            role: user.role.to_string(),
            ver: user.token_version,
            exp,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|_| AuthError::GenerationFail)
    }

    /// Decodes the token and checks it against the stored account: the user
    /// must still exist with the same role and token version.
    pub async fn validate_token(
        &self,
        db: &DatabaseConnection,
        token: &str,
    ) -> Result<user::Model, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|_| AuthError::TokenRejected)?
        .claims;

        let role = Role::from_str(&claims.role).map_err(|_| AuthError::InvalidUserOrRole)?;
        let user = UserEntity::find_by_id(claims.user_id)
            .one(db)
            .await?
            .ok_or(AuthError::InvalidUserOrRole)?;

        if user.role != role {
            return Err(AuthError::InvalidUserOrRole);
        }
        if user.token_version != claims.ver {
            return Err(AuthError::TokenRevoked);
        }
        Ok(user)
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Resolves the bearer token, if any, into a `CurrentUser` extension.
/// Requests without a usable token continue anonymously.
pub async fn identify_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&req) {
        match state.keys.validate_token(&state.db, token).await {
            Ok(user) => {
                req.extensions_mut().insert(CurrentUser {
                    id: user.id,
                    username: user.username,
                    role: user.role,
                });
            }
            Err(AuthError::Db(err)) => return ApiError::Db(err).into_response(),
            Err(err) => tracing::debug!(error = %err, "Ignoring bearer token"),
        }
    }
    next.run(req).await
}

/// Guards a router: anonymous visitors of user pages are sent to the login
/// page with the current path as `next`; admin routes need the admin role.
pub async fn auth_middleware(
    State(required): State<Role>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(current) = req.extensions().get::<CurrentUser>() else {
        return match required {
            Role::User => {
                let next_path = urlencoding::encode(req.uri().path()).into_owned();
                Ok(see_other(
                    &format!("/login/?next={next_path}"),
                    "Please log in to continue",
                ))
            }
            Role::Admin => Err(ApiError::Unauthorized),
        };
    };

    if required == Role::Admin && current.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }

    Ok(next.run(req).await)
}
