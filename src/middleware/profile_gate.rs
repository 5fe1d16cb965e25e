use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;

use crate::api::see_other;
use crate::entities::profile;
use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;

/// Where users with an incomplete profile are sent.
pub const COMPLETION_PATH: &str = "/perfil/";

/// Paths that never require a complete profile, matched by prefix.
const EXEMPT_PREFIXES: &[&str] = &[
    "/products/",
    "/login/",
    "/register/",
    "/logout/",
    COMPLETION_PATH,
    "/media/",
    "/api/admin/",
];

pub fn is_exempt(path: &str) -> bool {
    path == "/" || EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Redirects authenticated users without phone or address to the profile
/// completion page, remembering the requested path in `next`.
pub async fn profile_gate_middleware(
    State(db): State<Arc<DatabaseConnection>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_owned();
    if is_exempt(&path) {
        return next.run(req).await;
    }

    let Some(user_id) = req.extensions().get::<CurrentUser>().map(|user| user.id) else {
        return next.run(req).await;
    };

    let profile = match profile::Entity::find()
        .filter(profile::Column::UserId.eq(user_id))
        .one(&*db)
        .await
    {
        Ok(profile) => profile,
        Err(err) => return ApiError::Db(err).into_response(),
    };

    match profile {
        Some(profile) if profile.is_complete() => next.run(req).await,
        _ => {
            tracing::info!(user_id, path = %path, "Profile incomplete, redirecting");
            let location = format!(
                "{COMPLETION_PATH}?next={}",
                urlencoding::encode(&path)
            );
            see_other(&location, "Please complete your profile to continue")
        }
    }
}
