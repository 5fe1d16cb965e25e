use axum::{
    extract::Extension,
    http::{header, HeaderMap, HeaderName, Uri},
    response::Response,
    routing::get,
    Router,
};
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::sync::Arc;

use crate::api::{extract::ApiPath, see_other};
use crate::error::ApiResult;
use crate::middleware::auth::CurrentUser;
use crate::services::{accounts::safe_next, favorites};

pub fn favorites_router() -> Router {
    Router::new()
        .route(
            "/add-favorite/:product_id/",
            get(add_favorite).post(add_favorite),
        )
        .route(
            "/remove-favorite/:product_id/",
            get(remove_favorite).post(remove_favorite),
        )
}

/// Back to the page the request came from, or home. Only same-site referers
/// are followed; anything pointing at another host lands on `/`.
fn back_to(headers: &HeaderMap) -> String {
    let text = |name: HeaderName| headers.get(name).and_then(|value| value.to_str().ok());
    let Some(referer) = text(header::REFERER) else {
        return "/".to_owned();
    };
    if let Some(path) = safe_next(Some(referer)) {
        return path;
    }

    let same_host = referer.parse::<Uri>().ok().filter(|uri| {
        uri.authority()
            .zip(text(header::HOST))
            .is_some_and(|(authority, host)| authority.as_str().eq_ignore_ascii_case(host))
    });
    same_host
        .and_then(|uri| safe_next(uri.path_and_query().map(|pq| pq.as_str())))
        .unwrap_or_else(|| "/".to_owned())
}

async fn add_favorite(
    ApiPath(product_id): ApiPath<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let txn = db.begin().await?;
    let (product, _) = favorites::add(&txn, user.id, product_id).await?;
    txn.commit().await?;

    Ok(see_other(
        &back_to(&headers),
        format!("{} added to favorites!", product.name),
    ))
}

async fn remove_favorite(
    ApiPath(product_id): ApiPath<i32>,
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let txn = db.begin().await?;
    let product = favorites::remove(&txn, user.id, product_id).await?;
    txn.commit().await?;

    Ok(see_other(
        &back_to(&headers),
        format!("{} removed from favorites!", product.name),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(referer: &str, host: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, HeaderValue::from_str(referer).unwrap());
        headers.insert(header::HOST, HeaderValue::from_str(host).unwrap());
        headers
    }

    #[test]
    fn relative_referer_is_kept() {
        assert_eq!(back_to(&headers("/product/caneca/", "shop.test")), "/product/caneca/");
    }

    #[test]
    fn same_host_referer_keeps_its_path() {
        let headers = headers("http://shop.test:8080/category/canecas/?page=2", "shop.test:8080");
        assert_eq!(back_to(&headers), "/category/canecas/?page=2");
    }

    #[test]
    fn foreign_referers_fall_back_home() {
        assert_eq!(back_to(&headers("https://evil.example/phish", "shop.test")), "/");
        assert_eq!(back_to(&headers("//evil.example/phish", "shop.test")), "/");
        assert_eq!(back_to(&HeaderMap::new()), "/");
    }
}
