use axum::{
    extract::Extension,
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::path::{Component, PathBuf};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::api::extract::ApiPath;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};

pub fn media_router() -> Router {
    Router::new().route("/media/*path", get(serve_media))
}

/// Resolves a request path below `root`, refusing anything that could leave it.
pub fn resolve(root: &std::path::Path, requested: &str) -> Option<PathBuf> {
    let relative = std::path::Path::new(requested);
    if requested.is_empty()
        || !relative
            .components()
            .all(|part| matches!(part, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(relative))
}

async fn serve_media(
    ApiPath(path): ApiPath<String>,
    Extension(config): Extension<Arc<Config>>,
) -> ApiResult<impl IntoResponse> {
    let not_found = || ApiError::NotFound(format!("No media at {path}"));
    let target = resolve(&config.media_root, &path).ok_or_else(not_found)?;
    let file = tokio::fs::File::open(&target)
        .await
        .map_err(|_| not_found())?;

    let content_type = mime_guess::from_path(&target)
        .first_raw()
        .unwrap_or("application/octet-stream");

    let stream = ReaderStream::new(file);
    let body = axum::body::Body::from_stream(stream);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("inline"),
    );

    Ok((headers, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_inside_media_root() {
        let root = std::path::Path::new("/srv/media");
        assert_eq!(
            resolve(root, "avatars/avatar_ana.png"),
            Some(PathBuf::from("/srv/media/avatars/avatar_ana.png"))
        );
        assert_eq!(resolve(root, "../secret.txt"), None);
        assert_eq!(resolve(root, "avatars/../../etc/passwd"), None);
        assert_eq!(resolve(root, "/etc/passwd"), None);
        assert_eq!(resolve(root, ""), None);
    }
}
