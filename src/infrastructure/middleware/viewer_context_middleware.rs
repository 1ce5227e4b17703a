// ViewerContext middleware - resolves the viewer from the identity provider's
// header and injects it into request extensions

use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::infrastructure::viewer::ViewerContext;

/// Header carrying the viewer id issued by the identity provider. Absent
/// means anonymous.
pub const VIEWER_HEADER: &str = "x-viewer-id";

pub fn viewer_from_headers(headers: &HeaderMap) -> AppResult<ViewerContext> {
    let Some(raw) = headers.get(VIEWER_HEADER) else {
        return Ok(ViewerContext::anonymous());
    };
    let raw = raw
        .to_str()
        .map_err(|_| AppError::invalid(format!("{} is not valid text", VIEWER_HEADER)))?
        .trim();
    if raw.is_empty() {
        return Ok(ViewerContext::anonymous());
    }
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(ViewerContext::new(id)),
        _ => Err(AppError::invalid(format!("Invalid {}: '{}'", VIEWER_HEADER, raw))),
    }
}

pub async fn viewer_context_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let viewer = viewer_from_headers(request.headers())?;
    debug!(viewer = ?viewer.viewer_id, "viewer resolved");
    request.extensions_mut().insert(viewer);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(viewer_from_headers(&headers).unwrap(), ViewerContext::anonymous());

        headers.insert(VIEWER_HEADER, HeaderValue::from_static(" 42 "));
        assert_eq!(viewer_from_headers(&headers).unwrap(), ViewerContext::new(42));

        headers.insert(VIEWER_HEADER, HeaderValue::from_static("-1"));
        assert!(viewer_from_headers(&headers).is_err());

        headers.insert(VIEWER_HEADER, HeaderValue::from_static("bob"));
        assert!(viewer_from_headers(&headers).is_err());
    }
}
