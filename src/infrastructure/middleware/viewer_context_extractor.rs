// Vc extractor - hands handlers the viewer resolved by the middleware

use axum::{extract::FromRequestParts, http::request::Parts};

use super::viewer_context_middleware::viewer_from_headers;
use crate::error::{AppError, AppResult};
use crate::infrastructure::viewer::ViewerContext;

/// Request-scoped viewer. Derefs to `ViewerContext`.
#[derive(Debug, Clone, Copy)]
pub struct Vc(pub ViewerContext);

impl Vc {
    /// Viewer id for operations that act on the viewer's behalf.
    pub fn require(&self) -> AppResult<i64> {
        self.0
            .viewer_id
            .ok_or_else(|| AppError::Unauthorized(format!("{} header is required", super::VIEWER_HEADER)))
    }
}

impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Falls back to the header when the middleware did not run
impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let viewer = match parts.extensions.get::<ViewerContext>() {
            Some(viewer) => Ok(Vc(*viewer)),
            None => viewer_from_headers(&parts.headers).map(Vc),
        };
        async move { viewer }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_viewer() {
        assert_eq!(Vc(ViewerContext::new(7)).require().unwrap(), 7);
        assert!(matches!(
            Vc(ViewerContext::anonymous()).require(),
            Err(AppError::Unauthorized(_))
        ));
    }
}
