//! Caller resolution middleware.
//!
//! Every request passes through [`IdentityLayer`], which resolves the bearer
//! token (if any) into a [`Caller`] and stores it in the request extensions.
//! Handlers and later layers read it back with the [`Caller`] extractor.
//!
//! Resolution never rejects a request. Endpoints that need a signed-in caller
//! enforce that themselves via [`Caller::require_principal`].

use std::convert::Infallible;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{Request, Response};
use tower::{Layer, Service};

use crate::identity::{Caller, IdentityResolver};

#[derive(Clone)]
pub struct IdentityLayer {
    resolver: IdentityResolver,
}

impl IdentityLayer {
    pub fn new(resolver: IdentityResolver) -> Self {
        Self { resolver }
    }
}

impl<S> Layer<S> for IdentityLayer {
    type Service = IdentityService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IdentityService {
            inner,
            resolver: self.resolver.clone(),
        }
    }
}

#[derive(Clone)]
pub struct IdentityService<S> {
    inner: S,
    resolver: IdentityResolver,
}

impl<S> Service<Request<Body>> for IdentityService<S>
where
    S: Service<Request<Body>, Response = Response<Body>>,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let caller = self.resolver.resolve(req.headers());
        req.extensions_mut().insert(caller);
        self.inner.call(req)
    }
}

/// Extracts the resolved caller. Requests that did not pass through
/// [`IdentityLayer`] are treated as anonymous.
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Caller>().cloned().unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::{StatusCode, header};
    use tower::ServiceExt;

    use super::*;
    use crate::identity::{Account, AdminPolicy, StaticSessionProvider};

    fn layer() -> IdentityLayer {
        let provider = StaticSessionProvider::new().with_session(
            "tok-ada",
            Account {
                id: "u1".to_string(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            },
        );
        IdentityLayer::new(IdentityResolver::new(
            Arc::new(provider),
            AdminPolicy::default(),
        ))
    }

    /// Echoes the resolved caller's display name in the body.
    async fn echo_caller(req: Request<Body>) -> Result<Response<Body>, Infallible> {
        let name = req
            .extensions()
            .get::<Caller>()
            .map(|c| c.display_name().to_string())
            .unwrap_or_else(|| "missing".to_string());
        Ok(Response::new(Body::from(name)))
    }

    async fn body_string(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_anonymous_request_gets_caller() {
        let service = layer().layer(tower::service_fn(echo_caller));
        let response = service
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "Anonymous");
    }

    #[tokio::test]
    async fn test_bearer_token_resolves_principal() {
        let service = layer().layer(tower::service_fn(echo_caller));
        let request = Request::builder()
            .uri("/")
            .header(header::AUTHORIZATION, "Bearer tok-ada")
            .body(Body::empty())
            .unwrap();

        let response = service.oneshot(request).await.unwrap();
        assert_eq!(body_string(response).await, "Ada");
    }

    #[tokio::test]
    async fn test_bad_token_is_not_rejected() {
        let service = layer().layer(tower::service_fn(echo_caller));
        let request = Request::builder()
            .uri("/")
            .header(header::AUTHORIZATION, "Bearer forged")
            .body(Body::empty())
            .unwrap();

        let response = service.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "Anonymous");
    }
}
