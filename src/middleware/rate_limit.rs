//! Blanket `apiCall` quota applied to every request.
//!
//! Runs after [`IdentityLayer`](super::IdentityLayer), so requests are keyed
//! by principal id when signed in and share the `anonymous` bucket otherwise.
//! Mutating endpoints are additionally charged their own operation quota by
//! the services; the two checks are independent.
//!
//! # Response Headers
//!
//! On rate limit exceeded (429):
//! - `Retry-After`: Seconds until the next request will be accepted
//! - `X-RateLimit-Limit`: Bucket capacity for `apiCall`
//! - `X-RateLimit-Remaining`: Always `0`
//!
//! Paths listed in `bypass_paths` (by default `/health` and `/ready`) are
//! matched exactly against `request.uri().path()` and never consume quota.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::warn;

use crate::error::AppError;
use crate::identity::Caller;
use crate::quota::{Operation, QuotaGate, derive_key};

/// Paths that never consume `apiCall` quota unless configured otherwise.
pub const DEFAULT_BYPASS_PATHS: [&str; 2] = ["/health", "/ready"];

#[derive(Clone)]
pub struct ApiQuotaLayer {
    gate: Arc<dyn QuotaGate>,
    bypass_paths: Arc<Vec<String>>,
}

impl ApiQuotaLayer {
    pub fn new(gate: Arc<dyn QuotaGate>, bypass_paths: Vec<String>) -> Self {
        Self {
            gate,
            bypass_paths: Arc::new(bypass_paths),
        }
    }
}

impl<S> Layer<S> for ApiQuotaLayer {
    type Service = ApiQuotaService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiQuotaService {
            inner,
            gate: self.gate.clone(),
            bypass_paths: self.bypass_paths.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ApiQuotaService<S> {
    inner: S,
    gate: Arc<dyn QuotaGate>,
    bypass_paths: Arc<Vec<String>>,
}

impl<S> Service<Request<Body>> for ApiQuotaService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();

        let path = req.uri().path();
        if self.bypass_paths.iter().any(|p| p == path) {
            return Box::pin(async move { inner.call(req).await });
        }

        let key = derive_key(req.extensions().get::<Caller>().and_then(|c| c.principal()));

        match self.gate.admit(Operation::ApiCall, &key) {
            Ok(()) => Box::pin(async move { inner.call(req).await }),
            Err(exceeded) => {
                warn!(
                    key = %key,
                    path = %path,
                    retry_after_secs = exceeded.retry_after_secs(),
                    "API quota exceeded"
                );
                let response = AppError::RateLimited(exceeded).into_response();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}
