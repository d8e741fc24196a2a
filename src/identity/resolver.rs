use std::sync::Arc;

use axum::http::{HeaderMap, header};
use tracing::{debug, warn};

use super::policy::AdminPolicy;
use super::principal::{Caller, Principal, Role};
use super::provider::SessionProvider;
use crate::metrics;

/// Turns request credentials into a [`Caller`].
///
/// Resolution never fails: a missing, malformed or unknown token and any
/// provider error all fall back to an anonymous caller, so endpoints with
/// optional auth stay usable for anonymous traffic.
#[derive(Clone)]
pub struct IdentityResolver {
    provider: Arc<dyn SessionProvider>,
    policy: AdminPolicy,
}

impl IdentityResolver {
    pub fn new(provider: Arc<dyn SessionProvider>, policy: AdminPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &AdminPolicy {
        &self.policy
    }

    pub fn resolve(&self, headers: &HeaderMap) -> Caller {
        let Some(token) = bearer_token(headers) else {
            metrics::record_identity_resolution("anonymous");
            return Caller::anonymous();
        };

        match self.provider.lookup(token) {
            Ok(Some(account)) => {
                let role = if self.policy.is_admin(&account.email) {
                    Role::Admin
                } else {
                    Role::Member
                };
                debug!(principal_id = %account.id, ?role, "Caller authenticated");
                metrics::record_identity_resolution("authenticated");
                Caller::authenticated(Principal {
                    id: account.id,
                    name: account.name,
                    email: account.email,
                    role,
                })
            }
            Ok(None) => {
                debug!("Unknown session token, treating caller as anonymous");
                metrics::record_identity_resolution("unknown_token");
                Caller::anonymous()
            }
            Err(e) => {
                warn!(error = %e, "Identity lookup failed, treating caller as anonymous");
                metrics::record_identity_resolution("provider_error");
                Caller::anonymous()
            }
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively; empty tokens are ignored.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;
    use crate::identity::provider::{Account, IdentityError, StaticSessionProvider};

    struct FailingProvider;

    impl SessionProvider for FailingProvider {
        fn lookup(&self, _token: &str) -> Result<Option<Account>, IdentityError> {
            Err(IdentityError::Unavailable("connection refused".to_string()))
        }
    }

    fn resolver(admins: &[&str]) -> IdentityResolver {
        let provider = StaticSessionProvider::new()
            .with_session(
                "tok-ada",
                Account {
                    id: "u1".to_string(),
                    name: "Ada".to_string(),
                    email: "ada@example.com".to_string(),
                },
            )
            .with_session(
                "tok-root",
                Account {
                    id: "u0".to_string(),
                    name: "Root".to_string(),
                    email: "root@example.com".to_string(),
                },
            );
        IdentityResolver::new(Arc::new(provider), AdminPolicy::new(admins.iter().copied()))
    }

    fn headers(auth: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        headers
    }

    #[test]
    fn test_no_header_is_anonymous() {
        let caller = resolver(&[]).resolve(&HeaderMap::new());
        assert_eq!(caller, Caller::anonymous());
    }

    #[test]
    fn test_valid_token_resolves_member() {
        let caller = resolver(&["root@example.com"]).resolve(&headers("Bearer tok-ada"));
        let principal = caller.principal().unwrap();
        assert_eq!(principal.id, "u1");
        assert_eq!(principal.role, Role::Member);
    }

    #[test]
    fn test_admin_policy_assigns_role() {
        let caller = resolver(&["ROOT@example.com"]).resolve(&headers("bearer tok-root"));
        assert!(caller.is_admin());
    }

    #[test]
    fn test_policy_change_applies_to_next_resolution() {
        let resolver = resolver(&[]);
        assert!(!resolver.resolve(&headers("Bearer tok-ada")).is_admin());

        resolver.policy().grant("ada@example.com");
        assert!(resolver.resolve(&headers("Bearer tok-ada")).is_admin());
    }

    #[test]
    fn test_unknown_token_is_anonymous() {
        let caller = resolver(&[]).resolve(&headers("Bearer nope"));
        assert!(!caller.is_authenticated());
    }

    #[test]
    fn test_provider_error_fails_closed_to_anonymous() {
        let resolver = IdentityResolver::new(Arc::new(FailingProvider), AdminPolicy::default());
        let caller = resolver.resolve(&headers("Bearer tok-ada"));
        assert!(!caller.is_authenticated());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("BEARER   abc ")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("abc")), None);
    }
}
