use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Display name recorded for anything written by an unauthenticated caller.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Role tag assigned by the admin policy at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

/// Authenticated identity of the caller, valid for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// Opaque identifier issued by the identity provider
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The resolved caller of a request: a principal, or explicitly nobody.
///
/// Inserted into request extensions by the identity middleware and handed to
/// services, so every layer sees the same resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller(Option<Principal>);

impl Caller {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self(Some(principal))
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.0.as_ref().is_some_and(Principal::is_admin)
    }

    /// Principal name, or `"Anonymous"`.
    pub fn display_name(&self) -> &str {
        self.0
            .as_ref()
            .map_or(ANONYMOUS_NAME, |principal| principal.name.as_str())
    }

    /// The principal, or `Unauthorized` for operations that need one.
    pub fn require_principal(&self) -> AppResult<&Principal> {
        self.0
            .as_ref()
            .ok_or_else(|| AppError::Unauthorized("Sign in to perform this action".to_string()))
    }

    /// The principal if it holds the admin role.
    pub fn require_admin(&self) -> AppResult<&Principal> {
        let principal = self.require_principal()?;
        if principal.is_admin() {
            Ok(principal)
        } else {
            Err(AppError::Forbidden("Admin role required".to_string()))
        }
    }

    pub fn into_principal(self) -> Option<Principal> {
        self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn member() -> Principal {
        Principal {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role: Role::Member,
        }
    }

    #[test]
    fn test_anonymous_caller() {
        let caller = Caller::anonymous();
        assert!(!caller.is_authenticated());
        assert!(!caller.is_admin());
        assert_eq!(caller.display_name(), "Anonymous");
        assert!(matches!(
            caller.require_principal(),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_member_is_not_admin() {
        let caller = Caller::authenticated(member());
        assert_eq!(caller.display_name(), "Ada");
        assert!(caller.require_principal().is_ok());
        assert!(matches!(caller.require_admin(), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_admin_passes_admin_check() {
        let caller = Caller::authenticated(Principal {
            role: Role::Admin,
            ..member()
        });
        assert!(caller.is_admin());
        assert_eq!(caller.require_admin().unwrap().id, "u1");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&member()).unwrap();
        assert!(json.contains("\"role\":\"member\""));
    }
}
