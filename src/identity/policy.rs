//! Admin authorization policy.
//!
//! The set of admin emails is injected at startup (from `ADMIN_EMAILS`) and can
//! be swapped or edited at runtime. Readers never block: each resolution loads
//! the current snapshot through `arc-swap`.

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

/// Reloadable set of admin identities, keyed by normalized email.
#[derive(Clone, Default)]
pub struct AdminPolicy {
    admins: Arc<ArcSwap<HashSet<String>>>,
}

impl AdminPolicy {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            admins: Arc::new(ArcSwap::from_pointee(normalize_all(emails))),
        }
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admins.load().contains(&normalize(email))
    }

    /// Add an admin. Returns `false` if the email already had the role.
    pub fn grant(&self, email: &str) -> bool {
        let email = normalize(email);
        let mut added = false;
        self.admins.rcu(|current| {
            let mut next = HashSet::clone(current);
            added = next.insert(email.clone());
            next
        });
        if added {
            info!(email = %email, "Admin role granted");
        }
        added
    }

    /// Remove an admin. Returns `false` if the email did not have the role.
    pub fn revoke(&self, email: &str) -> bool {
        let email = normalize(email);
        let mut removed = false;
        self.admins.rcu(|current| {
            let mut next = HashSet::clone(current);
            removed = next.remove(&email);
            next
        });
        if removed {
            info!(email = %email, "Admin role revoked");
        }
        removed
    }

    /// Swap in a whole new admin set (e.g. after a config reload).
    pub fn replace<I, S>(&self, emails: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let next = normalize_all(emails);
        info!(count = next.len(), "Admin policy replaced");
        self.admins.store(Arc::new(next));
    }

    /// Current admins, sorted.
    pub fn admins(&self) -> Vec<String> {
        let mut admins: Vec<String> = self.admins.load().iter().cloned().collect();
        admins.sort();
        admins
    }
}

impl std::fmt::Debug for AdminPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminPolicy")
            .field("admins", &self.admins.load().len())
            .finish()
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn normalize_all<I, S>(emails: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    emails
        .into_iter()
        .map(|e| normalize(e.as_ref()))
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_is_case_insensitive() {
        let policy = AdminPolicy::new(["Root@Example.com"]);
        assert!(policy.is_admin("root@example.com"));
        assert!(policy.is_admin("  ROOT@example.COM "));
        assert!(!policy.is_admin("someone@example.com"));
    }

    #[test]
    fn test_grant_and_revoke() {
        let policy = AdminPolicy::default();
        assert!(policy.grant("a@example.com"));
        assert!(!policy.grant("A@example.com"));
        assert!(policy.is_admin("a@example.com"));

        assert!(policy.revoke("a@example.com"));
        assert!(!policy.revoke("a@example.com"));
        assert!(!policy.is_admin("a@example.com"));
    }

    #[test]
    fn test_clones_share_state() {
        let policy = AdminPolicy::default();
        let view = policy.clone();
        policy.grant("x@example.com");
        assert!(view.is_admin("x@example.com"));
    }

    #[test]
    fn test_replace_and_list() {
        let policy = AdminPolicy::new(["b@example.com"]);
        policy.replace(["z@example.com", "", "a@example.com"]);
        assert_eq!(policy.admins(), vec!["a@example.com", "z@example.com"]);
    }
}
