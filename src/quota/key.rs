//! Rate-limit partition keys.

use std::fmt;

use crate::identity::Principal;

/// Partition key shared by every unauthenticated caller.
///
/// All anonymous traffic shares one bucket per operation. The
/// literal is part of the observable quota behavior and must not change.
pub const ANONYMOUS_KEY: &str = "anonymous";

/// Scopes a token bucket to one caller (or to the anonymous caller class).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey(String);

impl PartitionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == ANONYMOUS_KEY
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map a resolved principal, or its absence, to a partition key.
pub fn derive_key(principal: Option<&Principal>) -> PartitionKey {
    match principal {
        Some(principal) => PartitionKey(principal.id.clone()),
        None => PartitionKey(ANONYMOUS_KEY.to_string()),
    }
}
