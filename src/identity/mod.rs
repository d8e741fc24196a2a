//! Caller identity: session lookup, admin policy and per-request resolution.

mod policy;
mod principal;
mod provider;
mod resolver;

pub use policy::AdminPolicy;
pub use principal::{ANONYMOUS_NAME, Caller, Principal, Role};
pub use provider::{Account, IdentityError, SessionProvider, StaticSessionProvider};
pub use resolver::{IdentityResolver, bearer_token};
