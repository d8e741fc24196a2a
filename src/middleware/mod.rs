//! HTTP middleware for caller resolution and quota enforcement.
//!
//! # Architecture
//!
//! ```text
//! Request → Request ID → Trace → CORS → Identity → API quota → Handler
//!                                          ↓            ↓
//!                                   Caller extension  429 Too Many Requests
//! ```
//!
//! Request ids, tracing and CORS come from `tower-http`; the layers here are
//! the ones specific to the mutation pipeline. CORS sits outside the quota
//! layer, so preflights never reach it and its 429s carry CORS headers.

pub mod identity;
pub mod rate_limit;

pub use identity::{IdentityLayer, IdentityService};
pub use rate_limit::{ApiQuotaLayer, ApiQuotaService, DEFAULT_BYPASS_PATHS};
