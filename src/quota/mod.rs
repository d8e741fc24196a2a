//! Operation quotas: policy table, partition keys and the admission gate.
//!
//! ```text
//! Caller ──derive_key──► PartitionKey ──┐
//!                                       ├──► QuotaGate::admit ──► Ok | QuotaExceeded
//! Operation ────────────────────────────┘
//! ```

mod definition;
mod gate;
mod key;

pub use definition::{Operation, QuotaDefinition, QuotaError, QuotaTable, STANDARD_QUOTAS};
pub use gate::{GovernorQuotaGate, QuotaExceeded, QuotaGate};
pub use key::{ANONYMOUS_KEY, PartitionKey, derive_key};
