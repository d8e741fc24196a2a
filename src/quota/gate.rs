//! Admission gate backed by governor's keyed GCRA limiters.
//!
//! # Algorithm
//!
//! Governor implements the Generic Cell Rate Algorithm, which behaves exactly
//! like a token bucket metered continuously:
//!
//! - a fresh bucket admits `capacity` calls back to back
//! - one token is replenished every `window / rate`
//! - the bucket never holds more than `capacity` tokens
//!
//! Each operation owns one keyed limiter, so every `(operation, key)` pair
//! gets an independent bucket.
//!
//! # Clocks
//!
//! The gate is generic over governor's [`Clock`]. Production uses the default
//! monotonic clock; tests drive time with [`FakeRelativeClock`].
//!
//! [`FakeRelativeClock`]: governor::clock::FakeRelativeClock

use std::collections::HashMap;
use std::time::Duration;

use governor::RateLimiter;
use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use thiserror::Error;
use tracing::{debug, trace};

use super::definition::{Operation, QuotaDefinition, QuotaError, QuotaTable};
use super::key::PartitionKey;
use crate::metrics;

type KeyedLimiter<C> = RateLimiter<
    String,
    DefaultKeyedStateStore<String>,
    C,
    NoOpMiddleware<<C as Clock>::Instant>,
>;

/// Rejection from the gate: the bucket for this caller is empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Rate limit exceeded for {operation}. Please retry later.")]
pub struct QuotaExceeded {
    pub operation: Operation,
    /// Bucket capacity, reported as `X-RateLimit-Limit`.
    pub capacity: u32,
    /// Time until the next token becomes available.
    pub retry_after: Duration,
}

impl QuotaExceeded {
    /// Whole seconds to wait, rounded up and never zero (`Retry-After`).
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        let rounded = if self.retry_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        };
        rounded.max(1)
    }
}

/// The quota component consulted before any metered operation.
///
/// Implementations own their counters and their concurrency control; callers
/// only ever ask for admission.
pub trait QuotaGate: Send + Sync {
    /// Consume one token from the `(operation, key)` bucket.
    fn admit(&self, operation: Operation, key: &PartitionKey) -> Result<(), QuotaExceeded>;

    /// The policy in force for `operation`, if the gate meters it.
    fn definition(&self, operation: Operation) -> Option<QuotaDefinition>;

    /// Drop idle buckets that have fully refilled. Called periodically.
    fn retain_recent(&self) {}

    /// Number of live buckets for `operation`.
    fn tracked_keys(&self, _operation: Operation) -> usize {
        0
    }
}

struct Bucket<C: Clock> {
    definition: QuotaDefinition,
    limiter: KeyedLimiter<C>,
}

/// [`QuotaGate`] implementation holding one governor limiter per operation.
pub struct GovernorQuotaGate<C: Clock = DefaultClock> {
    buckets: HashMap<Operation, Bucket<C>>,
    clock: C,
}

impl GovernorQuotaGate<DefaultClock> {
    /// Build a gate on the default monotonic clock.
    ///
    /// # Errors
    ///
    /// Returns `QuotaError` if any definition violates its invariants.
    pub fn new(table: &QuotaTable) -> Result<Self, QuotaError> {
        Self::with_clock(table, DefaultClock::default())
    }
}

impl<C> GovernorQuotaGate<C>
where
    C: Clock + Clone,
{
    /// Build a gate that reads time from `clock`.
    pub fn with_clock(table: &QuotaTable, clock: C) -> Result<Self, QuotaError> {
        let mut buckets = HashMap::new();

        for definition in table.iter() {
            let quota = definition.to_quota()?;
            debug!(
                operation = %definition.operation,
                rate = definition.rate,
                window_ms = definition.window_ms,
                capacity = definition.capacity,
                "Quota configured"
            );
            buckets.insert(
                definition.operation,
                Bucket {
                    definition: *definition,
                    limiter: RateLimiter::dashmap_with_clock(quota, clock.clone()),
                },
            );
        }

        Ok(Self { buckets, clock })
    }
}

impl<C> QuotaGate for GovernorQuotaGate<C>
where
    C: Clock + Clone + Send + Sync,
    C::Instant: Send + Sync,
{
    fn admit(&self, operation: Operation, key: &PartitionKey) -> Result<(), QuotaExceeded> {
        let Some(bucket) = self.buckets.get(&operation) else {
            trace!(%operation, "Operation is not metered");
            return Ok(());
        };

        match bucket.limiter.check_key(&key.as_str().to_string()) {
            Ok(()) => {
                trace!(%operation, key = %key, "Quota admitted");
                metrics::record_quota_decision(operation, true);
                Ok(())
            }
            Err(not_until) => {
                let retry_after = not_until.wait_time_from(self.clock.now());
                debug!(
                    %operation,
                    key = %key,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Quota exhausted"
                );
                metrics::record_quota_decision(operation, false);
                Err(QuotaExceeded {
                    operation,
                    capacity: bucket.definition.capacity,
                    retry_after,
                })
            }
        }
    }

    fn definition(&self, operation: Operation) -> Option<QuotaDefinition> {
        self.buckets.get(&operation).map(|bucket| bucket.definition)
    }

    fn retain_recent(&self) {
        for (operation, bucket) in &self.buckets {
            let before = bucket.limiter.len();
            bucket.limiter.retain_recent();
            bucket.limiter.shrink_to_fit();
            trace!(
                %operation,
                before,
                after = bucket.limiter.len(),
                "Evicted idle quota buckets"
            );
        }
    }

    fn tracked_keys(&self, operation: Operation) -> usize {
        self.buckets
            .get(&operation)
            .map(|bucket| bucket.limiter.len())
            .unwrap_or(0)
    }
}
