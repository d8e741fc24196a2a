//! Named token-bucket policies, one per operation kind.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;

use governor::Quota;
use thiserror::Error;

/// Every operation the gate knows how to meter.
///
/// The set is closed: quota definitions, metric labels and overrides all key
/// off this enum rather than free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SendMessage,
    UploadFile,
    DeleteFile,
    ApiCall,
    LoginAttempt,
    RegisterUser,
    SendEmail,
}

impl Operation {
    /// All operations, in table order.
    pub const ALL: [Operation; 7] = [
        Operation::SendMessage,
        Operation::UploadFile,
        Operation::DeleteFile,
        Operation::ApiCall,
        Operation::LoginAttempt,
        Operation::RegisterUser,
        Operation::SendEmail,
    ];

    /// Stable external name, used in config overrides, logs and metrics.
    pub const fn name(self) -> &'static str {
        match self {
            Operation::SendMessage => "sendMessage",
            Operation::UploadFile => "uploadFile",
            Operation::DeleteFile => "deleteFile",
            Operation::ApiCall => "apiCall",
            Operation::LoginAttempt => "loginAttempt",
            Operation::RegisterUser => "registerUser",
            Operation::SendEmail => "sendEmail",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = QuotaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| QuotaError::UnknownOperation(s.to_string()))
    }
}

/// Errors raised while building or parsing quota definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuotaError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("{operation}: rate must be greater than 0")]
    ZeroRate { operation: Operation },

    #[error("{operation}: window must be greater than 0ms")]
    ZeroWindow { operation: Operation },

    #[error("{operation}: {rate} tokens per {window_ms}ms refills faster than one token per nanosecond")]
    PeriodTooShort {
        operation: Operation,
        rate: u32,
        window_ms: u64,
    },

    #[error("{operation}: capacity {capacity} is below the refill rate {rate}")]
    CapacityBelowRate {
        operation: Operation,
        rate: u32,
        capacity: u32,
    },

    #[error("malformed quota override '{0}', expected name=rate/window_ms/capacity")]
    Malformed(String),
}

/// Token-bucket policy for one operation.
///
/// `rate` tokens are replenished every `window_ms`, continuously, and the
/// bucket never holds more than `capacity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaDefinition {
    pub operation: Operation,
    pub rate: u32,
    pub window_ms: u64,
    pub capacity: u32,
}

impl QuotaDefinition {
    pub const fn new(operation: Operation, rate: u32, window_ms: u64, capacity: u32) -> Self {
        Self {
            operation,
            rate,
            window_ms,
            capacity,
        }
    }

    pub fn name(&self) -> &'static str {
        self.operation.name()
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Time to replenish one token. Zero when `rate` is zero.
    pub fn period(&self) -> Duration {
        self.window().checked_div(self.rate).unwrap_or_default()
    }

    /// Check the invariants a usable bucket needs.
    ///
    /// A capacity below the refill rate would throttle steady-state
    /// throughput below `rate`, so it is rejected outright.
    pub fn validate(&self) -> Result<(), QuotaError> {
        let operation = self.operation;
        if self.rate == 0 {
            return Err(QuotaError::ZeroRate { operation });
        }
        if self.window_ms == 0 {
            return Err(QuotaError::ZeroWindow { operation });
        }
        if self.period().is_zero() {
            return Err(QuotaError::PeriodTooShort {
                operation,
                rate: self.rate,
                window_ms: self.window_ms,
            });
        }
        if self.capacity < self.rate {
            return Err(QuotaError::CapacityBelowRate {
                operation,
                rate: self.rate,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Translate into a governor GCRA quota.
    ///
    /// One token is emitted every `window / rate`; the burst is the bucket
    /// capacity, so a fresh bucket admits exactly `capacity` calls.
    pub fn to_quota(&self) -> Result<Quota, QuotaError> {
        self.validate()?;

        let capacity = NonZeroU32::new(self.capacity).ok_or(QuotaError::CapacityBelowRate {
            operation: self.operation,
            rate: self.rate,
            capacity: self.capacity,
        })?;

        Quota::with_period(self.period())
            .map(|quota| quota.allow_burst(capacity))
            .ok_or(QuotaError::PeriodTooShort {
                operation: self.operation,
                rate: self.rate,
                window_ms: self.window_ms,
            })
    }

    /// Parse a single override of the form `name=rate/window_ms/capacity`.
    pub fn parse_override(raw: &str) -> Result<Self, QuotaError> {
        let malformed = || QuotaError::Malformed(raw.to_string());

        let (name, numbers) = raw.trim().split_once('=').ok_or_else(malformed)?;
        let operation: Operation = name.trim().parse()?;

        let mut parts = numbers.split('/').map(str::trim);
        let rate = parts.next().and_then(|p| p.parse().ok()).ok_or_else(malformed)?;
        let window_ms = parts.next().and_then(|p| p.parse().ok()).ok_or_else(malformed)?;
        let capacity = parts.next().and_then(|p| p.parse().ok()).ok_or_else(malformed)?;
        if parts.next().is_some() {
            return Err(malformed());
        }

        let definition = Self::new(operation, rate, window_ms, capacity);
        definition.validate()?;
        Ok(definition)
    }
}

/// The standard policy table.
pub const STANDARD_QUOTAS: [QuotaDefinition; 7] = [
    QuotaDefinition::new(Operation::SendMessage, 10, 60_000, 15),
    QuotaDefinition::new(Operation::UploadFile, 5, 60_000, 10),
    QuotaDefinition::new(Operation::DeleteFile, 20, 60_000, 25),
    QuotaDefinition::new(Operation::ApiCall, 60, 60_000, 80),
    QuotaDefinition::new(Operation::LoginAttempt, 5, 60_000, 5),
    QuotaDefinition::new(Operation::RegisterUser, 3, 3_600_000, 3),
    QuotaDefinition::new(Operation::SendEmail, 10, 3_600_000, 10),
];

/// One definition per operation, fixed once the gate is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaTable {
    definitions: Vec<QuotaDefinition>,
}

impl QuotaTable {
    /// The standard table with no overrides.
    pub fn standard() -> Self {
        Self {
            definitions: STANDARD_QUOTAS.to_vec(),
        }
    }

    /// Replace the definition for `override_def.operation`.
    pub fn with_override(mut self, override_def: QuotaDefinition) -> Result<Self, QuotaError> {
        override_def.validate()?;
        match self
            .definitions
            .iter_mut()
            .find(|d| d.operation == override_def.operation)
        {
            Some(existing) => *existing = override_def,
            None => self.definitions.push(override_def),
        }
        Ok(self)
    }

    /// Apply a list of overrides in order; later entries win.
    pub fn with_overrides(self, overrides: &[QuotaDefinition]) -> Result<Self, QuotaError> {
        overrides
            .iter()
            .try_fold(self, |table, def| table.with_override(*def))
    }

    pub fn get(&self, operation: Operation) -> Option<&QuotaDefinition> {
        self.definitions.iter().find(|d| d.operation == operation)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuotaDefinition> {
        self.definitions.iter()
    }
}

impl Default for QuotaTable {
    fn default() -> Self {
        Self::standard()
    }
}
