//! Shared application state for Axum handlers.
//!
//! This module provides thread-safe, clonable state that is shared across
//! all request handlers. It includes:
//!
//! - **Services**: Message and file pipelines over the record store
//! - **Identity**: Resolver and the live admin policy
//! - **Quota gate**: Shared by the services and the `apiCall` layer
//! - **Configuration**: Runtime configuration access
//!
//! # Structured Concurrency
//!
//! Background tasks are managed using `tokio_util::task::TaskTracker` and
//! `CancellationToken`. Call `shutdown()` to stop them before exit.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::identity::{AdminPolicy, IdentityResolver, SessionProvider, StaticSessionProvider};
use crate::quota::{GovernorQuotaGate, QuotaGate};
use crate::services::{FileService, MessageService};
use crate::store::Repository;

/// Shared application state for Axum handlers.
///
/// This struct is cloned for each request handler. All internal data
/// is wrapped in `Arc` for efficient sharing.
///
/// # Lifecycle
///
/// A quota housekeeping task is spawned when the state is created, so
/// construction must happen inside a tokio runtime. Call `shutdown()` before
/// dropping to ensure clean task termination:
///
/// ```rust,ignore
/// let state = AppState::from_config(config)?;
/// // ... use state ...
/// state.shutdown().await;  // Wait for background tasks to complete
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Resolves bearer tokens into callers
    pub identity: IdentityResolver,
    /// Quota gate shared by every pipeline
    pub gate: Arc<dyn QuotaGate>,
    pub messages: MessageService,
    pub files: FileService,
    /// Timestamp when the application started
    pub started_at: Instant,
    /// Tracks spawned background tasks for graceful shutdown
    task_tracker: TaskTracker,
    /// Cancellation token for signaling background tasks to stop
    cancellation_token: CancellationToken,
}

impl AppState {
    /// Assemble state from explicit collaborators.
    ///
    /// The admin policy is seeded from `config.admin_emails`.
    pub fn new(
        config: Config,
        provider: Arc<dyn SessionProvider>,
        gate: Arc<dyn QuotaGate>,
    ) -> Self {
        let policy = AdminPolicy::new(config.admin_emails.iter());
        let identity = IdentityResolver::new(provider, policy);
        let messages = MessageService::new(Repository::new(), gate.clone());
        let files = FileService::new(
            Repository::new(),
            gate.clone(),
            config.max_upload_bytes,
            config.max_stored_bytes,
        );

        let state = Self {
            config: Arc::new(config),
            identity,
            gate,
            messages,
            files,
            started_at: Instant::now(),
            task_tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        };

        state.spawn_quota_housekeeping_task();

        state
    }

    /// Build state from configuration: the session provider from
    /// `SESSIONS_FILE` and a governor gate from the effective quota table.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if the sessions file cannot be loaded or
    /// the quota table is invalid.
    pub fn from_config(config: Config) -> AppResult<Self> {
        let provider: Arc<dyn SessionProvider> = match &config.sessions_file {
            Some(path) => Arc::new(
                StaticSessionProvider::from_file(path)
                    .map_err(|e| AppError::ConfigError(e.to_string()))?,
            ),
            None => {
                info!("SESSIONS_FILE not set, every caller will be anonymous");
                Arc::new(StaticSessionProvider::new())
            }
        };

        let gate = Arc::new(GovernorQuotaGate::new(&config.quota_table()?)?);

        Ok(Self::new(config, provider, gate))
    }

    pub fn admin_policy(&self) -> &AdminPolicy {
        self.identity.policy()
    }

    /// Periodically evict idle quota buckets so memory tracks active callers
    /// rather than every key ever seen.
    fn spawn_quota_housekeeping_task(&self) {
        let gate = self.gate.clone();
        let period = self.config.quota_housekeeping_interval;
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await; // Skip the first immediate tick

            loop {
                tokio::select! {
                    biased; // Check cancellation first

                    _ = cancel.cancelled() => {
                        debug!("Quota housekeeping task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        gate.retain_recent();
                        trace!("Quota housekeeping pass complete");
                    }
                }
            }

            debug!("Quota housekeeping task shutting down");
        });
    }

    /// Signal background tasks to stop without waiting. `/ready` reports 503
    /// from this point on.
    pub fn begin_shutdown(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Gracefully shutdown all background tasks.
    ///
    /// This method:
    /// 1. Signals all tasks to stop via cancellation token
    /// 2. Closes the task tracker (prevents new tasks)
    /// 3. Waits for all tasks to complete
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");

        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("All background tasks have completed");
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_default_config() {
        let config = Config {
            admin_emails: vec!["root@example.com".to_string()],
            ..Config::default()
        };
        let state = AppState::from_config(config).unwrap();

        assert!(state.admin_policy().is_admin("root@example.com"));
        assert!(!state.is_shutting_down());
        state.shutdown().await;
        assert!(state.is_shutting_down());
    }

    #[tokio::test]
    async fn test_missing_sessions_file_is_config_error() {
        let config = Config {
            sessions_file: Some("/nonexistent/sessions.json".into()),
            ..Config::default()
        };

        let err = AppState::from_config(config).err().unwrap();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_begin_shutdown_flags_state() {
        let state = AppState::from_config(Config::default()).unwrap();
        state.begin_shutdown();
        assert!(state.is_shutting_down());
        state.shutdown().await;
    }
}
