//! # Board Gate
//!
//! A small message board and file drop whose writes all pass through one
//! rate-limited, authenticated mutation pipeline:
//!
//! - **Identity**: bearer session tokens resolved per request, anonymous fallback
//! - **Quotas**: per-operation token buckets keyed by principal id or `anonymous`
//! - **Validation**: content checks run only after quota admission
//! - **Observability**: request ids, structured logging, Prometheus metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Request ID → Trace → CORS → Identity → quota)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, messages, files, admin)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Services (MessageService, FileService)                     │
//! │    derive key → QuotaGate::admit → validate → commit        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Repository<Message>, Repository<StoredFile>                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use board_gate::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let state = AppState::from_config(config)?;
//!     let app = build_router(state);
//!
//!     // Start the server...
//!     Ok(())
//! }
//! ```
//!
//! ## Quota Configuration
//!
//! Tighten message posting to ten per minute with no extra burst:
//! ```bash
//! QUOTA_OVERRIDES="sendMessage=10/60000/10" cargo run
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod quota;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use identity::{AdminPolicy, Caller, Principal, SessionProvider, StaticSessionProvider};
pub use quota::{GovernorQuotaGate, Operation, QuotaGate, QuotaTable};
pub use routes::build_router;
pub use state::AppState;
