//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! engine / runtime / validator / reload produce:
//!     → logging.rs (structured log events, text or JSON)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout (log shipping is external)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every `apply` runs inside a span carrying action, backend and server
//! - Metric updates are no-ops until a recorder is installed, so library
//!   users and tests pay nothing

pub mod logging;
pub mod metrics;
