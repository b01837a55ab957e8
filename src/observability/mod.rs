//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! status reports, passes, control operations
//!     → logging.rs (tracing events with host/table/service fields)
//!     → metrics.rs (per-host, per-table and per-service gauges)
//!
//! Consumers:
//!     → stdout, pretty for operators or JSON for collectors
//!     → Prometheus scrape endpoint when enabled
//! ```
//!
//! # Design Decisions
//! - Names are metric labels; numeric ids only appear in log fields
//! - Nothing is recorded until the exporter is installed

pub mod logging;
pub mod metrics;
