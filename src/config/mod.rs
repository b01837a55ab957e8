//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → HoststateConfig (validated, immutable)
//!     → model::Registry built from it once at startup
//! ```
//!
//! # Design Decisions
//! - Config is read once; there is no runtime reload inside this process
//! - All daemon-level fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::FilterConfig;
pub use schema::HoststateConfig;
pub use schema::IpcConfig;
pub use schema::ObservabilityConfig;
pub use schema::{HostConfig, ServiceConfig, TableConfig};
