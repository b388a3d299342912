//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + command-line overrides
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → address.rs (listen URL → host/port)
//!     → ProxyConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod address;
pub mod loader;
pub mod schema;
pub mod validation;

pub use address::{AddressError, ListenAddress, Scheme};
pub use loader::{load_config, ConfigError};
pub use schema::{
    BackendConfig, ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, TlsConfig,
};
pub use validation::{validate_config, ValidationError};
