//! Configuration loading and resolution

pub mod config;

pub use config::{AnchorManagerConfig, ConfigError, ConfigurationManager, ResolvedConfig, ValidationResult};
