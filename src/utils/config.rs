use crate::backend::BackendConfig;
use crate::core::{DEFAULT_FUSION_WINDOW, DEFAULT_INTERPOLATION_DURATION_S, MAX_FUSION_WINDOW};
use crate::tracking::ReconcilerSettings;
use crate::validation::AnchorError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Session-wide anchor manager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorManagerConfig {
    /// Keep localizing after the first success instead of a single shot
    pub continuous_localization_enabled: bool,
    /// Average recent tracking samples before rendering
    pub temporal_fusion_enabled: bool,
    /// Blend rendered poses toward new targets over time
    pub interpolation_enabled: bool,
    /// Number of samples in the fusion window
    pub fusion_window_size: usize,
    /// Blend duration (seconds)
    pub interpolation_duration_s: f64,
    /// Cap on backend localization requests; 0 leaves the backend default
    pub max_localization_requests_per_second: f32,
}

impl Default for AnchorManagerConfig {
    fn default() -> Self {
        Self {
            continuous_localization_enabled: true,
            temporal_fusion_enabled: false,
            interpolation_enabled: false,
            fusion_window_size: DEFAULT_FUSION_WINDOW,
            interpolation_duration_s: DEFAULT_INTERPOLATION_DURATION_S,
            max_localization_requests_per_second: 0.0,
        }
    }
}

/// Configuration errors that cannot be recovered by falling back
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid {parameter} = {value}: {reason}")]
    InvalidParameter { parameter: String, value: String, reason: String },
    #[error("config I/O error: {message}")]
    Io { message: String },
    #[error("config serialization error: {message}")]
    Serialization { message: String },
}

/// Outcome of validating a configuration
#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Hard errors; the configuration is rejected
    pub errors: Vec<ConfigError>,
    /// Conflicts that resolve to a disabled feature
    pub warnings: Vec<AnchorError>,
}

/// Configuration after conflicts have been turned into fallbacks
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub settings: ReconcilerSettings,
    pub backend: BackendConfig,
    pub conflicts: Vec<AnchorError>,
}

/// Loads, validates and resolves the anchor manager configuration
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    config: AnchorManagerConfig,
    /// Path the configuration was last loaded from or saved to
    config_file_path: Option<String>,
    is_modified: bool,
}

impl ConfigurationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnchorManagerConfig) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.update_config(config)?;
        Ok(manager)
    }

    /// Create configuration manager and load from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn config(&self) -> &AnchorManagerConfig {
        &self.config
    }

    /// Replace the configuration; hard errors reject it
    pub fn update_config(&mut self, config: AnchorManagerConfig) -> Result<(), ConfigError> {
        let validation = Self::validate(&config);
        if let Some(error) = validation.errors.into_iter().next() {
            return Err(error);
        }
        self.config = config;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            message: format!("failed to read config file '{}': {}", path_str, e),
        })?;

        let config: AnchorManagerConfig = serde_json::from_str(&content).map_err(|e| ConfigError::Serialization {
            message: format!("failed to parse config file '{}': {}", path_str, e),
        })?;

        self.update_config(config)?;
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(&self.config).map_err(|e| ConfigError::Serialization {
            message: format!("failed to serialize config: {}", e),
        })?;

        fs::write(&path, content).map_err(|e| ConfigError::Io {
            message: format!("failed to write config file '{}': {}", path_str, e),
        })?;

        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save to the path the configuration came from
    pub fn save(&mut self) -> Result<(), ConfigError> {
        match self.config_file_path.clone() {
            Some(path) => self.save_to_file(path),
            None => Err(ConfigError::Io {
                message: "no file path set for saving configuration".to_string(),
            }),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    pub fn config_file_path(&self) -> Option<&str> {
        self.config_file_path.as_deref()
    }

    /// Check a configuration for hard errors and feature conflicts
    pub fn validate(config: &AnchorManagerConfig) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let rate = config.max_localization_requests_per_second;
        if !rate.is_finite() || rate < 0.0 {
            errors.push(ConfigError::InvalidParameter {
                parameter: "max_localization_requests_per_second".to_string(),
                value: rate.to_string(),
                reason: "must be a finite, non-negative rate".to_string(),
            });
        }

        if config.fusion_window_size > MAX_FUSION_WINDOW {
            errors.push(ConfigError::InvalidParameter {
                parameter: "fusion_window_size".to_string(),
                value: config.fusion_window_size.to_string(),
                reason: format!("must not exceed {}", MAX_FUSION_WINDOW),
            });
        }

        if config.temporal_fusion_enabled {
            if config.fusion_window_size == 0 {
                warnings.push(AnchorError::ConfigurationConflict {
                    setting: "temporal_fusion_enabled".to_string(),
                    reason: "fusion window size is zero".to_string(),
                });
            } else if !config.continuous_localization_enabled {
                warnings.push(AnchorError::ConfigurationConflict {
                    setting: "temporal_fusion_enabled".to_string(),
                    reason: "single-shot localization yields one sample to fuse".to_string(),
                });
            }
        }

        if config.interpolation_enabled {
            let duration = config.interpolation_duration_s;
            if !duration.is_finite() || duration <= 0.0 {
                warnings.push(AnchorError::ConfigurationConflict {
                    setting: "interpolation_enabled".to_string(),
                    reason: format!("interpolation duration {} is not positive", duration),
                });
            }
        }

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Effective settings with every conflicting feature switched off
    pub fn resolve(&self) -> ResolvedConfig {
        let config = &self.config;
        let conflicts = Self::validate(config).warnings;

        let mut settings = ReconcilerSettings {
            temporal_fusion_enabled: config.temporal_fusion_enabled,
            interpolation_enabled: config.interpolation_enabled,
            fusion_window_size: config.fusion_window_size.max(1),
            interpolation_duration_s: config.interpolation_duration_s,
        };

        for conflict in &conflicts {
            warn!(%conflict, "falling back to pass-through");
            if let AnchorError::ConfigurationConflict { setting, .. } = conflict {
                match setting.as_str() {
                    "temporal_fusion_enabled" => settings.temporal_fusion_enabled = false,
                    "interpolation_enabled" => {
                        settings.interpolation_enabled = false;
                        settings.interpolation_duration_s = DEFAULT_INTERPOLATION_DURATION_S;
                    }
                    _ => {}
                }
            }
        }

        ResolvedConfig {
            settings,
            backend: BackendConfig {
                continuous_localization_enabled: config.continuous_localization_enabled,
                max_localization_requests_per_second: config.max_localization_requests_per_second,
            },
            conflicts,
        }
    }
}
