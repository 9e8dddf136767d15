//! Tuning constants and defaults for the anchor pipeline

/// Default number of samples kept in the temporal fusion window
pub const DEFAULT_FUSION_WINDOW: usize = 5;

/// Largest fusion window a configuration may request
pub const MAX_FUSION_WINDOW: usize = 64;

/// Default time to blend from the rendered pose to a new target (seconds)
pub const DEFAULT_INTERPOLATION_DURATION_S: f64 = 1.0;

/// Orientations closer than this are not slerped; the target is used as is
pub const SLERP_EPSILON: f64 = 1.0e-9;
