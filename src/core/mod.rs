//! Core types and constants for the anchor tracking pipeline

pub mod types;
pub mod constants;
pub mod payload;

pub use types::*;
pub use constants::*;
pub use payload::AnchorPayload;
