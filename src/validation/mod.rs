//! Record validation and the error taxonomy

pub mod data;
pub mod error;

pub use data::{validate_batch, validate_observation, BatchValidation};
pub use error::AnchorError;
