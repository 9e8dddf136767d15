//! Seam between the anchor pipeline and the native localization backend
//!
//! The native engine is an external collaborator; this module defines the
//! trait it must satisfy and an in-memory mock for tests.

pub mod interface;
pub mod mock;
pub mod error;

pub use interface::{AnchorBackend, BackendConfig};
pub use mock::MockBackend;
pub use error::{BackendError, BackendResult};
