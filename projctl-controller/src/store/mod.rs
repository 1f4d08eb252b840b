//! Resource store abstraction.
//!
//! The reconciler only talks to [`ResourceStore`]; [`MemoryStore`] is the
//! in-process implementation used by the binary and the tests.

pub mod error;
pub mod event;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use event::StoreEvent;
pub use memory::MemoryStore;
pub use traits::{ResourceStore, VersionToken, Versioned};
