// targetry-core/src/domain/mod.rs

pub mod backend;
pub mod connection;
pub mod error;
pub mod incremental;
pub mod metadata;
pub mod raw;
pub mod registry;
pub mod target;

pub use backend::{Backend, Capabilities, CapabilityHandle, QuotePolicy};
pub use incremental::IncrementalKind;
pub use metadata::TargetMetadata;
pub use raw::RawTarget;
