// targetry-core/src/lib.rs

// 1. Mandatory documentation for production code
#![allow(missing_docs)]
// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Contracts the core consumes from the outside (warning sink).
pub mod ports;

// 2. Domain
// Raw profile mapping, backend descriptors, canonical connections, registry.
// Depends on nothing but the ports.
pub mod domain;

// 3. Infrastructure (Adapters)
// profiles.yml loading and template rendering.
pub mod infrastructure;

// 4. Application (Use Cases)
// Resolve a profile target end to end.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use domain::connection::ConnectionConfig;
pub use domain::error::ConfigError;
pub use domain::registry::{resolve, resolve_with};
pub use domain::target::{ResolveContext, TargetConfig};
pub use error::TargetryError;
