// targetry-core/src/application/mod.rs

pub mod resolve;

// --- RE-EXPORTS (FACADE PATTERN) ---
pub use resolve::{ResolvedTarget, TargetSelection, resolve_profile_target};
