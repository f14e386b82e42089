// targetry-core/src/infrastructure/mod.rs

pub mod compiler;
pub mod config;
pub mod error;

pub use compiler::jinja::JinjaRenderer;
pub use config::profiles::{ProfileEntry, ProfilesFile, load_profiles};
