// targetry-core/src/ports/mod.rs

pub mod warnings;

pub use warnings::{TracingWarnings, WarningSink};
