// targetry-core/src/infrastructure/compiler/mod.rs

pub mod jinja;
