// targetry-core/src/infrastructure/config/mod.rs

pub mod profiles;
