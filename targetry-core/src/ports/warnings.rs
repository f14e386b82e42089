// targetry-core/src/ports/warnings.rs

// Advisory channel for non-fatal adjustments made while resolving a target
// (e.g. clamping an unsupported thread count).

pub trait WarningSink: Send + Sync {
    fn warn(&self, message: &str);
}

/// Default sink: forwards to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWarnings;

impl WarningSink for TracingWarnings {
    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }
}

pub(crate) static TRACING_WARNINGS: TracingWarnings = TracingWarnings;
