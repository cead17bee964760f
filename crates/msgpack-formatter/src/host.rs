//! What the formatter needs from the web framework hosting it.

/// Error sink supplied by the host for a single read.
pub trait FormatterLogger {
    fn log_error(&self, context: &str, message: &str);
}

/// The host's content-negotiation extension point.
pub trait FormatterHost {
    fn register_media_type(&mut self, media_type: &str);

    /// Error sink for reads, if the host has one. Without a logger, decode
    /// failures propagate to the host.
    fn logger(&self) -> Option<&dyn FormatterLogger> {
        None
    }
}

/// Forwards formatter errors to `tracing` at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl FormatterLogger for TracingLogger {
    fn log_error(&self, context: &str, message: &str) {
        tracing::error!(context, error = message, "formatter error");
    }
}
