use crate::error::AppError;

/// Receiver for fetch failures recorded by the viewer.
///
/// Injected at construction so error routing is explicit rather than
/// ambient; the viewer records every failure in its own state and
/// additionally hands it to the reporter.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &AppError);
}

/// Default reporter that emits failures through `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, error: &AppError) {
        tracing::error!(
            code = error.error_code(),
            error = %error,
            "Fetch failed; polling continues"
        );
    }
}
