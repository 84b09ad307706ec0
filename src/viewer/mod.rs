pub mod controller;
pub mod poller;
pub mod reporter;

pub use controller::{RunLogViewer, ViewerInit, ViewerStats};
pub use poller::{spawn_poller, PollerPhase};
pub use reporter::{ErrorReporter, TracingErrorReporter};
