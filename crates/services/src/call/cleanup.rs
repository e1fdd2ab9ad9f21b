use futures::future::BoxFuture;
use tracing::{info, warn};

/// One named step of the call-end teardown.
pub struct CleanupStep<'a> {
    pub name: &'static str,
    fut: BoxFuture<'a, anyhow::Result<()>>,
}

impl<'a> CleanupStep<'a> {
    pub fn new<F>(name: &'static str, fut: F) -> Self
    where
        F: std::future::Future<Output = anyhow::Result<()>> + Send + 'a,
    {
        Self {
            name,
            fut: Box::pin(fut),
        }
    }
}

/// Runs every step in order. A failed step is logged and skipped; later
/// steps still run, so a dead media provider cannot leave caption sessions
/// or subscribers dangling.
pub async fn run_cleanup(label: &str, steps: Vec<CleanupStep<'_>>) {
    for step in steps {
        if let Err(e) = step.fut.await {
            warn!(%label, step = step.name, error = %e, "Cleanup step failed, continuing");
        }
    }
    info!(%label, "Cleanup finished");
}
