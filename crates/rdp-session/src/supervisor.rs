use std::future::Future;

/// Launches the capture and command loops as two independent tasks.
///
/// Each loop owns its own error handling and reconnection;
/// the supervisor's only job is to start both and wait for them to
/// return, which they do once the shared [`crate::ShutdownWatcher`]
/// they were built with observes shutdown.
pub struct Supervisor;

impl Supervisor {
    pub async fn run<C, M>(capture: C, command: M)
    where
        C: Future<Output = ()> + Send + 'static,
        M: Future<Output = ()> + Send + 'static,
    {
        let capture_handle = tokio::spawn(capture);
        let command_handle = tokio::spawn(command);

        if let Err(e) = capture_handle.await {
            tracing::error!(error = %e, "capture task panicked");
        }
        if let Err(e) = command_handle.await {
            tracing::error!(error = %e, "command task panicked");
        }
    }
}
