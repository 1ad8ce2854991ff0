use thiserror::Error;

/// Top-level agent errors. Only [`AgentError::ResourceMissing`]
/// is fatal; every other loop-level error is caught and converted into
/// a reconnect-and-retry by the capture/command loops themselves.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("bundled resource {0:?} not found in the working directory or ./_internal/icon/")]
    ResourceMissing(String),
}
