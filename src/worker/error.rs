use thiserror::Error;

/// Failures the worker surfaces to its callers.
///
/// Background revalidation failures never appear here: they are logged and
/// dropped inside the detached task. Racing writers for one key are not an
/// error either; the store resolves them last-write-wins.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// A precache manifest entry could not be fetched or stored during
    /// install. The whole install fails and the staging store is discarded.
    #[error("precache of {url} failed: {reason}")]
    Precache { url: String, reason: String },

    /// A live request's network call rejected entirely and no cached
    /// fallback document was available.
    #[error("network failure for {url} and no cached fallback")]
    Offline { url: String },

    /// Lifecycle misuse: the operation requires a different worker state.
    #[error("worker is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
}
