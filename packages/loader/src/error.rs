//! Error types for the module loader.

use thiserror::Error;

/// Errors from asset fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("asset not found: {path}")]
    NotFound { path: String },
}

/// A single dynamic-module or static-file staging failure.
///
/// Staging is best-effort: one failed file never aborts its siblings, but
/// every failure is reported back to the caller.
#[derive(Debug)]
pub struct StageFailure {
    pub source: String,
    pub error: String,
}

/// Errors surfaced by the bootstrap sequence.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// No usable rendering surface exists in the host.
    #[error("no rendering surface found in host")]
    SurfaceNotFound,

    /// Fetching or constructing the binary module failed.
    #[error("module instantiation failed: {0}")]
    Instantiation(String),

    /// The module's entry point returned an error.
    #[error("module run failed: {0}")]
    Execution(String),

    /// `start` was called before `initialize` completed.
    #[error("loader is not initialized")]
    NotInitialized,

    /// `start` was called a second time.
    #[error("module already started")]
    AlreadyStarted,

    /// `configure` was called after `initialize`; the configuration is
    /// frozen for the duration of one bootstrap sequence.
    #[error("configuration is frozen after initialization")]
    AlreadyInitialized,

    /// An asset fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A filesystem-layer operation failed.
    #[error(transparent)]
    Vfs(#[from] berth_vfs::VfsError),
}

/// Result alias for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;
