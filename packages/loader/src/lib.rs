//! berth-loader: Module lifecycle bootstrap.
//!
//! Bootstraps a binary compute module (a WebAssembly component compiled
//! elsewhere) into a host: resolves asset locations, fetches and
//! instantiates the binary, binds it to a rendering surface and a
//! persistent virtual filesystem (`berth-vfs`), stages configured dynamic
//! modules and static files, and starts the module's entry point.
//!
//! # Bootstrap sequence
//!
//! ```rust,ignore
//! use berth_loader::{ConfigOverrides, DirFetcher, HeadlessSurfaces, Loader};
//! use berth_vfs::DiskStore;
//! use std::sync::Arc;
//!
//! let mut loader = Loader::new(
//!     Arc::new(DirFetcher::new("assets")),
//!     Arc::new(DiskStore::new("persist")),
//!     Arc::new(HeadlessSurfaces::new(1920, 1080)),
//! );
//! loader.configure(ConfigOverrides {
//!     base_path: Some("app.release".to_string()),
//!     ..Default::default()
//! })?;
//! let report = loader.initialize().await?;
//! loader.start()?;
//! ```

mod config;
mod error;
mod fetch;
mod loader;
mod module;
mod surface;

pub use config::{ConfigOverrides, ModuleConfig, EMITTED_PREFIX};
pub use error::{FetchError, LoaderError, Result, StageFailure};
pub use fetch::{AssetFetcher, DirFetcher, HttpFetcher};
pub use loader::{InitReport, Loader};
pub use module::{HostState, ModuleHandle, ModuleRuntime};
pub use surface::{Console, HeadlessSurfaces, SurfaceHost, SurfaceState, TracingConsole};
