//! The bootstrap sequence.
//!
//! `Loader` drives one module from configuration to execution:
//!
//! 1. `configure` — merge caller overrides into the default config.
//! 2. `initialize` — locate a rendering surface, fetch and instantiate the
//!    binary, mount the persistent filesystem, stage dynamic modules and
//!    static files.
//! 3. `start` — invoke the module's entry point with the configured args.
//!
//! Mount must complete before any staging write is issued, because staging
//! targets paths that may be backed by the durable store. Staging fetches
//! run concurrently with each other; each fetch-then-write is awaited to
//! completion before `start` can run.

use std::sync::Arc;

use berth_vfs::{BackingStore, MountOutcome, PersistentFs};
use futures::future::join_all;
use url::Url;

use crate::config::{ConfigOverrides, ModuleConfig};
use crate::error::{LoaderError, Result, StageFailure};
use crate::fetch::AssetFetcher;
use crate::module::{ModuleHandle, ModuleRuntime};
use crate::surface::{Console, SurfaceHost, TracingConsole};

/// What `initialize` accomplished.
///
/// Staging is best-effort: failures land here instead of aborting the
/// bootstrap or their sibling transfers.
#[derive(Debug)]
pub struct InitReport {
    /// Id of the surface the module was attached to.
    pub surface: String,
    /// How the persistent mount concluded.
    pub mount: MountOutcome,
    /// Number of assets staged successfully.
    pub staged: usize,
    /// Per-file staging failures.
    pub failures: Vec<StageFailure>,
}

/// Bootstraps one binary module into the host.
pub struct Loader {
    config: ModuleConfig,
    fetcher: Arc<dyn AssetFetcher>,
    store: Arc<dyn BackingStore>,
    surfaces: Arc<dyn SurfaceHost>,
    console: Arc<dyn Console>,
    module: Option<ModuleHandle>,
    vfs: Option<PersistentFs>,
}

impl Loader {
    pub fn new(
        fetcher: Arc<dyn AssetFetcher>,
        store: Arc<dyn BackingStore>,
        surfaces: Arc<dyn SurfaceHost>,
    ) -> Self {
        Self {
            config: ModuleConfig::default(),
            fetcher,
            store,
            surfaces,
            console: Arc::new(TracingConsole),
            module: None,
            vfs: None,
        }
    }

    /// Replace the default console hooks.
    pub fn with_console(mut self, console: Arc<dyn Console>) -> Self {
        self.console = console;
        self
    }

    /// Merge overrides into the configuration.
    ///
    /// The configuration freezes once `initialize` has run; later calls
    /// are a programming error.
    pub fn configure(&mut self, overrides: ConfigOverrides) -> Result<()> {
        if self.module.is_some() {
            return Err(LoaderError::AlreadyInitialized);
        }
        self.config.merge(overrides);
        Ok(())
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// The filesystem manager, once `initialize` has run.
    pub fn vfs(&self) -> Option<&PersistentFs> {
        self.vfs.as_ref()
    }

    pub fn vfs_mut(&mut self) -> Option<&mut PersistentFs> {
        self.vfs.as_mut()
    }

    /// Locate a surface, instantiate the module, mount persistence, and
    /// stage configured assets.
    pub async fn initialize(&mut self) -> Result<InitReport> {
        if self.module.is_some() {
            return Err(LoaderError::AlreadyInitialized);
        }

        let surface = self
            .surfaces
            .primary_surface()
            .ok_or(LoaderError::SurfaceNotFound)?;

        let binary = self
            .fetcher
            .fetch(&self.config.bin_path())
            .await
            .map_err(|e| LoaderError::Instantiation(e.to_string()))?;

        let config = Arc::new(self.config.clone());
        let handle = ModuleRuntime::instantiate(
            &binary,
            config.clone(),
            self.console.clone(),
            self.surfaces.clone(),
            surface.clone(),
        )?;

        let mut vfs = PersistentFs::new(handle.fs(), self.store.clone());
        let mount = vfs.mount(self.config.persistent_paths()).await?;
        if let MountOutcome::Degraded { error } = &mount {
            tracing::warn!(%error, "running without persistence");
        }

        let stage_root = self
            .config
            .persistent_paths()
            .first()
            .cloned()
            .unwrap_or_else(|| "/".to_string());
        let sources: Vec<String> = config
            .dynamic_modules()
            .iter()
            .chain(config.static_files())
            .cloned()
            .collect();
        let (staged, failures) =
            stage_assets(self.fetcher.as_ref(), &vfs, &sources, &stage_root).await;

        self.module = Some(handle);
        self.vfs = Some(vfs);
        Ok(InitReport {
            surface,
            mount,
            staged,
            failures,
        })
    }

    /// Invoke the module's entry point with the configured arguments.
    pub fn start(&mut self) -> Result<()> {
        let module = self.module.as_mut().ok_or(LoaderError::NotInitialized)?;
        module.start(self.config.args())
    }
}

/// Fetch every source and write it into the filesystem, concurrently.
///
/// One failure never aborts the others; all failures are collected for the
/// caller's report.
pub(crate) async fn stage_assets(
    fetcher: &dyn AssetFetcher,
    vfs: &PersistentFs,
    sources: &[String],
    stage_root: &str,
) -> (usize, Vec<StageFailure>) {
    let jobs = sources.iter().map(|source| {
        let target = staging_target(stage_root, source);
        async move {
            let bytes = fetcher
                .fetch(source)
                .await
                .map_err(|e| StageFailure {
                    source: source.clone(),
                    error: e.to_string(),
                })?;
            vfs.stage_file(&target, bytes).map_err(|e| StageFailure {
                source: source.clone(),
                error: e.to_string(),
            })?;
            tracing::debug!(%source, %target, "staged asset");
            Ok::<(), StageFailure>(())
        }
    });

    let mut staged = 0;
    let mut failures = Vec::new();
    for result in join_all(jobs).await {
        match result {
            Ok(()) => staged += 1,
            Err(failure) => {
                tracing::error!(source = %failure.source, error = %failure.error, "staging failed");
                failures.push(failure);
            }
        }
    }
    (staged, failures)
}

/// Target path for a staged asset: the source's subpath under the staging
/// root. URL sources contribute their path component.
fn staging_target(root: &str, source: &str) -> String {
    let rel = if source.contains("://") {
        match Url::parse(source) {
            Ok(url) => url.path().trim_start_matches('/').to_string(),
            Err(_) => source.trim_start_matches('/').to_string(),
        }
    } else {
        source.trim_start_matches('/').to_string()
    };
    if root == "/" {
        format!("/{rel}")
    } else {
        format!("{}/{}", root.trim_end_matches('/'), rel)
    }
}
