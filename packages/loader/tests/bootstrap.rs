//! End-to-end bootstrap against a minimal text-format component.
//!
//! The fixture exports `entry.run` and imports nothing: `run` ignores its
//! arguments and reports success. That is enough to drive the whole
//! sequence — fetch, instantiate, mount, stage, start — without a guest
//! toolchain in the loop.

use std::sync::Arc;

use berth_loader::{
    ConfigOverrides, DirFetcher, HeadlessSurfaces, Loader, LoaderError, ModuleConfig,
    ModuleRuntime, TracingConsole,
};
use berth_vfs::{MemoryStore, MountOutcome};

/// `run` writes the success discriminant at address zero and returns that
/// address as its result pointer. The bump allocator hands out scratch
/// space above the result area; the guest never reads what the host
/// lowers into it.
const ENTRY_ONLY_COMPONENT: &str = r#"
(component
  (core module $m
    (memory (export "memory") 1)
    (func (export "realloc") (param i32 i32 i32 i32) (result i32)
      i32.const 64)
    (func (export "run") (param i32 i32) (result i32)
      (i32.store8 (i32.const 0) (i32.const 0))
      i32.const 0))
  (core instance $i (instantiate $m))
  (func $run (param "args" (list string)) (result (result (error string)))
    (canon lift (core func $i "run")
      (memory $i "memory")
      (realloc (func $i "realloc"))
      string-encoding=utf8))
  (instance $entry (export "run" (func $run)))
  (export "berth:module/entry" (instance $entry)))
"#;

#[test]
fn start_runs_once_then_reports_already_started() {
    let mut handle = ModuleRuntime::instantiate(
        ENTRY_ONLY_COMPONENT.as_bytes(),
        Arc::new(ModuleConfig::default()),
        Arc::new(TracingConsole),
        Arc::new(HeadlessSurfaces::new(640, 480)),
        "primary".to_string(),
    )
    .unwrap();

    assert!(!handle.started());
    handle.start(&[]).unwrap();
    assert!(handle.started());
    assert!(matches!(handle.start(&[]), Err(LoaderError::AlreadyStarted)));
}

#[tokio::test]
async fn full_bootstrap_reports_mount_and_staging() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("module.wasm"), ENTRY_ONLY_COMPONENT).unwrap();
    std::fs::create_dir_all(tmp.path().join("data")).unwrap();
    std::fs::write(tmp.path().join("data/settings.ini"), b"fullscreen=0").unwrap();

    let mut loader = Loader::new(
        Arc::new(DirFetcher::new(tmp.path())),
        Arc::new(MemoryStore::new()),
        Arc::new(HeadlessSurfaces::new(640, 480)),
    );
    loader
        .configure(ConfigOverrides {
            static_files: vec!["data/settings.ini".to_string()],
            ..Default::default()
        })
        .unwrap();

    let report = loader.initialize().await.unwrap();
    assert_eq!(report.surface, "primary");
    assert_eq!(report.mount, MountOutcome::Mounted);
    assert_eq!(report.staged, 1);
    assert!(report.failures.is_empty());
    assert_eq!(
        loader
            .vfs()
            .unwrap()
            .read_file("/user_fs/data/settings.ini")
            .unwrap(),
        "fullscreen=0"
    );

    // The configuration is frozen from here on.
    assert!(matches!(
        loader.configure(ConfigOverrides::default()),
        Err(LoaderError::AlreadyInitialized)
    ));
    assert!(matches!(
        loader.initialize().await,
        Err(LoaderError::AlreadyInitialized)
    ));

    loader.start().unwrap();
    assert!(matches!(loader.start(), Err(LoaderError::AlreadyStarted)));
}
