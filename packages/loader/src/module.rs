//! Module instantiation and execution using Wasmtime.
//!
//! The binary compute module is a WebAssembly component. The host lends it
//! four capabilities through the `module-world` WIT world: console output,
//! asset-path resolution, surface lifecycle, and its private filesystem.
//! All of them are wired into the linker before instantiation, so they are
//! in place before the entry point can run.

use std::sync::Arc;

use berth_vfs::{parent_of, FsError, FsHandle, MemFs};
use wasmtime::component::{bindgen, Component, HasSelf, Linker};
use wasmtime::{Config, Engine, Store};

use crate::config::ModuleConfig;
use crate::error::{LoaderError, Result};
use crate::surface::{Console, SurfaceHost};

// Generate bindings from the WIT file
bindgen!({
    path: "wit/world.wit",
    world: "module-world",
});

/// State held by the Wasmtime store for one module instance.
pub struct HostState {
    config: Arc<ModuleConfig>,
    console: Arc<dyn Console>,
    surfaces: Arc<dyn SurfaceHost>,
    surface_id: String,
    fs: FsHandle,
}

impl HostState {
    pub fn new(
        config: Arc<ModuleConfig>,
        console: Arc<dyn Console>,
        surfaces: Arc<dyn SurfaceHost>,
        surface_id: String,
        fs: FsHandle,
    ) -> Self {
        Self {
            config,
            console,
            surfaces,
            surface_id,
            fs,
        }
    }
}

impl berth::module::host::Host for HostState {
    fn print(&mut self, text: String) {
        self.console.print(&text);
    }

    fn print_err(&mut self, text: String) {
        self.console.print_err(&text);
    }

    fn program_name(&mut self) -> String {
        self.config.program_name()
    }

    fn locate_file(&mut self, name: String) -> String {
        self.config.resolve_asset_path(&name)
    }

    fn primary_surface(&mut self) -> String {
        self.surface_id.clone()
    }
}

impl berth::module::surface::Host for HostState {
    fn create_surface(&mut self, id: String, width: u32, height: u32, x: i32, y: i32) {
        self.surfaces.create_surface(&id, width, height, x, y);
    }

    fn destroy_surface(&mut self, id: String) {
        self.surfaces.destroy_surface(&id);
    }

    fn set_focus(&mut self, id: String, focused: bool) {
        self.surfaces.set_focus(&id, focused);
    }

    fn set_size(&mut self, id: String, width: u32, height: u32) {
        self.surfaces.set_size(&id, width, height);
    }

    fn set_position(&mut self, id: String, x: i32, y: i32) {
        self.surfaces.set_position(&id, x, y);
    }

    fn set_visibility(&mut self, id: String, visible: bool) {
        self.surfaces.set_visibility(&id, visible);
    }

    fn set_fullscreen(&mut self, id: String, fullscreen: bool) {
        self.surfaces.set_fullscreen(&id, fullscreen);
    }
}

impl berth::module::vfs::Host for HostState {
    fn read_file(&mut self, path: String) -> berth::module::vfs::ReadResult {
        use berth::module::vfs::ReadResult;

        let fs = match self.fs.lock() {
            Ok(fs) => fs,
            Err(_) => return ReadResult::ReadError("filesystem lock poisoned".to_string()),
        };
        match fs.read_file(&path) {
            Ok(data) => ReadResult::Data(data.to_vec()),
            Err(FsError::NotFound(_)) => ReadResult::NotFound,
            Err(err) => ReadResult::ReadError(err.to_string()),
        }
    }

    fn write_file(&mut self, path: String, data: Vec<u8>) -> berth::module::vfs::WriteResult {
        use berth::module::vfs::WriteResult;

        let mut fs = match self.fs.lock() {
            Ok(fs) => fs,
            Err(_) => return WriteResult::WriteError("filesystem lock poisoned".to_string()),
        };
        let parent = parent_of(&path);
        match fs.stat(parent) {
            Ok(_) => {}
            Err(FsError::NotFound(_)) => {
                if let Err(err) = fs.mkdir_tree(parent) {
                    return WriteResult::WriteError(err.to_string());
                }
            }
            Err(err) => return WriteResult::WriteError(err.to_string()),
        }
        match fs.write_file(&path, data.into()) {
            Ok(()) => WriteResult::Written,
            Err(err) => WriteResult::WriteError(err.to_string()),
        }
    }
}

/// A live, instantiated module.
///
/// Created once per bootstrap by [`ModuleRuntime::instantiate`]; destroyed
/// only by process teardown. The filesystem handle is lent to the
/// persistent filesystem manager, never transferred.
pub struct ModuleHandle {
    store: Store<HostState>,
    world: ModuleWorld,
    fs: FsHandle,
    started: bool,
}

impl ModuleHandle {
    /// Clone the handle to the module's private filesystem.
    pub fn fs(&self) -> FsHandle {
        self.fs.clone()
    }

    pub fn started(&self) -> bool {
        self.started
    }

    /// Invoke the module's entry point with `args`.
    ///
    /// Calling this a second time is a programming error
    /// (`AlreadyStarted`), not undefined behavior.
    pub fn start(&mut self, args: &[String]) -> Result<()> {
        if self.started {
            return Err(LoaderError::AlreadyStarted);
        }
        self.started = true;
        let outcome = self
            .world
            .berth_module_entry()
            .call_run(&mut self.store, args)
            .map_err(|e| LoaderError::Execution(e.to_string()))?;
        outcome.map_err(LoaderError::Execution)
    }
}

/// Constructs module instances.
pub struct ModuleRuntime;

impl ModuleRuntime {
    /// Compile `binary` and instantiate it with the given capabilities.
    ///
    /// Any fetch-side problem has already surfaced by the time bytes reach
    /// here; compile and link failures are fatal (`Instantiation`).
    pub fn instantiate(
        binary: &[u8],
        config: Arc<ModuleConfig>,
        console: Arc<dyn Console>,
        surfaces: Arc<dyn SurfaceHost>,
        surface_id: String,
    ) -> Result<ModuleHandle> {
        let mut wasm_config = Config::new();
        wasm_config.wasm_component_model(true);
        let engine = Engine::new(&wasm_config)
            .map_err(|e| LoaderError::Instantiation(e.to_string()))?;

        let component = Component::new(&engine, binary)
            .map_err(|e| LoaderError::Instantiation(e.to_string()))?;

        let mut linker = Linker::<HostState>::new(&engine);
        ModuleWorld::add_to_linker::<HostState, HasSelf<HostState>>(&mut linker, |state| state)
            .map_err(|e| LoaderError::Instantiation(e.to_string()))?;

        let fs = MemFs::handle();
        let state = HostState::new(config, console, surfaces, surface_id, fs.clone());
        let mut store = Store::new(&engine, state);

        let world = ModuleWorld::instantiate(&mut store, &component, &linker)
            .map_err(|e| LoaderError::Instantiation(e.to_string()))?;

        Ok(ModuleHandle {
            store,
            world,
            fs,
            started: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HeadlessSurfaces;
    use std::sync::Mutex;

    struct CollectingConsole {
        out: Mutex<Vec<String>>,
        err: Mutex<Vec<String>>,
    }

    impl CollectingConsole {
        fn new() -> Self {
            Self {
                out: Mutex::new(Vec::new()),
                err: Mutex::new(Vec::new()),
            }
        }
    }

    impl Console for CollectingConsole {
        fn print(&self, text: &str) {
            self.out.lock().unwrap().push(text.to_string());
        }
        fn print_err(&self, text: &str) {
            self.err.lock().unwrap().push(text.to_string());
        }
    }

    fn host_state(console: Arc<CollectingConsole>) -> HostState {
        HostState::new(
            Arc::new(ModuleConfig::default()),
            console,
            Arc::new(HeadlessSurfaces::new(1920, 1080)),
            "primary".to_string(),
            MemFs::handle(),
        )
    }

    #[test]
    fn instantiate_rejects_garbage_binary() {
        let result = ModuleRuntime::instantiate(
            b"not a component",
            Arc::new(ModuleConfig::default()),
            Arc::new(TracingConsoleForTest),
            Arc::new(HeadlessSurfaces::new(1920, 1080)),
            "primary".to_string(),
        );
        assert!(matches!(result, Err(LoaderError::Instantiation(_))));
    }

    struct TracingConsoleForTest;
    impl Console for TracingConsoleForTest {
        fn print(&self, _text: &str) {}
        fn print_err(&self, _text: &str) {}
    }

    #[test]
    fn host_print_routes_to_console() {
        use berth::module::host::Host;

        let console = Arc::new(CollectingConsole::new());
        let mut state = host_state(console.clone());
        state.print("hello".to_string());
        state.print_err("oops".to_string());
        assert_eq!(*console.out.lock().unwrap(), vec!["hello".to_string()]);
        assert_eq!(*console.err.lock().unwrap(), vec!["oops".to_string()]);
    }

    #[test]
    fn host_resolves_emitted_asset_names() {
        use berth::module::host::Host;

        let console = Arc::new(CollectingConsole::new());
        let mut state = host_state(console);
        assert_eq!(state.locate_file("module.wasm".to_string()), "module.wasm");
        assert_eq!(state.locate_file("data/tiles.png".to_string()), "data/tiles.png");
        assert_eq!(state.program_name(), "./module.wasm");
        assert_eq!(state.primary_surface(), "primary");
    }

    #[test]
    fn surface_ops_reach_the_registry() {
        use berth::module::surface::Host;

        let surfaces = Arc::new(HeadlessSurfaces::new(1920, 1080));
        let mut state = HostState::new(
            Arc::new(ModuleConfig::default()),
            Arc::new(CollectingConsole::new()),
            surfaces.clone(),
            "primary".to_string(),
            MemFs::handle(),
        );
        state.create_surface("hud".to_string(), 320, 200, 0, 0);
        state.set_size("hud".to_string(), 640, 400);
        let hud = surfaces.state("hud").unwrap();
        assert_eq!((hud.width, hud.height), (640, 400));

        // Unknown ids are no-ops.
        state.set_focus("ghost".to_string(), true);
        assert!(surfaces.state("ghost").is_none());
    }

    #[test]
    fn vfs_write_creates_parents_and_reads_back() {
        use berth::module::vfs::{Host, ReadResult, WriteResult};

        let console = Arc::new(CollectingConsole::new());
        let mut state = host_state(console);

        let result = state.write_file("/user_fs/saves/slot0.bin".to_string(), b"state".to_vec());
        assert!(matches!(result, WriteResult::Written));

        let result = state.read_file("/user_fs/saves/slot0.bin".to_string());
        assert!(matches!(result, ReadResult::Data(data) if data == b"state"));

        let result = state.read_file("/user_fs/missing.bin".to_string());
        assert!(matches!(result, ReadResult::NotFound));
    }
}
