//! Bootstrap configuration.
//!
//! A `ModuleConfig` is built once per bootstrap from defaults, optionally
//! merged with caller overrides, then frozen when initialization begins.
//! Merge semantics: scalar fields are replaced, list fields are appended
//! preserving order within each source.
//!
//! The binary path and side-module paths are derived from the base asset
//! path and recompute automatically if the base is overridden; an explicit
//! override of a derived field sticks.

use serde::Deserialize;

/// Fixed prefix on asset filenames emitted by the module's build tooling.
///
/// Only names carrying this prefix are remapped by
/// [`ModuleConfig::resolve_asset_path`]; everything else belongs to the
/// host page and passes through untouched.
pub const EMITTED_PREFIX: &str = "module.";

/// Frozen bootstrap configuration for one module.
#[derive(Debug, Clone)]
pub struct ModuleConfig {
    base_path: String,
    bin_path: Option<String>,
    side_modules: Option<Vec<String>>,
    dynamic_modules: Vec<String>,
    static_files: Vec<String>,
    persistent_paths: Vec<String>,
    args: Vec<String>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            base_path: "module".to_string(),
            bin_path: None,
            side_modules: None,
            dynamic_modules: Vec::new(),
            static_files: Vec::new(),
            persistent_paths: vec!["/user_fs".to_string()],
            args: Vec::new(),
        }
    }
}

/// Caller-supplied overrides, typically deserialized from the host page's
/// config blob.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub base_path: Option<String>,
    pub bin_path: Option<String>,
    pub side_modules: Vec<String>,
    pub dynamic_modules: Vec<String>,
    pub static_files: Vec<String>,
    pub persistent_paths: Vec<String>,
    pub args: Vec<String>,
}

impl ModuleConfig {
    /// Merge `overrides` in: scalars replace, lists append.
    pub fn merge(&mut self, overrides: ConfigOverrides) {
        if let Some(base) = overrides.base_path {
            self.base_path = base;
        }
        if let Some(bin) = overrides.bin_path {
            self.bin_path = Some(bin);
        }
        if !overrides.side_modules.is_empty() {
            self.side_modules
                .get_or_insert_with(Vec::new)
                .extend(overrides.side_modules);
        }
        self.dynamic_modules.extend(overrides.dynamic_modules);
        self.static_files.extend(overrides.static_files);
        self.persistent_paths.extend(overrides.persistent_paths);
        self.args.extend(overrides.args);
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// The binary module path: `{base}.wasm` unless explicitly overridden.
    pub fn bin_path(&self) -> String {
        self.bin_path
            .clone()
            .unwrap_or_else(|| format!("{}.wasm", self.base_path))
    }

    /// Side-module paths: `[{base}.side.wasm]` unless explicitly overridden.
    pub fn side_modules(&self) -> Vec<String> {
        self.side_modules
            .clone()
            .unwrap_or_else(|| vec![format!("{}.side.wasm", self.base_path)])
    }

    pub fn dynamic_modules(&self) -> &[String] {
        &self.dynamic_modules
    }

    pub fn static_files(&self) -> &[String] {
        &self.static_files
    }

    pub fn persistent_paths(&self) -> &[String] {
        &self.persistent_paths
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The program name handed to the module.
    pub fn program_name(&self) -> String {
        format!("./{}", self.bin_path())
    }

    /// Map a logical asset filename to its concrete path.
    ///
    /// Filenames from the module's build tooling carry [`EMITTED_PREFIX`]
    /// and are dispatched on suffix: worker script, side module, binary,
    /// companion script. Any other name is returned unchanged — the
    /// module's own loader does not know the page's asset layout, but
    /// plain names need no help.
    pub fn resolve_asset_path(&self, name: &str) -> String {
        if !name.starts_with(EMITTED_PREFIX) {
            return name.to_string();
        }
        if name.ends_with(".worker.js") {
            format!("{}.worker.js", self.base_path)
        } else if name.ends_with(".side.wasm") {
            self.side_modules()
                .into_iter()
                .next()
                .unwrap_or_else(|| name.to_string())
        } else if name.ends_with(".wasm") {
            self.bin_path()
        } else if name.ends_with(".js") {
            format!("{}.js", self.base_path)
        } else {
            name.to_string()
        }
    }
}
