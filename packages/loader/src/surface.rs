//! Host capability hooks: rendering surfaces and console output.
//!
//! The core does not implement surface plumbing; it only guarantees these
//! capabilities are wired into the module before its entry point runs.
//! Hosts provide their own implementation (a page host drives its canvas
//! elements); [`HeadlessSurfaces`] is an in-memory registry for native
//! hosts and tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

/// Surface lifecycle operations, keyed by surface id.
///
/// Every operation on an id with no surface behind it is a no-op, not an
/// error.
pub trait SurfaceHost: Send + Sync {
    /// The first usable surface in the host, if any. The bootstrap fails
    /// with `SurfaceNotFound` when this returns `None`.
    fn primary_surface(&self) -> Option<String>;

    fn create_surface(&self, id: &str, width: u32, height: u32, x: i32, y: i32);
    fn destroy_surface(&self, id: &str);
    fn set_focus(&self, id: &str, focused: bool);
    fn set_size(&self, id: &str, width: u32, height: u32);
    fn set_position(&self, id: &str, x: i32, y: i32);
    fn set_visibility(&self, id: &str, visible: bool);
    fn set_fullscreen(&self, id: &str, fullscreen: bool);
}

/// Console output hooks for the module's text streams.
pub trait Console: Send + Sync {
    fn print(&self, text: &str);
    fn print_err(&self, text: &str);
}

/// Routes module output through `tracing`.
#[derive(Debug, Default)]
pub struct TracingConsole;

impl Console for TracingConsole {
    fn print(&self, text: &str) {
        tracing::info!(target: "module", "{text}");
    }

    fn print_err(&self, text: &str) {
        tracing::error!(target: "module", "{text}");
    }
}

/// State of one headless surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceState {
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
    pub visible: bool,
    pub focused: bool,
    pub fullscreen: bool,
    last_width: u32,
    last_height: u32,
}

impl SurfaceState {
    fn new(width: u32, height: u32, x: i32, y: i32) -> Self {
        Self {
            width,
            height,
            x,
            y,
            visible: true,
            focused: false,
            fullscreen: false,
            last_width: width,
            last_height: height,
        }
    }
}

/// In-memory surface registry.
///
/// Fullscreen expands to the host dimensions and remembers the previous
/// size; leaving fullscreen restores it, mirroring what a page host does
/// with its canvas.
pub struct HeadlessSurfaces {
    host_width: u32,
    host_height: u32,
    surfaces: Mutex<BTreeMap<String, SurfaceState>>,
}

impl HeadlessSurfaces {
    /// A registry with one primary surface already present.
    pub fn new(host_width: u32, host_height: u32) -> Self {
        let mut surfaces = BTreeMap::new();
        surfaces.insert(
            "primary".to_string(),
            SurfaceState::new(host_width, host_height, 0, 0),
        );
        Self {
            host_width,
            host_height,
            surfaces: Mutex::new(surfaces),
        }
    }

    /// A registry with no surfaces, for exercising the missing-surface path.
    pub fn empty(host_width: u32, host_height: u32) -> Self {
        Self {
            host_width,
            host_height,
            surfaces: Mutex::new(BTreeMap::new()),
        }
    }

    /// Inspect a surface's state.
    pub fn state(&self, id: &str) -> Option<SurfaceState> {
        self.surfaces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    fn update(&self, id: &str, apply: impl FnOnce(&mut SurfaceState)) {
        let mut surfaces = self.surfaces.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(state) = surfaces.get_mut(id) {
            apply(state);
        }
    }
}

impl SurfaceHost for HeadlessSurfaces {
    fn primary_surface(&self) -> Option<String> {
        self.surfaces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .next()
            .cloned()
    }

    fn create_surface(&self, id: &str, width: u32, height: u32, x: i32, y: i32) {
        self.surfaces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string(), SurfaceState::new(width, height, x, y));
    }

    fn destroy_surface(&self, id: &str) {
        self.surfaces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    fn set_focus(&self, id: &str, focused: bool) {
        self.update(id, |s| s.focused = focused);
    }

    fn set_size(&self, id: &str, width: u32, height: u32) {
        self.update(id, |s| {
            s.width = width;
            s.height = height;
        });
    }

    fn set_position(&self, id: &str, x: i32, y: i32) {
        self.update(id, |s| {
            s.x = x;
            s.y = y;
        });
    }

    fn set_visibility(&self, id: &str, visible: bool) {
        self.update(id, |s| s.visible = visible);
    }

    fn set_fullscreen(&self, id: &str, fullscreen: bool) {
        let (host_width, host_height) = (self.host_width, self.host_height);
        self.update(id, |s| {
            if fullscreen && !s.fullscreen {
                s.last_width = s.width;
                s.last_height = s.height;
                s.width = host_width;
                s.height = host_height;
                s.x = 0;
                s.y = 0;
            } else if !fullscreen && s.fullscreen {
                s.width = s.last_width;
                s.height = s.last_height;
            }
            s.fullscreen = fullscreen;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_surface_exists_by_default() {
        let surfaces = HeadlessSurfaces::new(1920, 1080);
        assert_eq!(surfaces.primary_surface(), Some("primary".to_string()));
        assert!(HeadlessSurfaces::empty(1920, 1080)
            .primary_surface()
            .is_none());
    }

    #[test]
    fn create_and_resize() {
        let surfaces = HeadlessSurfaces::new(1920, 1080);
        surfaces.create_surface("hud", 320, 200, 10, 20);
        surfaces.set_size("hud", 640, 400);
        let state = surfaces.state("hud").unwrap();
        assert_eq!((state.width, state.height), (640, 400));
        assert_eq!((state.x, state.y), (10, 20));
    }

    #[test]
    fn operations_on_unknown_id_are_noops() {
        let surfaces = HeadlessSurfaces::new(1920, 1080);
        surfaces.set_size("ghost", 1, 1);
        surfaces.set_focus("ghost", true);
        surfaces.destroy_surface("ghost");
        assert!(surfaces.state("ghost").is_none());
    }

    #[test]
    fn fullscreen_round_trip_restores_size() {
        let surfaces = HeadlessSurfaces::new(1920, 1080);
        surfaces.create_surface("game", 800, 600, 5, 5);

        surfaces.set_fullscreen("game", true);
        let state = surfaces.state("game").unwrap();
        assert!(state.fullscreen);
        assert_eq!((state.width, state.height), (1920, 1080));
        assert_eq!((state.x, state.y), (0, 0));

        surfaces.set_fullscreen("game", false);
        let state = surfaces.state("game").unwrap();
        assert!(!state.fullscreen);
        assert_eq!((state.width, state.height), (800, 600));
    }

    #[test]
    fn visibility_toggle() {
        let surfaces = HeadlessSurfaces::new(1920, 1080);
        surfaces.set_visibility("primary", false);
        assert!(!surfaces.state("primary").unwrap().visible);
    }
}
