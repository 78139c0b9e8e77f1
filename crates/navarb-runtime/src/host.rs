#![forbid(unsafe_code)]

//! Host boundary: the page the controller drives.
//!
//! [`ViewportHost`] exposes the live viewport, scroll position, and root
//! custom properties. [`NavigationSurface`] mounts and unmounts the concrete
//! desktop and mobile navigation components. The headless implementations
//! back both with a shared [`HeadlessDom`] so the conflict detector sees
//! exactly what the controller rendered.

use std::sync::{Arc, Mutex, MutexGuard};

use navarb_core::NavigationMode;
use navarb_registry::HeadlessDom;

use crate::error::{ComponentError, HostError};

/// Viewport and document-root side effects.
pub trait ViewportHost {
    /// Current inner width as the host measures it, if available.
    fn live_width(&self) -> Option<u32>;

    /// Current `(x, y)` scroll offset.
    fn scroll_offset(&self) -> (f64, f64);

    fn set_scroll_offset(&self, x: f64, y: f64) -> Result<(), HostError>;

    /// Set a custom property on the document root.
    fn set_css_var(&self, name: &str, value: &str) -> Result<(), HostError>;
}

/// Mounts concrete navigation components.
pub trait NavigationSurface {
    /// Mount a component of `kind` and return its id.
    fn mount(&self, kind: NavigationMode, route: &str, collapsed: bool) -> Result<String, ComponentError>;

    /// Remove a mounted component. Unknown ids are ignored.
    fn unmount(&self, id: &str);
}

#[derive(Debug, Default)]
struct ViewportInner {
    live_width: Option<u32>,
    scroll: (f64, f64),
    fail_scroll_writes: bool,
    fail_css_writes: bool,
}

/// In-memory viewport over a [`HeadlessDom`]. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct HeadlessViewport {
    dom: HeadlessDom,
    inner: Arc<Mutex<ViewportInner>>,
}

impl HeadlessViewport {
    #[must_use]
    pub fn new(dom: HeadlessDom) -> Self {
        Self {
            dom,
            inner: Arc::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewportInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[must_use]
    pub fn dom(&self) -> &HeadlessDom {
        &self.dom
    }

    /// Simulate the browser reporting a width.
    pub fn set_live_width(&self, width: Option<u32>) {
        self.lock().live_width = width;
    }

    /// Simulate the user scrolling.
    pub fn scroll_to(&self, x: f64, y: f64) {
        self.lock().scroll = (x, y);
    }

    /// Make programmatic scroll writes fail.
    pub fn fail_scroll_writes(&self, fail: bool) {
        self.lock().fail_scroll_writes = fail;
    }

    /// Make custom property writes fail.
    pub fn fail_css_writes(&self, fail: bool) {
        self.lock().fail_css_writes = fail;
    }
}

impl ViewportHost for HeadlessViewport {
    fn live_width(&self) -> Option<u32> {
        self.lock().live_width
    }

    fn scroll_offset(&self) -> (f64, f64) {
        self.lock().scroll
    }

    fn set_scroll_offset(&self, x: f64, y: f64) -> Result<(), HostError> {
        let mut inner = self.lock();
        if inner.fail_scroll_writes {
            return Err(HostError::new("set_scroll_offset", "scroll container detached"));
        }
        inner.scroll = (x, y);
        Ok(())
    }

    fn set_css_var(&self, name: &str, value: &str) -> Result<(), HostError> {
        if self.lock().fail_css_writes {
            return Err(HostError::new("set_css_var", "document root unavailable"));
        }
        self.dom.set_css_var(name, value);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SurfaceInner {
    next_id: u64,
    mounted: Vec<(String, NavigationMode, String)>,
    failing: Vec<NavigationMode>,
    fail_next: u32,
    mount_calls: u64,
}

/// In-memory component surface rendering tagged nodes into a [`HeadlessDom`].
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    dom: HeadlessDom,
    inner: Arc<Mutex<SurfaceInner>>,
}

impl HeadlessSurface {
    #[must_use]
    pub fn new(dom: HeadlessDom) -> Self {
        Self {
            dom,
            inner: Arc::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Every mount of `kind` fails until cleared.
    pub fn fail_kind(&self, kind: NavigationMode, fail: bool) {
        let mut inner = self.lock();
        inner.failing.retain(|k| *k != kind);
        if fail {
            inner.failing.push(kind);
        }
    }

    /// The next `count` mounts fail regardless of kind.
    pub fn fail_next_mounts(&self, count: u32) {
        self.lock().fail_next = count;
    }

    /// Mounted components as `(id, kind, route)`, in mount order.
    #[must_use]
    pub fn mounted(&self) -> Vec<(String, NavigationMode, String)> {
        self.lock().mounted.clone()
    }

    #[must_use]
    pub fn mount_calls(&self) -> u64 {
        self.lock().mount_calls
    }
}

impl NavigationSurface for HeadlessSurface {
    fn mount(&self, kind: NavigationMode, route: &str, _collapsed: bool) -> Result<String, ComponentError> {
        let id = {
            let mut inner = self.lock();
            inner.mount_calls += 1;
            if inner.fail_next > 0 {
                inner.fail_next -= 1;
                return Err(ComponentError::mount(kind, "injected mount failure"));
            }
            if inner.failing.contains(&kind) {
                return Err(ComponentError::mount(kind, "component unavailable"));
            }
            inner.next_id += 1;
            let id = format!("{kind}-nav-{}", inner.next_id);
            inner.mounted.push((id.clone(), kind, route.to_owned()));
            id
        };
        self.dom.insert_node(&id, kind);
        Ok(id)
    }

    fn unmount(&self, id: &str) {
        self.lock().mounted.retain(|(mounted, _, _)| mounted != id);
        self.dom.remove_node(id);
    }
}
