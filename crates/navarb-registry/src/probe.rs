#![forbid(unsafe_code)]

//! Rendered-output probe.
//!
//! The registry records what components *claim*; the probe reports what is
//! actually rendered. [`HeadlessDom`] is an in-memory probe for hosts without
//! a real document (tests, the replay harness).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use navarb_core::NavigationMode;
use navarb_core::layout::CONTENT_MARGIN_LEFT_VAR;
use serde::{Deserialize, Serialize};

/// A rendered node tagged with a navigation kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeNode {
    pub id: String,
    pub kind: NavigationMode,
    pub visible: bool,
    /// Hidden by conflict resolution. Such nodes are never re-flagged.
    pub conflict_hidden: bool,
}

impl ProbeNode {
    /// Visible and not already hidden by a resolution pass.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.visible && !self.conflict_hidden
    }
}

/// Read access to rendered navigation, plus the one mutation resolution needs.
pub trait VisibilityProbe {
    /// Visibility of the node with `id`; `None` when no such node exists.
    fn is_visible(&self, id: &str) -> Option<bool>;

    /// Every rendered node tagged with a navigation kind.
    fn tagged_nodes(&self) -> Vec<ProbeNode>;

    /// Hide the node and mark it conflict-hidden. Returns whether it existed.
    fn hide(&self, id: &str) -> bool;

    /// Computed left margin of the content area, if measurable.
    fn content_margin_left(&self) -> Option<f64>;
}

#[derive(Debug, Default)]
struct DomInner {
    nodes: BTreeMap<String, ProbeNode>,
    css_vars: BTreeMap<String, String>,
    margin_override: Option<f64>,
}

/// In-memory document. Clones share the same tree.
#[derive(Debug, Clone, Default)]
pub struct HeadlessDom {
    inner: Arc<Mutex<DomInner>>,
}

fn parse_px(value: &str) -> Option<f64> {
    value.trim().trim_end_matches("px").trim().parse().ok()
}

impl HeadlessDom {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, DomInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Render a visible node tagged with `kind`.
    pub fn insert_node(&self, id: &str, kind: NavigationMode) {
        self.lock().nodes.insert(
            id.to_owned(),
            ProbeNode {
                id: id.to_owned(),
                kind,
                visible: true,
                conflict_hidden: false,
            },
        );
    }

    pub fn remove_node(&self, id: &str) -> bool {
        self.lock().nodes.remove(id).is_some()
    }

    pub fn set_visible(&self, id: &str, visible: bool) {
        if let Some(node) = self.lock().nodes.get_mut(id) {
            node.visible = visible;
        }
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<ProbeNode> {
        self.lock().nodes.get(id).cloned()
    }

    /// Set a custom property on the document root.
    pub fn set_css_var(&self, name: &str, value: &str) {
        self.lock().css_vars.insert(name.to_owned(), value.to_owned());
    }

    #[must_use]
    pub fn css_var(&self, name: &str) -> Option<String> {
        self.lock().css_vars.get(name).cloned()
    }

    #[must_use]
    pub fn css_vars(&self) -> BTreeMap<String, String> {
        self.lock().css_vars.clone()
    }

    /// Force the measured content margin, simulating stale page layout.
    /// `None` returns to deriving it from `--content-margin-left`.
    pub fn override_content_margin_left(&self, margin: Option<f64>) {
        self.lock().margin_override = margin;
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.nodes.clear();
        inner.css_vars.clear();
        inner.margin_override = None;
    }
}

impl VisibilityProbe for HeadlessDom {
    fn is_visible(&self, id: &str) -> Option<bool> {
        self.lock().nodes.get(id).map(ProbeNode::is_live)
    }

    fn tagged_nodes(&self) -> Vec<ProbeNode> {
        self.lock().nodes.values().cloned().collect()
    }

    fn hide(&self, id: &str) -> bool {
        match self.lock().nodes.get_mut(id) {
            Some(node) => {
                node.visible = false;
                node.conflict_hidden = true;
                true
            }
            None => false,
        }
    }

    fn content_margin_left(&self) -> Option<f64> {
        let inner = self.lock();
        inner.margin_override.or_else(|| {
            inner
                .css_vars
                .get(CONTENT_MARGIN_LEFT_VAR)
                .and_then(|v| parse_px(v))
        })
    }
}
