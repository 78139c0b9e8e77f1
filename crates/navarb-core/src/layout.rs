#![forbid(unsafe_code)]

//! Content-area spacing expressed as CSS custom properties.
//!
//! The enclosing page layout re-flows its content area from four custom
//! properties. [`LayoutVars::compute`] derives them from the mode and the
//! sidebar collapse state; the conflict detector uses
//! [`LayoutMetrics::expected_margin_left`] to spot a stale layout.

use serde::{Deserialize, Serialize};

use crate::mode::NavigationMode;

pub const SIDEBAR_WIDTH_VAR: &str = "--sidebar-width";
pub const CONTENT_MARGIN_LEFT_VAR: &str = "--content-margin-left";
pub const MOBILE_HEADER_HEIGHT_VAR: &str = "--mobile-header-height";
pub const MOBILE_BOTTOM_NAV_HEIGHT_VAR: &str = "--mobile-bottom-nav-height";

/// Pixel dimensions of the concrete navigation chrome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutMetrics {
    pub sidebar_width: f64,
    pub sidebar_collapsed_width: f64,
    pub mobile_header_height: f64,
    pub mobile_bottom_nav_height: f64,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            sidebar_width: 256.0,
            sidebar_collapsed_width: 64.0,
            mobile_header_height: 56.0,
            mobile_bottom_nav_height: 64.0,
        }
    }
}

impl LayoutMetrics {
    /// Sidebar width for the given collapse state.
    #[must_use]
    pub fn sidebar_width_for(&self, collapsed: bool) -> f64 {
        if collapsed {
            self.sidebar_collapsed_width
        } else {
            self.sidebar_width
        }
    }

    /// Content margin-left implied by `mode`.
    #[must_use]
    pub fn expected_margin_left(&self, mode: NavigationMode, collapsed: bool) -> f64 {
        match mode {
            NavigationMode::Desktop => self.sidebar_width_for(collapsed),
            NavigationMode::Mobile => 0.0,
        }
    }
}

/// Resolved custom property values, in application order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutVars {
    pub sidebar_width: f64,
    pub content_margin_left: f64,
    pub mobile_header_height: f64,
    pub mobile_bottom_nav_height: f64,
}

impl LayoutVars {
    #[must_use]
    pub fn compute(metrics: &LayoutMetrics, mode: NavigationMode, collapsed: bool) -> Self {
        match mode {
            NavigationMode::Desktop => {
                let width = metrics.sidebar_width_for(collapsed);
                Self {
                    sidebar_width: width,
                    content_margin_left: width,
                    mobile_header_height: 0.0,
                    mobile_bottom_nav_height: 0.0,
                }
            }
            NavigationMode::Mobile => Self {
                sidebar_width: 0.0,
                content_margin_left: 0.0,
                mobile_header_height: metrics.mobile_header_height,
                mobile_bottom_nav_height: metrics.mobile_bottom_nav_height,
            },
        }
    }

    /// `(name, value)` pairs formatted as CSS pixel lengths.
    #[must_use]
    pub fn css_properties(&self) -> [(&'static str, String); 4] {
        [
            (SIDEBAR_WIDTH_VAR, px(self.sidebar_width)),
            (CONTENT_MARGIN_LEFT_VAR, px(self.content_margin_left)),
            (MOBILE_HEADER_HEIGHT_VAR, px(self.mobile_header_height)),
            (MOBILE_BOTTOM_NAV_HEIGHT_VAR, px(self.mobile_bottom_nav_height)),
        ]
    }
}

fn px(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}px", value as i64)
    } else {
        format!("{value}px")
    }
}
