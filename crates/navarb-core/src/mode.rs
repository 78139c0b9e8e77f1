#![forbid(unsafe_code)]

//! Navigation mode and the single-threshold breakpoint policy.
//!
//! # Invariants
//!
//! 1. There are exactly two modes.
//! 2. `mode_for(w) == Desktop` iff `w >= threshold` (inclusive on the desktop side).
//! 3. The "exact boundary" flag never influences the mode; it exists for diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default navigation breakpoint in CSS pixels.
pub const DEFAULT_BREAKPOINT_PX: u32 = 1024;

/// Default distance from the threshold that counts as an exact boundary hit.
pub const DEFAULT_BOUNDARY_TOLERANCE_PX: u32 = 5;

/// The navigation regime derived from viewport width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationMode {
    /// Persistent sidebar.
    Desktop,
    /// Drawer and bottom bar.
    Mobile,
}

impl NavigationMode {
    /// Both modes, desktop first.
    pub const ALL: [Self; 2] = [Self::Desktop, Self::Mobile];

    /// Stable string used in logs and exported payloads.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
        }
    }

    /// The other mode.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Desktop => Self::Mobile,
            Self::Mobile => Self::Desktop,
        }
    }

    /// Parse a mode name. Unknown names yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "desktop" | "sidebar" => Some(Self::Desktop),
            "mobile" => Some(Self::Mobile),
            _ => None,
        }
    }
}

impl fmt::Display for NavigationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a viewport width to a [`NavigationMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointPolicy {
    /// Widths at or above this value are desktop.
    pub threshold: u32,
    /// Widths within this distance of `threshold` are flagged as exact boundary.
    pub boundary_tolerance: u32,
}

impl Default for BreakpointPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_BREAKPOINT_PX,
            boundary_tolerance: DEFAULT_BOUNDARY_TOLERANCE_PX,
        }
    }
}

impl BreakpointPolicy {
    /// Policy with a custom threshold and the default boundary tolerance.
    #[must_use]
    pub const fn with_threshold(threshold: u32) -> Self {
        Self {
            threshold,
            boundary_tolerance: DEFAULT_BOUNDARY_TOLERANCE_PX,
        }
    }

    /// Compute the mode for a width.
    #[must_use]
    pub const fn mode_for(&self, width: u32) -> NavigationMode {
        if width >= self.threshold {
            NavigationMode::Desktop
        } else {
            NavigationMode::Mobile
        }
    }

    /// Whether `width` sits within the boundary tolerance of the threshold.
    #[must_use]
    pub const fn is_exact_boundary(&self, width: u32) -> bool {
        width.abs_diff(self.threshold) <= self.boundary_tolerance
    }
}
