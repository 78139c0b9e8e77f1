#![forbid(unsafe_code)]

//! Viewport samples captured from resize and orientation callbacks.

use serde::{Deserialize, Serialize};

/// Device orientation derived from the sample's aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Landscape when `width >= height`.
    #[must_use]
    pub const fn from_dimensions(width: u32, height: u32) -> Self {
        if width >= height {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }
}

/// Immutable snapshot of the viewport at one callback.
///
/// Samples are superseded, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSample {
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    /// Host monotonic time in milliseconds.
    pub timestamp_ms: u64,
}

impl ViewportSample {
    #[must_use]
    pub const fn new(width: u32, height: u32, timestamp_ms: u64) -> Self {
        Self {
            width,
            height,
            orientation: Orientation::from_dimensions(width, height),
            timestamp_ms,
        }
    }

    /// Whether width and height match `other` (timestamps ignored).
    #[must_use]
    pub const fn same_dimensions(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }
}
