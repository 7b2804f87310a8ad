use crate::constants::{
    DEFAULT_THUMB_WIDTH, THUMBNAIL_WIDTHS_KEEP_ASPECT, THUMBNAIL_WIDTHS_SQUARE,
};

/// Returns the entry of `widths` closest to `requested`.
///
/// Ties go to the entry listed first; the tables are sorted ascending, so an
/// equidistant request snaps to the smaller width.
///
/// # Arguments
/// * `requested` - Requested width in pixels; any value, including negative ones
/// * `widths` - Supported `(width, size code)` pairs, must not be empty
pub fn snap_width(requested: i64, widths: &'static [(u32, &'static str)]) -> (u32, &'static str) {
    widths
        .iter()
        .copied()
        .min_by_key(|(width, _)| i64::from(*width).abs_diff(requested))
        .unwrap_or((DEFAULT_THUMB_WIDTH, "100r"))
}

/// Supported thumbnail widths for the given aspect policy
pub fn widths_for(square: bool) -> &'static [(u32, &'static str)] {
    if square {
        THUMBNAIL_WIDTHS_SQUARE
    } else {
        THUMBNAIL_WIDTHS_KEEP_ASPECT
    }
}

/// Thumbnail width that always holds a value the service supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSize {
    width: u32,
    square: bool,
    code: &'static str,
}

impl Default for ThumbnailSize {
    fn default() -> Self {
        Self::new(i64::from(DEFAULT_THUMB_WIDTH), false)
    }
}

impl ThumbnailSize {
    pub fn new(requested: i64, square: bool) -> Self {
        let (width, code) = snap_width(requested, widths_for(square));
        Self {
            width,
            square,
            code,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn is_square(&self) -> bool {
        self.square
    }

    /// Size code sent as `thumbnail_size`, e.g. `"300r"`
    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn with_width(self, requested: i64) -> Self {
        Self::new(requested, self.square)
    }

    /// Switches the aspect policy and re-snaps the current width against the other table
    pub fn with_square(self, square: bool) -> Self {
        Self::new(i64::from(self.width), square)
    }
}
