use ratatui::prelude::Rect;
use serde::{Deserialize, Serialize};

use super::tree::SplitDirection;

/// One of the five docking regions a leaf's rendered area is partitioned
/// into while a tab is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropZone {
    Left,
    Top,
    Center,
    Right,
    Bottom,
}

impl DropZone {
    /// The split axis an edge drop produces. `Center` merges instead.
    pub fn split_direction(self) -> Option<SplitDirection> {
        match self {
            Self::Left | Self::Right => Some(SplitDirection::Row),
            Self::Top | Self::Bottom => Some(SplitDirection::Column),
            Self::Center => None,
        }
    }

    /// Whether the freshly created leaf lands before the existing one.
    pub fn places_before(self) -> bool {
        matches!(self, Self::Left | Self::Top)
    }
}

/// Classify a pointer position against a leaf's rendered rectangle.
///
/// Over the tab strip the answer is always `Center`: dropping onto another
/// leaf's tab row merges as a new tab, never splits. Otherwise the rect is
/// cut into a "+"-shaped hit map at 25%/75% with a deliberately large middle
/// region, so ties favor merge over split.
pub fn classify_drop(rect: Rect, column: u16, row: u16, over_tabs: bool) -> DropZone {
    if over_tabs {
        return DropZone::Center;
    }
    if rect.width == 0 || rect.height == 0 {
        return DropZone::Center;
    }
    let rel_x = f32::from(column.saturating_sub(rect.x)) / f32::from(rect.width);
    let rel_y = f32::from(row.saturating_sub(rect.y)) / f32::from(rect.height);
    if rel_x < 0.25 {
        DropZone::Left
    } else if rel_x > 0.75 {
        DropZone::Right
    } else if rel_y < 0.25 {
        DropZone::Top
    } else if rel_y > 0.75 {
        DropZone::Bottom
    } else {
        DropZone::Center
    }
}

/// The sub-rectangle to highlight for a zone, used by the drop overlay.
pub fn zone_rect(rect: Rect, zone: DropZone) -> Rect {
    let quarter_w = rect.width / 4;
    let quarter_h = rect.height / 4;
    match zone {
        DropZone::Left => Rect {
            width: quarter_w,
            ..rect
        },
        DropZone::Right => Rect {
            x: rect.x + rect.width - quarter_w,
            width: quarter_w,
            ..rect
        },
        DropZone::Top => Rect {
            height: quarter_h,
            ..rect
        },
        DropZone::Bottom => Rect {
            y: rect.y + rect.height - quarter_h,
            height: quarter_h,
            ..rect
        },
        DropZone::Center => Rect {
            x: rect.x + quarter_w,
            y: rect.y + quarter_h,
            width: rect.width - 2 * quarter_w,
            height: rect.height - 2 * quarter_h,
        },
    }
}
