use ratatui::prelude::Rect;

use crate::layout::tree::{LeafId, NodePath, SplitDirection, WindowKey};
use crate::layout::zones::DropZone;

/// The single highlighted drop candidate of a live tab drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropTarget {
    pub leaf: LeafId,
    pub zone: DropZone,
}

/// A tab being dragged toward a new home. Created on pointer-down over a tab
/// handle; the tree is not touched until the gesture commits.
#[derive(Debug, Clone)]
pub(crate) struct TabDrag {
    pub window: WindowKey,
    pub source_leaf: LeafId,
    pub target: Option<DropTarget>,
    /// Where the press landed; a release inside it with no drop target is a
    /// plain click and activates the tab.
    pub pressed_rect: Rect,
}

/// A divider being dragged along its split axis. Pure numeric ratio update,
/// no tree restructuring.
#[derive(Debug, Clone)]
pub(crate) struct DividerDrag {
    pub path: NodePath,
    pub direction: SplitDirection,
    pub container: Rect,
}

/// At most one gesture is live at a time; starting a new one tears the
/// previous session down unconditionally.
#[derive(Debug, Clone)]
pub(crate) enum DragSession {
    Tab(TabDrag),
    Divider(DividerDrag),
}
