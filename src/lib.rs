//! A dockable, tab-multiplexed panel layout engine for terminal dashboards.
//!
//! The engine manages a binary tree of splits whose leaves each host a strip
//! of tabbed panes. Tabs can be dragged between leaves (merging as tabs or
//! splitting off new panes), dividers can be dragged to resize, and the whole
//! arrangement round-trips through a versioned JSON record with a debounced
//! file store.

pub mod dock;
pub mod layout;
pub mod persist;
pub mod tracing_sub;

pub use dock::{DockManager, DropTarget, PaneContent};
pub use layout::tree::{
    LayoutNode, LeafId, LeafIdGen, SplitDirection, WindowKey, default_layout, is_valid_layout,
};
pub use layout::zones::DropZone;
pub use persist::{LayoutRecord, LayoutStore, SCHEMA_VERSION};
