mod drag;
mod manager;
pub mod regions;

pub use drag::DropTarget;
pub use manager::DockManager;

use crossterm::event::Event;
use ratatui::Frame;
use ratatui::prelude::Rect;

use crate::layout::tree::LeafId;

/// Externally owned pane content hosted inside a leaf.
///
/// The engine never creates or destroys contents; it borrows them from the
/// registry and decides which leaf currently hosts each one. Re-hosting a
/// pane into another leaf moves it, so any internal state (scroll position,
/// zoom transform, simulation state) survives docking.
pub trait PaneContent {
    /// Draw into the leaf's content rectangle.
    fn render(&mut self, frame: &mut Frame<'_>, area: Rect, focused: bool);

    /// Offer an input event; return `true` when consumed.
    fn handle_event(&mut self, _event: &Event) -> bool {
        false
    }

    /// The pane became the visible tab of `leaf` (first mount or re-dock).
    fn attached(&mut self, _leaf: LeafId) {}

    /// The pane stopped being visible (tab switched away, removed, or the
    /// engine was torn down). Its state must be kept for the next attach.
    fn detached(&mut self) {}
}
