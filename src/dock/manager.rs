use std::collections::BTreeMap;

use crossterm::event::{Event, MouseButton, MouseEvent, MouseEventKind};
use ratatui::Frame;
use ratatui::prelude::Rect;
use ratatui::style::{Color, Modifier, Style};

use super::PaneContent;
use super::drag::{DividerDrag, DragSession, DropTarget, TabDrag};
use super::regions::{DividerRegion, LeafRegion, compute_regions};
use crate::layout::rect_contains;
use crate::layout::tree::{
    LayoutNode, LeafId, LeafIdGen, SplitDirection, WindowKey, clamp_ratio, default_layout,
};
use crate::layout::zones::{DropZone, classify_drop, zone_rect};
use crate::persist::LayoutRecord;

/// The layout tree manager: arranges registered panes into a resizable,
/// tab-multiplexed, drag-to-dock tree of splits and leaves.
///
/// The engine owns the tree; pane contents stay externally owned and are
/// only borrowed into whichever leaf currently hosts them. All mutation is
/// synchronous inside either a public operation or a pointer-event callback.
pub struct DockManager {
    registry: BTreeMap<WindowKey, Box<dyn PaneContent>>,
    title_resolver: Box<dyn Fn(&WindowKey) -> String>,
    on_layout_change: Option<Box<dyn FnMut(&LayoutRecord)>>,
    on_resize: Option<Box<dyn FnMut()>>,
    anchor: WindowKey,
    layout: Option<LayoutNode>,
    ids: LeafIdGen,
    focused_leaf: Option<LeafId>,
    drag: Option<DragSession>,
    leaf_regions: Vec<LeafRegion>,
    divider_regions: Vec<DividerRegion>,
    /// Which leaf hosted each visible pane on the last render, for
    /// attach/detach notifications when hosting moves.
    hosted: BTreeMap<WindowKey, LeafId>,
}

impl DockManager {
    /// `anchor` is the one window guaranteed to stay present in the tree.
    pub fn new(anchor: impl Into<WindowKey>) -> Self {
        Self {
            registry: BTreeMap::new(),
            title_resolver: Box::new(|key: &WindowKey| key.as_str().to_string()),
            on_layout_change: None,
            on_resize: None,
            anchor: anchor.into(),
            layout: None,
            ids: LeafIdGen::new(),
            focused_leaf: None,
            drag: None,
            leaf_regions: Vec::new(),
            divider_regions: Vec::new(),
            hosted: BTreeMap::new(),
        }
    }

    /// Hand a pane over for hosting. The engine never drops it; `destroy`
    /// detaches it back to the caller's control.
    pub fn register(&mut self, key: impl Into<WindowKey>, content: Box<dyn PaneContent>) {
        self.registry.insert(key.into(), content);
    }

    pub fn set_title_resolver(&mut self, resolver: impl Fn(&WindowKey) -> String + 'static) {
        self.title_resolver = Box::new(resolver);
    }

    /// Invoked after every committed mutation with the serialized layout.
    pub fn set_on_layout_change(&mut self, hook: impl FnMut(&LayoutRecord) + 'static) {
        self.on_layout_change = Some(Box::new(hook));
    }

    /// Invoked after every render pass so consumers can recompute geometry.
    pub fn set_on_resize(&mut self, hook: impl FnMut() + 'static) {
        self.on_resize = Some(Box::new(hook));
    }

    pub fn anchor(&self) -> &WindowKey {
        &self.anchor
    }

    pub fn layout(&self) -> Option<&LayoutNode> {
        self.layout.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.layout.is_some()
    }

    pub fn focused_leaf(&self) -> Option<LeafId> {
        self.focused_leaf
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The drop candidate currently highlighted by a live tab drag.
    pub fn drop_target(&self) -> Option<DropTarget> {
        match &self.drag {
            Some(DragSession::Tab(tab)) => tab.target,
            _ => None,
        }
    }

    /// Leaf geometry from the last render pass.
    pub fn leaf_regions(&self) -> &[LeafRegion] {
        &self.leaf_regions
    }

    /// Divider geometry from the last render pass.
    pub fn divider_regions(&self) -> &[DividerRegion] {
        &self.divider_regions
    }

    /// Adopt `layout` as the current tree. Persisted ratios are clamped,
    /// broken active pointers repaired, and the anchor guaranteed present.
    pub fn mount(&mut self, mut layout: LayoutNode) {
        self.ids.seed_from(&layout);
        layout.normalize();
        layout.collapse_empty_leaves(&self.anchor);
        tracing::debug!(leaves = layout.leaf_count(), "mounted workspace layout");
        self.layout = Some(layout);
        self.drag = None;
    }

    /// Mount the canonical default arrangement (anchor left, up to two
    /// companions stacked right).
    pub fn mount_default(&mut self, companions: &[WindowKey]) {
        let layout = default_layout(&mut self.ids, &self.anchor, companions);
        self.mount(layout);
    }

    /// Tear the engine down: every hosted pane is detached back to its
    /// owner, listeners and drag state are released. Contents are not
    /// dropped; the registry still holds them for the caller.
    pub fn destroy(&mut self) {
        self.drag = None;
        for (key, _leaf) in std::mem::take(&mut self.hosted) {
            if let Some(content) = self.registry.get_mut(&key) {
                content.detached();
            }
        }
        self.layout = None;
        self.focused_leaf = None;
        self.leaf_regions.clear();
        self.divider_regions.clear();
    }

    /// Versioned snapshot of the current tree, or `None` before `mount`.
    pub fn serialize(&self) -> Option<LayoutRecord> {
        self.layout.as_ref().map(LayoutRecord::capture)
    }

    pub fn open_windows(&self) -> Vec<WindowKey> {
        self.layout
            .as_ref()
            .map(|layout| layout.collect_window_keys().into_iter().collect())
            .unwrap_or_default()
    }

    /// Open `key` in the focused leaf (or activate it in place if already
    /// open). Silently ignored for unregistered keys and for the anchor.
    pub fn add_window(&mut self, key: &WindowKey) {
        if !self.registry.contains_key(key) {
            tracing::debug!(window = %key, "add_window ignored: not registered");
            return;
        }
        if *key == self.anchor {
            return;
        }
        let Some(layout) = self.layout.as_mut() else {
            return;
        };

        if let Some(path) = layout.find_leaf_containing(key) {
            if let Some(LayoutNode::Leaf { id, active, .. }) = layout.node_at_path_mut(&path) {
                *active = Some(key.clone());
                self.focused_leaf = Some(*id);
            }
        } else {
            let path = self
                .focused_leaf
                .and_then(|leaf| layout.find_leaf(leaf))
                .unwrap_or_else(|| layout.first_leaf_path());
            if let Some(LayoutNode::Leaf { id, tabs, active }) = layout.node_at_path_mut(&path) {
                tabs.push(key.clone());
                *active = Some(key.clone());
                self.focused_leaf = Some(*id);
            }
        }
        self.emit_change();
    }

    /// Close `key`'s tab wherever it lives. The anchor cannot be removed.
    pub fn remove_window(&mut self, key: &WindowKey) {
        if *key == self.anchor {
            return;
        }
        let anchor = self.anchor.clone();
        let Some(layout) = self.layout.as_mut() else {
            return;
        };
        let Some(path) = layout.find_leaf_containing(key) else {
            return;
        };
        if let Some(LayoutNode::Leaf { tabs, active, .. }) = layout.node_at_path_mut(&path) {
            tabs.retain(|tab| tab != key);
            if active.as_ref() == Some(key) {
                *active = tabs.first().cloned();
            }
        }
        layout.collapse_empty_leaves(&anchor);

        if self.hosted.remove(key).is_some()
            && let Some(content) = self.registry.get_mut(key)
        {
            content.detached();
        }
        self.emit_change();
    }

    /// Replace the whole tree (e.g. when the caller restores a preset).
    pub fn set_layout(&mut self, layout: LayoutNode) {
        self.mount(layout);
        self.emit_change();
    }

    /// Commit a dock operation: relocate `window` from `source` onto
    /// `target` at `zone`. Both leaves are re-resolved by id at commit time;
    /// if either has vanished since the drag started the dock aborts
    /// silently. Returns whether the tree was mutated.
    pub fn dock(
        &mut self,
        window: &WindowKey,
        source: LeafId,
        target: LeafId,
        zone: DropZone,
    ) -> bool {
        let anchor = self.anchor.clone();
        let Some(layout) = self.layout.as_mut() else {
            return false;
        };
        let Some(source_path) = layout.find_leaf(source) else {
            tracing::debug!(?source, "dock aborted: source leaf vanished");
            return false;
        };
        if layout.find_leaf(target).is_none() {
            tracing::debug!(?target, "dock aborted: target leaf vanished");
            return false;
        }

        if source == target && zone == DropZone::Center {
            // Re-affirm the dragged tab as active; no structural change.
            if let Some(LayoutNode::Leaf { tabs, active, .. }) =
                layout.node_at_path_mut(&source_path)
                && tabs.contains(window)
            {
                *active = Some(window.clone());
            }
            self.focused_leaf = Some(target);
            self.emit_change();
            return true;
        }

        // Pull the window out of its source leaf.
        if let Some(LayoutNode::Leaf { tabs, active, .. }) = layout.node_at_path_mut(&source_path)
        {
            tabs.retain(|tab| tab != window);
            if active.as_ref() == Some(window) {
                *active = tabs.first().cloned();
            }
        }

        let Some(target_path) = layout.find_leaf(target) else {
            return false;
        };
        match zone {
            DropZone::Center => {
                if let Some(LayoutNode::Leaf { id, tabs, active }) =
                    layout.node_at_path_mut(&target_path)
                {
                    if !tabs.contains(window) {
                        tabs.push(window.clone());
                    }
                    *active = Some(window.clone());
                    self.focused_leaf = Some(*id);
                }
            }
            zone => {
                // Covers the same-leaf edge-split: the target may still
                // hold the window.
                if let Some(LayoutNode::Leaf { tabs, active, .. }) =
                    layout.node_at_path_mut(&target_path)
                {
                    tabs.retain(|tab| tab != window);
                    if active.as_ref() == Some(window) {
                        *active = tabs.first().cloned();
                    }
                }

                let Some(direction) = zone.split_direction() else {
                    return false;
                };
                let fresh_id = self.ids.mint();
                let fresh = LayoutNode::Leaf {
                    id: fresh_id,
                    tabs: vec![window.clone()],
                    active: Some(window.clone()),
                };

                let Some(slot) = layout.node_at_path_mut(&target_path) else {
                    return false;
                };
                let old = std::mem::replace(slot, LayoutNode::hollow());
                let (first, second) = if zone.places_before() {
                    (fresh, old)
                } else {
                    (old, fresh)
                };
                // An empty target path means the target was the root; the
                // new split simply becomes the new root.
                *slot = LayoutNode::split(direction, 0.5, first, second);
                self.focused_leaf = Some(fresh_id);
            }
        }

        layout.collapse_empty_leaves(&anchor);
        tracing::debug!(window = %window, ?zone, "dock committed");
        self.emit_change();
        true
    }

    /// Feed a terminal event through the drag state machine. Returns `true`
    /// when the engine owns the gesture; unconsumed events should be
    /// forwarded to pane contents by the caller.
    pub fn handle_event(&mut self, event: &Event) -> bool {
        match event {
            Event::Mouse(mouse) => self.handle_mouse(*mouse),
            // Lost pointer capture cancels the gesture without mutating.
            Event::FocusLost => {
                if self.drag.take().is_some() {
                    tracing::debug!("drag cancelled: focus lost");
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.on_press(mouse.column, mouse.row),
            MouseEventKind::Drag(MouseButton::Left) => self.on_move(mouse.column, mouse.row),
            MouseEventKind::Up(MouseButton::Left) => self.on_release(mouse.column, mouse.row),
            _ => false,
        }
    }

    fn on_press(&mut self, column: u16, row: u16) -> bool {
        if self.layout.is_none() {
            return false;
        }
        // Unconditionally tear down any stale session before starting over.
        self.drag = None;

        if let Some(divider) = self
            .divider_regions
            .iter()
            .rev()
            .find(|divider| rect_contains(divider.rect, column, row))
        {
            self.drag = Some(DragSession::Divider(DividerDrag {
                path: divider.path.clone(),
                direction: divider.direction,
                container: divider.container,
            }));
            return true;
        }

        let Some(region) = self
            .leaf_regions
            .iter()
            .rev()
            .find(|region| rect_contains(region.full, column, row))
        else {
            return false;
        };
        let leaf = region.leaf;
        let tab = region
            .tab_hits
            .iter()
            .find(|(_, rect)| rect_contains(*rect, column, row))
            .cloned();
        self.focused_leaf = Some(leaf);

        if let Some((window, pressed_rect)) = tab {
            self.drag = Some(DragSession::Tab(TabDrag {
                window,
                source_leaf: leaf,
                target: None,
                pressed_rect,
            }));
            return true;
        }
        // A body press only moves focus; the content may still want it.
        false
    }

    fn on_move(&mut self, column: u16, row: u16) -> bool {
        match self.drag.as_mut() {
            Some(DragSession::Divider(divider)) => {
                let (offset, extent) = match divider.direction {
                    SplitDirection::Row => (
                        column.saturating_sub(divider.container.x),
                        divider.container.width,
                    ),
                    SplitDirection::Column => (
                        row.saturating_sub(divider.container.y),
                        divider.container.height,
                    ),
                };
                if extent == 0 {
                    return true;
                }
                let ratio = clamp_ratio(f32::from(offset) / f32::from(extent));
                let path = divider.path.clone();
                if let Some(layout) = self.layout.as_mut()
                    && let Some(LayoutNode::Split { ratio: slot, .. }) =
                        layout.node_at_path_mut(&path)
                {
                    *slot = ratio;
                }
                true
            }
            Some(DragSession::Tab(tab)) => {
                // Topmost rendered leaf under the pointer, if any.
                let Some(region) = self
                    .leaf_regions
                    .iter()
                    .rev()
                    .find(|region| rect_contains(region.full, column, row))
                else {
                    tab.target = None;
                    return true;
                };

                if region.leaf == tab.source_leaf {
                    let source_tabs = self
                        .layout
                        .as_ref()
                        .and_then(|layout| {
                            let path = layout.find_leaf(tab.source_leaf)?;
                            match layout.node_at_path(&path) {
                                Some(LayoutNode::Leaf { tabs, .. }) => Some(tabs.len()),
                                _ => None,
                            }
                        })
                        .unwrap_or(0);
                    // A leaf's only tab has no legal drop on its own leaf.
                    if source_tabs <= 1 {
                        tab.target = None;
                        return true;
                    }
                }

                let over_tabs = rect_contains(region.tabs, column, row);
                let zone = classify_drop(region.full, column, row, over_tabs);
                if region.leaf == tab.source_leaf && zone == DropZone::Center {
                    tab.target = None;
                    return true;
                }
                tab.target = Some(DropTarget {
                    leaf: region.leaf,
                    zone,
                });
                true
            }
            None => false,
        }
    }

    fn on_release(&mut self, column: u16, row: u16) -> bool {
        match self.drag.take() {
            Some(DragSession::Divider(_)) => {
                // Ratio updates were applied live; releasing just persists.
                self.emit_change();
                true
            }
            Some(DragSession::Tab(tab)) => {
                if let Some(target) = tab.target {
                    self.dock(&tab.window, tab.source_leaf, target.leaf, target.zone);
                } else if rect_contains(tab.pressed_rect, column, row) {
                    self.activate_tab(&tab.window, tab.source_leaf);
                }
                true
            }
            None => false,
        }
    }

    fn activate_tab(&mut self, window: &WindowKey, leaf: LeafId) {
        let Some(layout) = self.layout.as_mut() else {
            return;
        };
        let Some(path) = layout.find_leaf(leaf) else {
            return;
        };
        let Some(LayoutNode::Leaf { tabs, active, .. }) = layout.node_at_path_mut(&path) else {
            return;
        };
        if !tabs.contains(window) {
            return;
        }
        self.focused_leaf = Some(leaf);
        if active.as_ref() == Some(window) {
            return;
        }
        *active = Some(window.clone());
        self.emit_change();
    }

    /// The active tab of the focused leaf, if any.
    pub fn focused_window(&self) -> Option<WindowKey> {
        let layout = self.layout.as_ref()?;
        let path = layout.find_leaf(self.focused_leaf?)?;
        match layout.node_at_path(&path) {
            Some(LayoutNode::Leaf { active, .. }) => active.clone(),
            _ => None,
        }
    }

    /// Forward an event to the focused pane's content.
    pub fn handle_content_event(&mut self, event: &Event) -> bool {
        let Some(window) = self.focused_window() else {
            return false;
        };
        match self.registry.get_mut(&window) {
            Some(content) => content.handle_event(event),
            None => false,
        }
    }

    /// Full render pass: geometry, chrome, content hosting, hooks.
    pub fn render(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let Some(layout) = self.layout.as_mut() else {
            return;
        };
        layout.normalize();
        let (leaves, dividers) = compute_regions(layout, area, self.title_resolver.as_ref());
        self.leaf_regions = leaves;
        self.divider_regions = dividers;

        self.draw_chrome(frame);
        self.reconcile_hosting();
        self.draw_contents(frame);
        self.emit_resize();
    }

    fn draw_chrome(&self, frame: &mut Frame<'_>) {
        let drop = self.drop_target();
        let buf = frame.buffer_mut();

        for divider in &self.divider_regions {
            let symbol = match divider.direction {
                SplitDirection::Row => "│",
                SplitDirection::Column => "─",
            };
            let style = Style::default().fg(Color::DarkGray);
            for y in divider.rect.y..divider.rect.y.saturating_add(divider.rect.height) {
                for x in divider.rect.x..divider.rect.x.saturating_add(divider.rect.width) {
                    if let Some(cell) = buf.cell_mut((x, y)) {
                        cell.set_symbol(symbol);
                        cell.set_style(style);
                    }
                }
            }
        }

        for region in &self.leaf_regions {
            let focused = self.focused_leaf == Some(region.leaf);
            for (key, rect) in &region.tab_hits {
                let is_active = region.active.as_ref() == Some(key);
                let style = match (is_active, focused) {
                    (true, true) => Style::default()
                        .add_modifier(Modifier::REVERSED)
                        .add_modifier(Modifier::BOLD),
                    (true, false) => Style::default().add_modifier(Modifier::REVERSED),
                    _ => Style::default().add_modifier(Modifier::DIM),
                };
                let label = format!(" {} ", (self.title_resolver)(key));
                buf.set_stringn(rect.x, rect.y, label, rect.width as usize, style);
            }

            if let Some(target) = drop
                && target.leaf == region.leaf
            {
                let highlight = zone_rect(region.content, target.zone);
                buf.set_style(highlight, Style::default().bg(Color::Blue));
            }
        }
    }

    /// Move panes between leaves without rebuilding them: only hosting
    /// changes produce attach/detach notifications.
    fn reconcile_hosting(&mut self) {
        let mut desired: BTreeMap<WindowKey, LeafId> = BTreeMap::new();
        for region in &self.leaf_regions {
            if let Some(active) = &region.active {
                desired.insert(active.clone(), region.leaf);
            }
        }

        let previous = std::mem::take(&mut self.hosted);
        for (key, leaf) in &previous {
            if desired.get(key) != Some(leaf)
                && let Some(content) = self.registry.get_mut(key)
            {
                content.detached();
            }
        }
        for (key, leaf) in &desired {
            if previous.get(key) != Some(leaf)
                && let Some(content) = self.registry.get_mut(key)
            {
                content.attached(*leaf);
            }
        }
        self.hosted = desired;
    }

    fn draw_contents(&mut self, frame: &mut Frame<'_>) {
        let focused_leaf = self.focused_leaf;
        for region in &self.leaf_regions {
            let Some(active) = &region.active else {
                continue;
            };
            if let Some(content) = self.registry.get_mut(active) {
                content.render(frame, region.content, focused_leaf == Some(region.leaf));
            }
        }
    }

    fn emit_change(&mut self) {
        let Some(layout) = self.layout.as_ref() else {
            return;
        };
        if let Some(hook) = self.on_layout_change.as_mut() {
            let record = LayoutRecord::capture(layout);
            hook(&record);
        }
    }

    fn emit_resize(&mut self) {
        if let Some(hook) = self.on_resize.as_mut() {
            hook();
        }
    }
}
