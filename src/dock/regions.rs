use ratatui::prelude::Rect;

use crate::layout::tree::{
    LayoutNode, LeafId, NodePath, Slot, SplitDirection, WindowKey, clamp_ratio,
};

pub const TAB_STRIP_HEIGHT: u16 = 1;
pub const DIVIDER_THICKNESS: u16 = 1;

/// Rendered geometry of one leaf: where its tab strip, body, and individual
/// tab handles landed on screen. Recomputed on every render pass and used
/// for pointer hit-testing between frames.
#[derive(Debug, Clone)]
pub struct LeafRegion {
    pub leaf: LeafId,
    pub full: Rect,
    pub tabs: Rect,
    pub content: Rect,
    pub active: Option<WindowKey>,
    pub tab_hits: Vec<(WindowKey, Rect)>,
}

/// Rendered geometry of one split divider, addressed by the split's
/// root-relative path so a drag can write the new ratio back into the tree.
#[derive(Debug, Clone)]
pub struct DividerRegion {
    pub path: NodePath,
    pub rect: Rect,
    pub direction: SplitDirection,
    /// The split's whole container; ratio = pointer offset / container extent.
    pub container: Rect,
}

/// Walk the tree and lay every node out inside `area`. Pure: the only tree
/// state consulted is structure and ratios, both already normalized.
pub fn compute_regions(
    root: &LayoutNode,
    area: Rect,
    title: &dyn Fn(&WindowKey) -> String,
) -> (Vec<LeafRegion>, Vec<DividerRegion>) {
    let mut leaves = Vec::new();
    let mut dividers = Vec::new();
    let mut path = NodePath::new();
    walk(root, area, &mut path, &mut leaves, &mut dividers, title);
    (leaves, dividers)
}

fn walk(
    node: &LayoutNode,
    area: Rect,
    path: &mut NodePath,
    leaves: &mut Vec<LeafRegion>,
    dividers: &mut Vec<DividerRegion>,
    title: &dyn Fn(&WindowKey) -> String,
) {
    match node {
        LayoutNode::Leaf {
            id, tabs, active, ..
        } => {
            leaves.push(layout_leaf(*id, tabs, active.clone(), area, title));
        }
        LayoutNode::Split {
            direction,
            ratio,
            first,
            second,
        } => {
            let ratio = clamp_ratio(*ratio);
            let (first_rect, divider_rect, second_rect) = split_rects(area, *direction, ratio);
            if divider_rect.width > 0 && divider_rect.height > 0 {
                dividers.push(DividerRegion {
                    path: path.clone(),
                    rect: divider_rect,
                    direction: *direction,
                    container: area,
                });
            }
            path.push(Slot::First);
            walk(first, first_rect, path, leaves, dividers, title);
            path.pop();
            path.push(Slot::Second);
            walk(second, second_rect, path, leaves, dividers, title);
            path.pop();
        }
    }
}

fn split_rects(area: Rect, direction: SplitDirection, ratio: f32) -> (Rect, Rect, Rect) {
    match direction {
        SplitDirection::Row => {
            let gap = if area.width >= 3 { DIVIDER_THICKNESS } else { 0 };
            let avail = area.width.saturating_sub(gap);
            let first_w = ((f32::from(avail) * ratio).round() as u16).min(avail);
            let first = Rect {
                width: first_w,
                ..area
            };
            let divider = Rect {
                x: area.x + first_w,
                width: gap,
                ..area
            };
            let second = Rect {
                x: area.x + first_w + gap,
                width: avail - first_w,
                ..area
            };
            (first, divider, second)
        }
        SplitDirection::Column => {
            let gap = if area.height >= 3 { DIVIDER_THICKNESS } else { 0 };
            let avail = area.height.saturating_sub(gap);
            let first_h = ((f32::from(avail) * ratio).round() as u16).min(avail);
            let first = Rect {
                height: first_h,
                ..area
            };
            let divider = Rect {
                y: area.y + first_h,
                height: gap,
                ..area
            };
            let second = Rect {
                y: area.y + first_h + gap,
                height: avail - first_h,
                ..area
            };
            (first, divider, second)
        }
    }
}

fn layout_leaf(
    leaf: LeafId,
    tabs: &[WindowKey],
    active: Option<WindowKey>,
    area: Rect,
    title: &dyn Fn(&WindowKey) -> String,
) -> LeafRegion {
    let strip_h = TAB_STRIP_HEIGHT.min(area.height);
    let tabs_rect = Rect {
        height: strip_h,
        ..area
    };
    let content = Rect {
        y: area.y + strip_h,
        height: area.height - strip_h,
        ..area
    };

    let mut tab_hits = Vec::with_capacity(tabs.len());
    let mut x = tabs_rect.x;
    let right = tabs_rect.x.saturating_add(tabs_rect.width);
    for key in tabs {
        if x >= right || tabs_rect.height == 0 {
            break;
        }
        let label_w = title(key).chars().count() as u16 + 2;
        let width = label_w.min(right - x);
        tab_hits.push((
            key.clone(),
            Rect {
                x,
                y: tabs_rect.y,
                width,
                height: tabs_rect.height,
            },
        ));
        x = x.saturating_add(width);
    }

    LeafRegion {
        leaf,
        full: area,
        tabs: tabs_rect,
        content,
        active,
        tab_hits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::tree::{LeafIdGen, default_layout};

    fn titles(key: &WindowKey) -> String {
        key.as_str().to_string()
    }

    #[test]
    fn default_layout_produces_three_leaves_and_two_dividers() {
        let mut ids = LeafIdGen::new();
        let tree = default_layout(
            &mut ids,
            &WindowKey::from("map"),
            &[WindowKey::from("side"), WindowKey::from("table")],
        );
        let area = Rect {
            x: 0,
            y: 0,
            width: 100,
            height: 40,
        };
        let (leaves, dividers) = compute_regions(&tree, area, &titles);
        assert_eq!(leaves.len(), 3);
        assert_eq!(dividers.len(), 2);

        // Root row split at 0.62 over 99 usable columns.
        let map = &leaves[0];
        assert_eq!(map.full.x, 0);
        assert_eq!(map.full.width, 61);
        assert_eq!(dividers[0].rect.x, 61);
        assert_eq!(dividers[0].container, area);

        // Tab strip is one row, content sits beneath it.
        assert_eq!(map.tabs.height, 1);
        assert_eq!(map.content.y, 1);
        assert_eq!(map.content.height, 39);
        assert_eq!(map.tab_hits.len(), 1);
        assert_eq!(map.tab_hits[0].1.width, 5); // " map " plus padding

        // Leaves tile the area without overlap.
        let side = &leaves[1];
        let table = &leaves[2];
        assert_eq!(side.full.x, 62);
        assert_eq!(table.full.x, 62);
        assert!(side.full.y + side.full.height <= table.full.y);
    }

    #[test]
    fn tab_hits_clip_to_the_strip() {
        let mut ids = LeafIdGen::new();
        let tree = LayoutNode::leaf(
            ids.mint(),
            vec![
                WindowKey::from("alpha"),
                WindowKey::from("beta"),
                WindowKey::from("gamma"),
            ],
        );
        let area = Rect {
            x: 0,
            y: 0,
            width: 12,
            height: 5,
        };
        let (leaves, _) = compute_regions(&tree, area, &titles);
        let hits = &leaves[0].tab_hits;
        assert!(hits.len() <= 3);
        for (_, rect) in hits {
            assert!(rect.x + rect.width <= 12);
        }
    }

    #[test]
    fn degenerate_area_does_not_underflow() {
        let mut ids = LeafIdGen::new();
        let tree = LayoutNode::split(
            SplitDirection::Row,
            0.5,
            LayoutNode::leaf(ids.mint(), vec![WindowKey::from("a")]),
            LayoutNode::leaf(ids.mint(), vec![WindowKey::from("b")]),
        );
        let (leaves, dividers) = compute_regions(&tree, Rect::default(), &titles);
        assert_eq!(leaves.len(), 2);
        assert!(dividers.is_empty());
    }
}
