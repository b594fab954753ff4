use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SPLIT_RATIO: f32 = 0.62;
pub const DEFAULT_STACK_RATIO: f32 = 0.55;
pub const MIN_SPLIT_RATIO: f32 = 0.15;
pub const MAX_SPLIT_RATIO: f32 = 0.85;

/// Recursion ceiling when validating persisted trees. Anything deeper is
/// treated as corrupted input and discarded.
pub const MAX_TREE_DEPTH: usize = 16;

/// Clamp a split ratio into the managed band, substituting the default for
/// non-finite input (possible in hand-edited layout files).
pub fn clamp_ratio(ratio: f32) -> f32 {
    if !ratio.is_finite() {
        return DEFAULT_SPLIT_RATIO;
    }
    ratio.clamp(MIN_SPLIT_RATIO, MAX_SPLIT_RATIO)
}

/// Opaque key into the externally owned pane registry. The engine never
/// interprets the string; it only decides which leaf hosts it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowKey(String);

impl WindowKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WindowKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for WindowKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Stable identifier of one leaf. Minted by [`LeafIdGen`], never reused
/// within an engine instance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LeafId(u64);

/// Monotonic id source owned by the engine instance, so two engines in one
/// process never collide and tests can start from a known counter.
#[derive(Debug, Clone)]
pub struct LeafIdGen {
    next: u64,
}

impl Default for LeafIdGen {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl LeafIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    pub fn mint(&mut self) -> LeafId {
        let id = LeafId(self.next);
        self.next += 1;
        id
    }

    /// Raise the counter past every id already present in `root`, so leaves
    /// minted after loading a persisted tree stay unique.
    pub fn seed_from(&mut self, root: &LayoutNode) {
        for LeafId(id) in root.leaf_ids() {
            self.next = self.next.max(id + 1);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitDirection {
    /// Children sit side by side.
    Row,
    /// Children are stacked.
    Column,
}

/// Which child slot of a split a path step descends into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    First,
    Second,
}

/// Root-relative address of a node. The empty path is the root itself.
/// Replacing the node a path points at never requires parent back-pointers:
/// callers re-walk from the root via [`LayoutNode::node_at_path_mut`].
pub type NodePath = Vec<Slot>;

/// The layout arrangement: a binary tree of splits over tab-multiplexed
/// leaves. Pure data; mutation helpers live below and on [`DockManager`].
///
/// [`DockManager`]: crate::dock::DockManager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayoutNode {
    Split {
        direction: SplitDirection,
        ratio: f32,
        first: Box<LayoutNode>,
        second: Box<LayoutNode>,
    },
    Leaf {
        id: LeafId,
        tabs: Vec<WindowKey>,
        #[serde(default)]
        active: Option<WindowKey>,
    },
}

impl LayoutNode {
    pub fn leaf(id: LeafId, tabs: Vec<WindowKey>) -> Self {
        let active = tabs.first().cloned();
        Self::Leaf { id, tabs, active }
    }

    pub fn split(direction: SplitDirection, ratio: f32, first: Self, second: Self) -> Self {
        Self::Split {
            direction,
            ratio,
            first: Box::new(first),
            second: Box::new(second),
        }
    }

    /// Throwaway node used as a swap placeholder during grafts.
    pub(crate) fn hollow() -> Self {
        Self::Leaf {
            id: LeafId(0),
            tabs: Vec::new(),
            active: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    fn is_empty_leaf(&self) -> bool {
        matches!(self, Self::Leaf { tabs, .. } if tabs.is_empty())
    }

    pub fn node_at_path(&self, path: &[Slot]) -> Option<&Self> {
        let mut current = self;
        for slot in path {
            let Self::Split { first, second, .. } = current else {
                return None;
            };
            current = match slot {
                Slot::First => first,
                Slot::Second => second,
            };
        }
        Some(current)
    }

    pub fn node_at_path_mut(&mut self, path: &[Slot]) -> Option<&mut Self> {
        let mut current = self;
        for slot in path {
            let Self::Split { first, second, .. } = current else {
                return None;
            };
            current = match slot {
                Slot::First => first,
                Slot::Second => second,
            };
        }
        Some(current)
    }

    /// Depth-first search for the leaf with the given id.
    pub fn find_leaf(&self, id: LeafId) -> Option<NodePath> {
        fn walk(node: &LayoutNode, id: LeafId, path: &mut NodePath) -> bool {
            match node {
                LayoutNode::Leaf { id: leaf, .. } => *leaf == id,
                LayoutNode::Split { first, second, .. } => {
                    path.push(Slot::First);
                    if walk(first, id, path) {
                        return true;
                    }
                    path.pop();
                    path.push(Slot::Second);
                    if walk(second, id, path) {
                        return true;
                    }
                    path.pop();
                    false
                }
            }
        }
        let mut path = NodePath::new();
        walk(self, id, &mut path).then_some(path)
    }

    /// Depth-first search for the leaf whose tab set contains `window`.
    pub fn find_leaf_containing(&self, window: &WindowKey) -> Option<NodePath> {
        fn walk(node: &LayoutNode, window: &WindowKey, path: &mut NodePath) -> bool {
            match node {
                LayoutNode::Leaf { tabs, .. } => tabs.contains(window),
                LayoutNode::Split { first, second, .. } => {
                    path.push(Slot::First);
                    if walk(first, window, path) {
                        return true;
                    }
                    path.pop();
                    path.push(Slot::Second);
                    if walk(second, window, path) {
                        return true;
                    }
                    path.pop();
                    false
                }
            }
        }
        let mut path = NodePath::new();
        walk(self, window, &mut path).then_some(path)
    }

    /// Pre-order first leaf. Every tree has one because splits always carry
    /// two children.
    pub fn first_leaf_path(&self) -> NodePath {
        let mut path = NodePath::new();
        let mut current = self;
        while let Self::Split { first, .. } = current {
            path.push(Slot::First);
            current = first;
        }
        path
    }

    /// Every window identifier currently open somewhere in the tree.
    pub fn collect_window_keys(&self) -> BTreeSet<WindowKey> {
        fn walk(node: &LayoutNode, out: &mut BTreeSet<WindowKey>) {
            match node {
                LayoutNode::Leaf { tabs, .. } => {
                    out.extend(tabs.iter().cloned());
                }
                LayoutNode::Split { first, second, .. } => {
                    walk(first, out);
                    walk(second, out);
                }
            }
        }
        let mut out = BTreeSet::new();
        walk(self, &mut out);
        out
    }

    pub fn leaf_ids(&self) -> Vec<LeafId> {
        fn walk(node: &LayoutNode, out: &mut Vec<LeafId>) {
            match node {
                LayoutNode::Leaf { id, .. } => out.push(*id),
                LayoutNode::Split { first, second, .. } => {
                    walk(first, out);
                    walk(second, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_ids().len()
    }

    /// Clamp every split ratio into the managed band and repair any `active`
    /// pointer that no longer names a member of its leaf's tab set.
    pub fn normalize(&mut self) {
        match self {
            Self::Leaf { tabs, active, .. } => {
                let valid = matches!(active, Some(key) if tabs.contains(key));
                if !valid {
                    *active = tabs.first().cloned();
                }
            }
            Self::Split {
                ratio,
                first,
                second,
                ..
            } => {
                *ratio = clamp_ratio(*ratio);
                first.normalize();
                second.normalize();
            }
        }
    }

    /// Post-order cleanup: whenever a split has an empty leaf child, the
    /// split is replaced by its other child. If the sweep leaves the anchor
    /// window missing from the tree entirely, it is forced back into the
    /// first leaf so the arrangement never goes blank.
    pub fn collapse_empty_leaves(&mut self, anchor: &WindowKey) {
        fn collapse(node: &mut LayoutNode) {
            if let LayoutNode::Split { first, second, .. } = node {
                collapse(first);
                collapse(second);
                if first.is_empty_leaf() {
                    let survivor = std::mem::replace(second, Box::new(LayoutNode::hollow()));
                    *node = *survivor;
                } else if second.is_empty_leaf() {
                    let survivor = std::mem::replace(first, Box::new(LayoutNode::hollow()));
                    *node = *survivor;
                }
            }
        }
        collapse(self);

        if !self.collect_window_keys().contains(anchor) {
            let path = self.first_leaf_path();
            if let Some(Self::Leaf { tabs, active, .. }) = self.node_at_path_mut(&path) {
                tabs.insert(0, anchor.clone());
                if active.is_none() {
                    *active = Some(anchor.clone());
                }
            }
        }
    }
}

/// Structural validation for persisted trees: bounded depth, finite ratios,
/// no window hosted by two leaves, no duplicated leaf ids. Serde already
/// guarantees the field types; this guards the cross-node invariants that a
/// corrupted or hand-edited store could violate.
pub fn is_valid_layout(root: &LayoutNode) -> bool {
    fn shape(node: &LayoutNode, depth: usize) -> bool {
        if depth > MAX_TREE_DEPTH {
            return false;
        }
        match node {
            LayoutNode::Leaf { .. } => true,
            LayoutNode::Split {
                ratio,
                first,
                second,
                ..
            } => ratio.is_finite() && shape(first, depth + 1) && shape(second, depth + 1),
        }
    }

    fn unique(
        node: &LayoutNode,
        windows: &mut BTreeSet<WindowKey>,
        leaves: &mut BTreeSet<LeafId>,
    ) -> bool {
        match node {
            LayoutNode::Leaf { id, tabs, .. } => {
                leaves.insert(*id) && tabs.iter().all(|tab| windows.insert(tab.clone()))
            }
            LayoutNode::Split { first, second, .. } => {
                unique(first, windows, leaves) && unique(second, windows, leaves)
            }
        }
    }

    shape(root, 0) && unique(root, &mut BTreeSet::new(), &mut BTreeSet::new())
}

/// The canonical starting arrangement: the anchor window alone on the left,
/// and up to two companion windows stacked in a second column.
pub fn default_layout(
    ids: &mut LeafIdGen,
    anchor: &WindowKey,
    companions: &[WindowKey],
) -> LayoutNode {
    let anchor_leaf = LayoutNode::leaf(ids.mint(), vec![anchor.clone()]);
    let mut companions = companions.iter().filter(|key| *key != anchor);

    let Some(top) = companions.next() else {
        return anchor_leaf;
    };
    let top_leaf = LayoutNode::leaf(ids.mint(), vec![top.clone()]);

    let side = match companions.next() {
        Some(bottom) => LayoutNode::split(
            SplitDirection::Column,
            DEFAULT_STACK_RATIO,
            top_leaf,
            LayoutNode::leaf(ids.mint(), vec![bottom.clone()]),
        ),
        None => top_leaf,
    };

    LayoutNode::split(
        SplitDirection::Row,
        DEFAULT_SPLIT_RATIO,
        anchor_leaf,
        side,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> WindowKey {
        WindowKey::from(name)
    }

    #[test]
    fn default_layout_three_leaves() {
        let mut ids = LeafIdGen::new();
        let tree = default_layout(&mut ids, &key("map"), &[key("side"), key("table")]);
        let LayoutNode::Split {
            direction,
            ratio,
            first,
            second,
        } = &tree
        else {
            panic!("expected root split");
        };
        assert_eq!(*direction, SplitDirection::Row);
        assert!((ratio - DEFAULT_SPLIT_RATIO).abs() < f32::EPSILON);
        assert!(matches!(&**first, LayoutNode::Leaf { tabs, .. } if tabs == &[key("map")]));
        let LayoutNode::Split {
            direction: inner, ..
        } = &**second
        else {
            panic!("expected stacked column");
        };
        assert_eq!(*inner, SplitDirection::Column);

        let leaf_ids = tree.leaf_ids();
        assert_eq!(leaf_ids.len(), 3);
        let unique: BTreeSet<_> = leaf_ids.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn default_layout_handles_missing_companions() {
        let mut ids = LeafIdGen::new();
        let solo = default_layout(&mut ids, &key("map"), &[]);
        assert!(solo.is_leaf());

        let pair = default_layout(&mut ids, &key("map"), &[key("side")]);
        assert_eq!(pair.leaf_count(), 2);

        // The anchor never shows up twice even if listed as a companion.
        let echoed = default_layout(&mut ids, &key("map"), &[key("map"), key("side")]);
        assert_eq!(echoed.leaf_count(), 2);
    }

    #[test]
    fn collapse_promotes_surviving_sibling() {
        let mut ids = LeafIdGen::new();
        let empty = LayoutNode::leaf(ids.mint(), vec![]);
        let full = LayoutNode::leaf(ids.mint(), vec![key("map"), key("side")]);
        let mut tree = LayoutNode::split(SplitDirection::Row, 0.5, empty, full);

        tree.collapse_empty_leaves(&key("map"));
        assert!(matches!(
            &tree,
            LayoutNode::Leaf { tabs, .. } if tabs.len() == 2
        ));
    }

    #[test]
    fn collapse_runs_bottom_up_through_nested_splits() {
        let mut ids = LeafIdGen::new();
        let inner = LayoutNode::split(
            SplitDirection::Column,
            0.5,
            LayoutNode::leaf(ids.mint(), vec![]),
            LayoutNode::leaf(ids.mint(), vec![key("table")]),
        );
        let mut tree = LayoutNode::split(
            SplitDirection::Row,
            0.62,
            LayoutNode::leaf(ids.mint(), vec![key("map")]),
            inner,
        );

        tree.collapse_empty_leaves(&key("map"));
        let LayoutNode::Split { second, .. } = &tree else {
            panic!("root split should survive");
        };
        assert!(matches!(&**second, LayoutNode::Leaf { tabs, .. } if tabs == &[key("table")]));
    }

    #[test]
    fn collapse_restores_missing_anchor() {
        let mut ids = LeafIdGen::new();
        let mut tree = LayoutNode::split(
            SplitDirection::Row,
            0.5,
            LayoutNode::leaf(ids.mint(), vec![]),
            LayoutNode::leaf(ids.mint(), vec![]),
        );

        tree.collapse_empty_leaves(&key("map"));
        assert!(tree.collect_window_keys().contains(&key("map")));
        assert!(matches!(
            &tree,
            LayoutNode::Leaf { active: Some(active), .. } if *active == key("map")
        ));
    }

    #[test]
    fn anchor_reinsertion_prefers_first_leaf_and_keeps_active() {
        let mut ids = LeafIdGen::new();
        let mut tree = LayoutNode::split(
            SplitDirection::Row,
            0.5,
            LayoutNode::leaf(ids.mint(), vec![key("side")]),
            LayoutNode::leaf(ids.mint(), vec![key("table")]),
        );

        tree.collapse_empty_leaves(&key("map"));
        let LayoutNode::Split { first, .. } = &tree else {
            panic!("split should survive");
        };
        let LayoutNode::Leaf { tabs, active, .. } = &**first else {
            panic!("first child is a leaf");
        };
        assert_eq!(tabs, &[key("map"), key("side")]);
        // The anchor is prepended, not activated over the existing tab.
        assert_eq!(active.as_ref(), Some(&key("side")));
    }

    #[test]
    fn find_and_mutate_through_paths() {
        let mut ids = LeafIdGen::new();
        let tree = default_layout(&mut ids, &key("map"), &[key("side"), key("table")]);
        let mut tree = tree;

        let path = tree.find_leaf_containing(&key("table")).expect("table leaf");
        let Some(LayoutNode::Leaf { tabs, .. }) = tree.node_at_path_mut(&path) else {
            panic!("path resolves to a leaf");
        };
        tabs.push(key("extra"));

        assert!(tree.collect_window_keys().contains(&key("extra")));
        let ids_found = tree.leaf_ids();
        let by_id = tree.find_leaf(ids_found[2]).expect("leaf by id");
        assert_eq!(by_id, path);
        assert!(tree.find_leaf_containing(&key("nope")).is_none());
    }

    #[test]
    fn normalize_clamps_ratios_and_repairs_active() {
        let mut ids = LeafIdGen::new();
        let mut leaf = LayoutNode::leaf(ids.mint(), vec![key("a"), key("b")]);
        if let LayoutNode::Leaf { active, .. } = &mut leaf {
            *active = Some(key("gone"));
        }
        let mut tree = LayoutNode::split(
            SplitDirection::Row,
            0.95,
            leaf,
            LayoutNode::leaf(ids.mint(), vec![]),
        );

        tree.normalize();
        let LayoutNode::Split { ratio, first, .. } = &tree else {
            panic!("split");
        };
        assert!((ratio - MAX_SPLIT_RATIO).abs() < f32::EPSILON);
        assert!(matches!(
            &**first,
            LayoutNode::Leaf { active: Some(active), .. } if *active == key("a")
        ));
    }

    #[test]
    fn validator_rejects_excessive_depth() {
        let mut ids = LeafIdGen::new();
        let mut node = LayoutNode::leaf(ids.mint(), vec![key("map")]);
        for n in 0..MAX_TREE_DEPTH + 1 {
            node = LayoutNode::split(
                SplitDirection::Row,
                0.5,
                node,
                LayoutNode::leaf(ids.mint(), vec![key(&format!("w{n}"))]),
            );
        }
        assert!(!is_valid_layout(&node));
    }

    #[test]
    fn validator_rejects_duplicates_and_bad_ratios() {
        let mut ids = LeafIdGen::new();
        let ok = default_layout(&mut ids, &key("map"), &[key("side"), key("table")]);
        assert!(is_valid_layout(&ok));

        let dup_window = LayoutNode::split(
            SplitDirection::Row,
            0.5,
            LayoutNode::leaf(ids.mint(), vec![key("map")]),
            LayoutNode::leaf(ids.mint(), vec![key("map")]),
        );
        assert!(!is_valid_layout(&dup_window));

        let shared = ids.mint();
        let dup_leaf = LayoutNode::split(
            SplitDirection::Row,
            0.5,
            LayoutNode::leaf(shared, vec![key("a")]),
            LayoutNode::leaf(shared, vec![key("b")]),
        );
        assert!(!is_valid_layout(&dup_leaf));

        let bad_ratio = LayoutNode::split(
            SplitDirection::Row,
            f32::NAN,
            LayoutNode::leaf(ids.mint(), vec![key("a2")]),
            LayoutNode::leaf(ids.mint(), vec![key("b2")]),
        );
        assert!(!is_valid_layout(&bad_ratio));
    }

    #[test]
    fn id_generator_seeds_past_persisted_ids() {
        let mut ids = LeafIdGen::new();
        let tree = default_layout(&mut ids, &key("map"), &[key("side"), key("table")]);

        let mut fresh = LeafIdGen::new();
        fresh.seed_from(&tree);
        let minted = fresh.mint();
        assert!(!tree.leaf_ids().contains(&minted));
    }

    #[test]
    fn clamp_ratio_bounds() {
        assert_eq!(clamp_ratio(0.0), MIN_SPLIT_RATIO);
        assert_eq!(clamp_ratio(1.0), MAX_SPLIT_RATIO);
        assert_eq!(clamp_ratio(0.5), 0.5);
        assert_eq!(clamp_ratio(f32::INFINITY), DEFAULT_SPLIT_RATIO);
    }
}
