//! Depth-first traversal over the component tree.

use crate::ComponentNode;

/// Visitor verdict: descend into the node's children or stop below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Descend,
    Skip,
}

/// Visits `root` and, when the visitor answers [`Visit::Descend`], its
/// children top-down in child-map order. The mount/unmount propagation
/// passes use this to stop below subtrees a previous pass already handled.
pub fn walk(root: &ComponentNode, visitor: &mut dyn FnMut(&ComponentNode) -> Visit) {
    if let Visit::Descend = visitor(root) {
        for child in root.children() {
            walk(&child, visitor);
        }
    }
}
