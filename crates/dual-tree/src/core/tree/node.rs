//! A node of a binary space-partitioning tree.

use core::ops::Range;

use serde::Serialize;

/// A node of a binary space-partitioning tree.
///
/// A `Node` covers the contiguous range `begin..begin + count` of the
/// reordered `PointSet` and owns its two children, if it has any. The node
/// never stores references into the point buffer; all point access goes
/// through the buffer and this range.
///
/// Nodes are numbered in pre-order, so the sub-tree rooted at a node with id
/// `i` holds exactly the ids `i..i + subtree_size`. Traversals use these ids
/// to keep their per-node statistics in flat arrays.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node<B> {
    /// The pre-order id of the node.
    pub(crate) id: usize,
    /// The depth of the node in the tree. The root has depth 0.
    pub(crate) depth: usize,
    /// The first index of the node's range in the reordered points.
    pub(crate) begin: usize,
    /// The number of points in the node.
    pub(crate) count: usize,
    /// The number of nodes in the sub-tree rooted at this node.
    pub(crate) subtree_size: usize,
    /// The bounding volume of the node's points.
    pub(crate) bound: B,
    /// The left and right children, if the node was split.
    pub(crate) children: Option<Box<(Self, Self)>>,
}

impl<B> Node<B> {
    /// The pre-order id of the node.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// The depth of the node. The root has depth 0.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// The first index of the node's range in the reordered points.
    #[must_use]
    pub const fn begin(&self) -> usize {
        self.begin
    }

    /// One past the last index of the node's range.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.begin + self.count
    }

    /// The number of points in the node.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// The range of reordered indices of the node's points.
    #[must_use]
    pub const fn indices(&self) -> Range<usize> {
        self.begin..self.end()
    }

    /// Whether the reordered index lies in this node.
    #[must_use]
    pub const fn contains(&self, index: usize) -> bool {
        self.begin <= index && index < self.end()
    }

    /// The bounding volume of the node.
    #[must_use]
    pub const fn bound(&self) -> &B {
        &self.bound
    }

    /// The number of nodes in the sub-tree rooted at this node, including
    /// itself.
    #[must_use]
    pub const fn subtree_size(&self) -> usize {
        self.subtree_size
    }

    /// The range of pre-order ids in the sub-tree rooted at this node.
    #[must_use]
    pub const fn ids(&self) -> Range<usize> {
        self.id..self.id + self.subtree_size
    }

    /// Whether the node has no children.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// The left and right children, if any.
    #[must_use]
    pub fn children(&self) -> Option<(&Self, &Self)> {
        self.children.as_deref().map(|(l, r)| (l, r))
    }

    /// All nodes of the sub-tree rooted at this node, in pre-order.
    #[must_use]
    pub fn subtree(&self) -> Vec<&Self> {
        let mut nodes = Vec::with_capacity(self.subtree_size);
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            nodes.push(node);
            if let Some((left, right)) = node.children() {
                stack.push(right);
                stack.push(left);
            }
        }
        nodes
    }

    /// The leaves of the sub-tree rooted at this node, left to right.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Self> {
        self.subtree().into_iter().filter(|n| n.is_leaf()).collect()
    }

    /// The maximum depth of any node in the sub-tree.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.subtree().into_iter().map(Self::depth).max().unwrap_or(self.depth)
    }

    /// The roots of disjoint sub-trees that together cover this node.
    ///
    /// Nodes are split, largest first, until there are at least `n` pieces or
    /// only leaves remain. The pieces are returned in pre-order, so their
    /// ranges are contiguous and ascending.
    #[must_use]
    pub fn frontier(&self, n: usize) -> Vec<&Self> {
        let mut pieces = vec![self];
        while pieces.len() < n {
            let largest = pieces
                .iter()
                .enumerate()
                .filter(|(_, p)| !p.is_leaf())
                .max_by_key(|(_, p)| p.count)
                .map(|(i, _)| i);
            let Some(i) = largest else {
                break;
            };
            if let Some((left, right)) = pieces[i].children() {
                pieces.splice(i..=i, [left, right]);
            }
        }
        pieces
    }
}
