// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Child collection errors.

use core::fmt;

use crate::types::NodeId;

/// Error returned by the fallible child collection operations.
///
/// The panicking counterparts ([`ViewTree::add_child`](crate::ViewTree::add_child),
/// [`ViewTree::remove_child_at`](crate::ViewTree::remove_child_at),
/// [`ViewTree::move_child`](crate::ViewTree::move_child)) treat these as programmer errors.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChildError {
    /// The identifier does not refer to a live node.
    StaleNode(NodeId),
    /// The node was created as a leaf and cannot hold children.
    NotAGroup(NodeId),
    /// The child is already attached to a container.
    AlreadyHasParent {
        /// Child being added.
        child: NodeId,
        /// Its current container.
        parent: NodeId,
    },
    /// Adding the child would make a node its own ancestor.
    WouldCycle {
        /// Container receiving the child.
        parent: NodeId,
        /// Child being added.
        child: NodeId,
    },
    /// An index or range lies outside the live child count.
    IndexOutOfBounds {
        /// Offending index (or range end).
        index: usize,
        /// Live child count.
        count: usize,
    },
}

impl fmt::Display for ChildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaleNode(id) => write!(f, "node {id:?} is not alive"),
            Self::NotAGroup(id) => write!(f, "node {id:?} cannot hold children"),
            Self::AlreadyHasParent { child, parent } => {
                write!(f, "node {child:?} already has parent {parent:?}")
            }
            Self::WouldCycle { parent, child } => write!(
                f,
                "adding {child:?} under {parent:?} would create a cycle"
            ),
            Self::IndexOutOfBounds { index, count } => {
                write!(f, "child index {index} out of bounds (count {count})")
            }
        }
    }
}

impl core::error::Error for ChildError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_names_the_bound() {
        let e = ChildError::IndexOutOfBounds { index: 4, count: 2 };
        assert_eq!(e.to_string(), "child index 4 out of bounds (count 2)");
    }
}
