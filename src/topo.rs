// SPDX-License-Identifier: Apache-2.0

use crate::int_hash_table::IntHashTable;
use crate::node::NodeRef;
use crate::node_manager::NodeManager;

/// Returns a postorder traversal of the nodes reachable from `roots` (dedup
/// by node): every node appears after all of its children.
pub fn postorder(roots: &[NodeRef], mgr: &NodeManager) -> Vec<NodeRef> {
    let mut worklist: Vec<NodeRef> = roots.iter().rev().copied().collect();
    let mut visited = IntHashTable::new();
    let mut postorder = Vec::new();
    while let Some(current) = worklist.pop() {
        if visited.contains(current.key()) {
            continue;
        }
        debug_assert!(
            (current.id as usize) < mgr.len(),
            "postorder: node index out of bounds: {} (mgr.len() = {})",
            current.id,
            mgr.len()
        );
        let mut all_deps_visited = true;
        for dep in mgr.get(current).children().into_iter().rev() {
            if !visited.contains(dep.key()) {
                if all_deps_visited {
                    worklist.push(current); // Revisit after dependencies
                    all_deps_visited = false;
                }
                worklist.push(dep);
            }
        }
        if all_deps_visited {
            // The node may have been pushed more than once before its first
            // visit completed; `add` only fails on such a duplicate.
            if visited.add(current.key()).is_ok() {
                postorder.push(current);
            }
        }
    }
    postorder
}

/// Number of distinct nodes reachable from `root`.
pub fn cone_size(root: NodeRef, mgr: &NodeManager) -> usize {
    postorder(&[root], mgr).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_manager::NodeManagerOptions;

    #[test]
    fn test_postorder_children_first() {
        let mut mgr = NodeManager::new(NodeManagerOptions::no_opt());
        let a = mgr.mk_var("a", 8).unwrap();
        let b = mgr.mk_var("b", 8).unwrap();
        let sum = mgr.mk_add(a, b).unwrap();
        let prod = mgr.mk_op(crate::node::Op::Mul, &[sum, a]).unwrap();
        let order = postorder(&[prod], &mgr);
        assert_eq!(order, vec![a, b, sum, prod]);
    }

    #[test]
    fn test_postorder_shared_diamonds_are_linear() {
        let mut mgr = NodeManager::new(NodeManagerOptions::no_opt());
        let mut current = mgr.mk_var("a", 8).unwrap();
        for _ in 0..64 {
            let l = mgr.mk_not(current).unwrap();
            let r = mgr.mk_op(crate::node::Op::Neg, &[current]).unwrap();
            current = mgr.mk_add(l, r).unwrap();
        }
        assert_eq!(cone_size(current, &mgr), 1 + 64 * 3);
    }
}
