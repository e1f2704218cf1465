//! Topological sort: BFS (Kahn) and DFS variants, both operating on the
//! node-wrapper list (spec.md §4.8).
//!
//! Grounded on `original_source/kernel/src/base/dag/util.cc`
//! (`TopoSortBFS`/`TopoSortDFS`/`FindStartNodes`/`CheckUnuseNode`),
//! translated from the recursive `DFSRecursive` to an explicit stack per
//! spec.md §4.8's stack-depth-bound note ("implement iteratively if the
//! graph can exceed reasonable recursion limits").

use crate::error::{Error, Result};
use crate::node::{Color, NodeEntry};
use crate::node_id::NodeId;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// The result of a successful topological sort: node order plus the
/// widest "level" BFS observed, an upper bound on exploitable parallelism
/// (spec.md §4.8).
pub struct TopoOrder {
    pub order: Vec<NodeId>,
    pub max_width: usize,
}

fn find_start_nodes(nodes: &[(NodeId, Arc<NodeEntry>)]) -> Vec<NodeId> {
    nodes.iter().filter(|(_, n)| n.predecessors().is_empty()).map(|(id, _)| *id).collect()
}

/// Node-wrappers left white after a pass: unreachable from any start node.
/// Reported as a warning by callers, never treated as an error (spec.md §4.8).
#[must_use]
pub fn unused_nodes(nodes: &[(NodeId, Arc<NodeEntry>)]) -> Vec<NodeId> {
    nodes.iter().filter(|(_, n)| n.color() == Color::White).map(|(id, _)| *id).collect()
}

/// Kahn's algorithm: repeatedly emit zero-in-degree nodes, decrementing
/// successors' in-degree as each is emitted. Tracks the widest queue seen
/// (the per-level width) as an upper bound on exploitable parallelism.
/// Cycle iff emitted count < node count.
pub fn topo_sort_bfs(nodes: &[(NodeId, Arc<NodeEntry>)]) -> Result<TopoOrder> {
    let start = find_start_nodes(nodes);
    if start.is_empty() && !nodes.is_empty() {
        return Err(Error::GraphMissingStart);
    }

    let by_id: HashMap<NodeId, &Arc<NodeEntry>> = nodes.iter().map(|(id, n)| (*id, n)).collect();
    let mut in_degree: HashMap<NodeId, usize> = nodes.iter().map(|(id, n)| (*id, n.predecessors().len())).collect();

    let mut queue: VecDeque<NodeId> = start.into_iter().collect();
    let mut order = Vec::with_capacity(nodes.len());
    let mut max_width = 0usize;

    while !queue.is_empty() {
        max_width = max_width.max(queue.len());
        let cur = queue.pop_front().unwrap();
        by_id[&cur].set_color(Color::Black);
        order.push(cur);

        for succ in by_id[&cur].successors() {
            if let Some(deg) = in_degree.get_mut(&succ) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(succ);
                }
            }
        }
    }

    if order.len() != nodes.len() {
        return Err(Error::GraphCycle);
    }

    Ok(TopoOrder { order, max_width })
}

fn dfs_iterative(start: NodeId, by_id: &HashMap<NodeId, &Arc<NodeEntry>>, out: &mut Vec<NodeId>) -> Result<()> {
    // Explicit stack with a per-frame "successor index" so recursion depth
    // never scales with graph depth. Frame: (node, next successor to visit).
    let mut stack: Vec<(NodeId, usize)> = vec![(start, 0)];
    by_id[&start].set_color(Color::Gray);

    while let Some(&mut (node, ref mut idx)) = stack.last_mut() {
        let successors = by_id[&node].successors();
        if *idx < successors.len() {
            let next = successors[*idx];
            *idx += 1;
            match by_id[&next].color() {
                Color::White => {
                    by_id[&next].set_color(Color::Gray);
                    stack.push((next, 0));
                }
                Color::Gray => return Err(Error::GraphCycle),
                Color::Black => {}
            }
        } else {
            by_id[&node].set_color(Color::Black);
            out.push(node);
            stack.pop();
        }
    }
    Ok(())
}

/// Three-color DFS, iterative to avoid unbounded recursion depth on deep
/// graphs. Emits in reverse post-order (a valid topological order).
/// Gray-on-visit indicates a cycle.
pub fn topo_sort_dfs(nodes: &[(NodeId, Arc<NodeEntry>)]) -> Result<TopoOrder> {
    let start = find_start_nodes(nodes);
    if start.is_empty() && !nodes.is_empty() {
        return Err(Error::GraphMissingStart);
    }

    let by_id: HashMap<NodeId, &Arc<NodeEntry>> = nodes.iter().map(|(id, n)| (*id, n)).collect();
    let mut post_order = Vec::with_capacity(nodes.len());

    for id in start {
        match by_id[&id].color() {
            Color::White => dfs_iterative(id, &by_id, &mut post_order)?,
            Color::Gray => return Err(Error::GraphCycle),
            Color::Black => {}
        }
    }

    post_order.reverse();
    Ok(TopoOrder { max_width: 0, order: post_order })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    struct Noop;
    impl Node for Noop {
        fn run(&mut self) -> crate::error::Result<()> {
            Ok(())
        }
    }

    fn entry(id: u64) -> (NodeId, Arc<NodeEntry>) {
        (NodeId::new(id), Arc::new(NodeEntry::new(format!("n{id}"), false, Box::new(Noop), vec![], vec![])))
    }

    fn link(pred: &(NodeId, Arc<NodeEntry>), succ: &(NodeId, Arc<NodeEntry>)) {
        pred.1.successors.lock().unwrap().push(succ.0);
        succ.1.predecessors.lock().unwrap().push(pred.0);
    }

    #[test]
    fn bfs_respects_predecessor_order_on_diamond() {
        let a = entry(0);
        let b = entry(1);
        let c = entry(2);
        let d = entry(3);
        link(&a, &b);
        link(&a, &c);
        link(&b, &d);
        link(&c, &d);
        let nodes = vec![a.clone(), b.clone(), c.clone(), d.clone()];

        let result = topo_sort_bfs(&nodes).unwrap();
        assert_eq!(result.order.len(), 4);
        assert_eq!(result.order[0], a.0);
        assert_eq!(result.order[3], d.0);
        assert_eq!(result.max_width, 2, "B and C both become ready after A");
    }

    #[test]
    fn bfs_detects_cycle() {
        let a = entry(0);
        let b = entry(1);
        link(&a, &b);
        link(&b, &a);
        let nodes = vec![a, b];
        assert!(matches!(topo_sort_bfs(&nodes), Err(Error::GraphMissingStart) | Err(Error::GraphCycle)));
    }

    #[test]
    fn dfs_respects_predecessor_order_on_diamond() {
        let a = entry(0);
        let b = entry(1);
        let c = entry(2);
        let d = entry(3);
        link(&a, &b);
        link(&a, &c);
        link(&b, &d);
        link(&c, &d);
        let nodes = vec![a.clone(), b.clone(), c.clone(), d.clone()];

        let result = topo_sort_dfs(&nodes).unwrap();
        let pos = |id: NodeId| result.order.iter().position(|&x| x == id).unwrap();
        assert!(pos(a.0) < pos(b.0));
        assert!(pos(a.0) < pos(c.0));
        assert!(pos(b.0) < pos(d.0));
        assert!(pos(c.0) < pos(d.0));
    }

    #[test]
    fn isolated_node_is_its_own_start_and_not_reported_unused() {
        let a = entry(0);
        let b = entry(1);
        let isolated = entry(2);
        link(&a, &b);
        let nodes = vec![a, b, isolated.clone()];
        let result = topo_sort_bfs(&nodes).unwrap();
        assert_eq!(result.order.len(), 3, "a zero-predecessor node is itself a BFS root");
        assert!(unused_nodes(&nodes).is_empty());
    }
}
