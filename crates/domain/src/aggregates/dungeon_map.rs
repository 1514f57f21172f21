//! DungeonMap aggregate - the generated node graph of one run
//!
//! # Invariants
//!
//! - Depths run contiguously from 1 to the map's maximum depth
//! - Each depth holds 2-3 nodes
//! - Connections only point exactly one level deeper (so the graph is acyclic)
//! - Every node above the last level has at least one connection
//! - Every node below depth 1 has at least one incoming connection
//! - Return cost is uniform within a depth and strictly increasing with depth
//!
//! Only `is_revealed` changes after generation.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::DungeonNode;
use crate::NodeId;

pub const MIN_NODES_PER_DEPTH: usize = 2;
pub const MAX_NODES_PER_DEPTH: usize = 3;

/// A single broken map invariant
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MapValidationError {
    #[error("map has no nodes")]
    Empty,
    #[error("node {node} has depth {depth} outside 1..={max_depth}")]
    DepthOutOfRange {
        node: NodeId,
        depth: u32,
        max_depth: u32,
    },
    #[error("depth {depth} has {count} nodes, expected 2-3")]
    NodeCount { depth: u32, count: usize },
    #[error("node {node} appears more than once")]
    DuplicateNode { node: NodeId },
    #[error("node {from} connects to unknown node {to}")]
    DanglingConnection { from: NodeId, to: NodeId },
    #[error("node {from} at depth {from_depth} connects to depth {to_depth}")]
    ConnectionSkipsDepth {
        from: NodeId,
        to: NodeId,
        from_depth: u32,
        to_depth: u32,
    },
    #[error("node {node} at depth {depth} has no way down")]
    DeadEnd { node: NodeId, depth: u32 },
    #[error("node {node} at depth {depth} has no way in")]
    Orphan { node: NodeId, depth: u32 },
    #[error("node {node} cannot be reached from depth 1")]
    Unreachable { node: NodeId },
    #[error("nodes at depth {depth} disagree on return cost")]
    InconsistentReturnCost { depth: u32 },
    #[error("return cost at depth {depth} does not exceed the level above")]
    ReturnCostNotIncreasing { depth: u32 },
}

/// Result of validating a map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapValidation {
    pub is_valid: bool,
    pub errors: Vec<MapValidationError>,
}

impl MapValidation {
    fn from_errors(errors: Vec<MapValidationError>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate a node list, inferring the maximum depth from the nodes.
pub fn validate_map(nodes: &[DungeonNode]) -> MapValidation {
    let max_depth = nodes.iter().map(|n| n.depth).max().unwrap_or(0);
    validate_map_for_depth(nodes, max_depth)
}

/// Validate a node list that should span exactly depths `1..=max_depth`.
pub fn validate_map_for_depth(nodes: &[DungeonNode], max_depth: u32) -> MapValidation {
    if nodes.is_empty() {
        return MapValidation::from_errors(vec![MapValidationError::Empty]);
    }

    let mut errors = Vec::new();
    let mut by_id: HashMap<NodeId, &DungeonNode> = HashMap::with_capacity(nodes.len());
    let mut by_depth: BTreeMap<u32, Vec<&DungeonNode>> = BTreeMap::new();

    for node in nodes {
        if by_id.insert(node.id, node).is_some() {
            errors.push(MapValidationError::DuplicateNode { node: node.id });
        }
        if node.depth == 0 || node.depth > max_depth {
            errors.push(MapValidationError::DepthOutOfRange {
                node: node.id,
                depth: node.depth,
                max_depth,
            });
            continue;
        }
        by_depth.entry(node.depth).or_default().push(node);
    }

    // Per-depth node counts, including levels that are missing entirely
    for depth in 1..=max_depth {
        let count = by_depth.get(&depth).map_or(0, Vec::len);
        if !(MIN_NODES_PER_DEPTH..=MAX_NODES_PER_DEPTH).contains(&count) {
            errors.push(MapValidationError::NodeCount { depth, count });
        }
    }

    // Edges: targets exist and sit exactly one level deeper
    let mut incoming: HashSet<NodeId> = HashSet::new();
    for node in nodes {
        for target in &node.connections {
            match by_id.get(target) {
                None => errors.push(MapValidationError::DanglingConnection {
                    from: node.id,
                    to: *target,
                }),
                Some(t) if t.depth != node.depth + 1 => {
                    errors.push(MapValidationError::ConnectionSkipsDepth {
                        from: node.id,
                        to: *target,
                        from_depth: node.depth,
                        to_depth: t.depth,
                    })
                }
                Some(_) => {
                    incoming.insert(*target);
                }
            }
        }
    }

    for node in nodes.iter().filter(|n| (1..=max_depth).contains(&n.depth)) {
        if node.depth < max_depth && node.connections.is_empty() {
            errors.push(MapValidationError::DeadEnd {
                node: node.id,
                depth: node.depth,
            });
        }
        if node.depth > 1 && !incoming.contains(&node.id) {
            errors.push(MapValidationError::Orphan {
                node: node.id,
                depth: node.depth,
            });
        }
    }

    // Reachability from the entry level
    let reachable = reachable_from_entry(nodes, &by_id);
    for node in nodes.iter().filter(|n| (1..=max_depth).contains(&n.depth)) {
        if !reachable.contains(&node.id) {
            errors.push(MapValidationError::Unreachable { node: node.id });
        }
    }

    // Return cost: uniform per depth, strictly increasing down the levels
    let mut previous: Option<u32> = None;
    for (depth, level) in &by_depth {
        let cost = level[0].return_cost;
        if level.iter().any(|n| n.return_cost != cost) {
            errors.push(MapValidationError::InconsistentReturnCost { depth: *depth });
        }
        if let Some(prev) = previous {
            if cost <= prev {
                errors.push(MapValidationError::ReturnCostNotIncreasing { depth: *depth });
            }
        }
        previous = Some(cost);
    }

    MapValidation::from_errors(errors)
}

fn reachable_from_entry(
    nodes: &[DungeonNode],
    by_id: &HashMap<NodeId, &DungeonNode>,
) -> HashSet<NodeId> {
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut frontier: VecDeque<NodeId> = nodes
        .iter()
        .filter(|n| n.depth == 1)
        .map(|n| n.id)
        .collect();

    while let Some(id) = frontier.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(node) = by_id.get(&id) {
            for next in &node.connections {
                if by_id.get(next).is_some_and(|t| t.depth == node.depth + 1) {
                    frontier.push_back(*next);
                }
            }
        }
    }
    seen
}

/// The node graph of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DungeonMap {
    nodes: Vec<DungeonNode>,
}

impl DungeonMap {
    /// Wrap a node list. Callers are expected to have validated it.
    pub fn from_nodes(nodes: Vec<DungeonNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[DungeonNode] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<DungeonNode> {
        self.nodes
    }

    pub fn get(&self, id: NodeId) -> Option<&DungeonNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn max_depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn nodes_at_depth(&self, depth: u32) -> impl Iterator<Item = &DungeonNode> {
        self.nodes.iter().filter(move |n| n.depth == depth)
    }

    /// Nodes the player may enter next: depth-1 nodes from the surface,
    /// otherwise the current node's connections.
    pub fn next_nodes(&self, current: Option<NodeId>) -> Vec<&DungeonNode> {
        match current.and_then(|id| self.get(id)) {
            None => self.nodes_at_depth(1).collect(),
            Some(node) => node
                .connections
                .iter()
                .filter_map(|id| self.get(*id))
                .collect(),
        }
    }

    pub fn is_reachable_from(&self, current: Option<NodeId>, target: NodeId) -> bool {
        self.next_nodes(current).iter().any(|n| n.id == target)
    }

    /// Reveal a node and everything it connects to. Returns how many nodes
    /// were newly revealed.
    pub fn reveal_around(&mut self, node_id: NodeId) -> usize {
        let targets: HashSet<NodeId> = match self.get(node_id) {
            Some(node) => node
                .connections
                .iter()
                .copied()
                .chain(std::iter::once(node_id))
                .collect(),
            None => return 0,
        };
        self.reveal_where(|n| targets.contains(&n.id))
    }

    /// Reveal every node at `depth`.
    pub fn reveal_depth(&mut self, depth: u32) -> usize {
        self.reveal_where(|n| n.depth == depth)
    }

    fn reveal_where(&mut self, predicate: impl Fn(&DungeonNode) -> bool) -> usize {
        let mut revealed = 0;
        for node in self.nodes.iter_mut().filter(|n| predicate(n)) {
            if !node.is_revealed {
                node.is_revealed = true;
                revealed += 1;
            }
        }
        revealed
    }

    pub fn validate(&self) -> MapValidation {
        validate_map(&self.nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EncounterType, NodePosition};

    fn node(depth: u32, return_cost: u32) -> DungeonNode {
        DungeonNode::new(
            depth,
            NodePosition {
                x: 0.5,
                y: depth as f32,
            },
            EncounterType::DiscoverySite,
            10 * depth,
            return_cost,
        )
    }

    /// Two levels, two nodes each, fully connected.
    fn two_level_map() -> Vec<DungeonNode> {
        let mut a = node(1, 5);
        let mut b = node(1, 5);
        let c = node(2, 14);
        let d = node(2, 14);
        a.connections = vec![c.id, d.id];
        b.connections = vec![d.id];
        vec![a, b, c, d]
    }

    #[test]
    fn well_formed_map_is_valid() {
        let result = validate_map(&two_level_map());
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn validation_is_pure() {
        let nodes = two_level_map();
        assert_eq!(validate_map(&nodes), validate_map(&nodes));
    }

    #[test]
    fn empty_map_is_invalid() {
        let result = validate_map(&[]);
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec![MapValidationError::Empty]);
    }

    #[test]
    fn detects_orphans_and_unreachable_nodes() {
        let mut nodes = two_level_map();
        nodes[0].connections = vec![nodes[3].id];
        nodes[1].connections = vec![nodes[3].id];
        let orphan = nodes[2].id;

        let result = validate_map(&nodes);
        assert!(!result.is_valid);
        assert!(result
            .errors
            .contains(&MapValidationError::Orphan { node: orphan, depth: 2 }));
        assert!(result
            .errors
            .contains(&MapValidationError::Unreachable { node: orphan }));
    }

    #[test]
    fn detects_dead_ends() {
        let mut nodes = two_level_map();
        nodes[1].connections.clear();
        let result = validate_map(&nodes);
        assert!(result.errors.contains(&MapValidationError::DeadEnd {
            node: nodes[1].id,
            depth: 1
        }));
    }

    #[test]
    fn detects_depth_skips_and_dangling_edges() {
        let mut nodes = two_level_map();
        let mut e = node(3, 26);
        let f = node(3, 26);
        nodes[2].connections = vec![e.id];
        nodes[3].connections = vec![f.id];
        // Back edge from depth 3 to depth 1 and an edge to nowhere
        e.connections = vec![nodes[0].id, NodeId::new()];
        nodes.push(e.clone());
        nodes.push(f);

        let result = validate_map(&nodes);
        assert!(result.errors.iter().any(|err| matches!(
            err,
            MapValidationError::ConnectionSkipsDepth { from_depth: 3, to_depth: 1, .. }
        )));
        assert!(result.errors.iter().any(|err| matches!(
            err,
            MapValidationError::DanglingConnection { from, .. } if *from == e.id
        )));
    }

    #[test]
    fn detects_bad_node_counts() {
        let mut nodes = two_level_map();
        let extra_one = node(2, 14);
        let extra_two = node(2, 14);
        nodes[0].connections.push(extra_one.id);
        nodes[1].connections.push(extra_two.id);
        nodes.push(extra_one);
        nodes.push(extra_two);

        let result = validate_map(&nodes);
        assert!(result
            .errors
            .contains(&MapValidationError::NodeCount { depth: 2, count: 4 }));
    }

    #[test]
    fn detects_missing_levels_for_requested_depth() {
        let result = validate_map_for_depth(&two_level_map(), 3);
        assert!(result
            .errors
            .contains(&MapValidationError::NodeCount { depth: 3, count: 0 }));
    }

    #[test]
    fn detects_non_increasing_return_cost() {
        let mut nodes = two_level_map();
        nodes[2].return_cost = 5;
        nodes[3].return_cost = 5;
        let result = validate_map(&nodes);
        assert!(result
            .errors
            .contains(&MapValidationError::ReturnCostNotIncreasing { depth: 2 }));
    }

    #[test]
    fn next_nodes_from_surface_are_entry_level() {
        let map = DungeonMap::from_nodes(two_level_map());
        let entry: Vec<NodeId> = map.next_nodes(None).iter().map(|n| n.id).collect();
        assert_eq!(entry, vec![map.nodes()[0].id, map.nodes()[1].id]);

        let deep = map.nodes()[2].id;
        assert!(!map.is_reachable_from(None, deep));
        assert!(map.is_reachable_from(Some(map.nodes()[0].id), deep));
        assert!(!map.is_reachable_from(Some(map.nodes()[1].id), deep));
    }

    #[test]
    fn reveal_around_only_touches_connections() {
        let mut map = DungeonMap::from_nodes(two_level_map());
        let b = map.nodes()[1].id;
        assert_eq!(map.reveal_around(b), 1);
        assert!(map.nodes()[3].is_revealed);
        assert!(!map.nodes()[2].is_revealed);
        assert_eq!(map.reveal_around(b), 0);
        assert_eq!(map.reveal_depth(2), 1);
    }
}
