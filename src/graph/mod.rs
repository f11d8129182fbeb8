use std::cmp::Ordering;
use std::ops::Add;

use num_traits::Zero;
use serde::Serialize;

use crate::collections::FxIndexMap;
use crate::geometry::euclidean3;
use crate::waypoint::{Position, Waypoint, WaypointId, WaypointStore};


/// Travel cost between two waypoints
/// Zero when the pair is connected (a teleport, symmetric - either side
/// holding the link is enough), otherwise Euclidean distance over the
/// (x, height, y) triple
pub fn travel_distance(a: &Waypoint, b: &Waypoint) -> f64 {
    if a.connection.as_deref() == Some(b.id()) || b.connection.as_deref() == Some(a.id()) {
        return 0.0;
    }

    let (ax, ay, az) = a.triple();
    let (bx, by, bz) = b.triple();
    euclidean3(ax, ay, az, bx, by, bz)
}

/// Canonical identity of the undirected edge between two waypoints
/// Ids are sorted so (a, b) and (b, a) name the same edge
pub fn edge_id(a: &str, b: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}-{hi}")
}

/// Edge weight wrapper with a total order, so the generic search can
/// treat float costs as `Ord`
#[derive(Debug, Clone, Copy)]
pub struct Cost(pub f64);

impl Cost {
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, other: Cost) -> Cost {
        Cost(self.0 + other.0)
    }
}

impl Zero for Cost {
    fn zero() -> Self {
        Cost(0.0)
    }

    fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

impl PartialEq for Cost {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}
impl Eq for Cost {}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Node element handed to the visualization layer
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: WaypointId,
    pub label: String,
    pub position: Position,
    pub height: f64,
}

/// Undirected weighted edge element
#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: WaypointId,
    pub target: WaypointId,
    pub weight: f64,
}

/// Weighted undirected graph over a waypoint set
///
/// Effectively complete - one edge per unordered pair of distinct
/// waypoints - minus pairs whose weight is not finite. Small waypoint
/// counts make the O(n^2) edge set acceptable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl Graph {
    /// Build the routing graph from the current waypoint set
    /// Degenerate pairs (NaN or infinite distance) get no edge
    pub fn build(store: &WaypointStore) -> Self {
        let waypoints: Vec<&Waypoint> = store.iter().collect();

        let nodes = waypoints
            .iter()
            .map(|w| GraphNode {
                id: w.id().to_string(),
                label: w.data.label.clone(),
                position: w.position,
                height: w.data.height,
            })
            .collect();

        // pairs with i < j: no self-loops, each unordered pair once
        let mut edges = Vec::new();
        for i in 0..waypoints.len() {
            for j in (i + 1)..waypoints.len() {
                let (a, b) = (waypoints[i], waypoints[j]);
                let weight = travel_distance(a, b);
                if !weight.is_finite() {
                    continue;
                }
                edges.push(GraphEdge {
                    id: edge_id(a.id(), b.id()),
                    source: a.id().to_string(),
                    target: b.id().to_string(),
                    weight,
                });
            }
        }

        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Stored weight of the edge between two nodes, in either order
    pub fn edge_weight(&self, a: &str, b: &str) -> Option<f64> {
        let id = edge_id(a, b);
        self.edges.iter().find(|e| e.id == id).map(|e| e.weight)
    }

    /// Neighbor lists keyed by node id, each undirected edge visible
    /// from both endpoints
    pub(crate) fn adjacency(&self) -> FxIndexMap<&str, Vec<(&str, f64)>> {
        let mut adjacency: FxIndexMap<&str, Vec<(&str, f64)>> = FxIndexMap::default();
        for node in &self.nodes {
            adjacency.entry(node.id.as_str()).or_default();
        }
        for edge in &self.edges {
            adjacency
                .entry(edge.source.as_str())
                .or_default()
                .push((edge.target.as_str(), edge.weight));
            adjacency
                .entry(edge.target.as_str())
                .or_default()
                .push((edge.source.as_str(), edge.weight));
        }
        adjacency
    }
}
