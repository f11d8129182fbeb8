use std::collections::HashSet;

use log::debug;
use serde::Serialize;

use crate::graph::{Cost, Graph, edge_id, travel_distance};
use crate::graph_algos::{GraphNodeMap, dijkstra::dijkstra_nodes, shortest_path};
use crate::waypoint::{WaypointId, WaypointStore};


/// One traversal hop of a computed route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStep {
    /// Canonical id of the traversed edge
    pub id: String,
    pub from: WaypointId,
    pub to: WaypointId,
    /// Exact weight of the traversed edge
    pub distance: f64,
}

/// Display row: a waypoint reached by the route and the distance of the
/// hop that arrived there (the source row carries distance 0)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRow {
    pub id: WaypointId,
    pub label: String,
    pub distance: f64,
}

/// Result of a route computation
/// `found == false` means nothing to display - unset or identical
/// endpoints, or a disconnected graph - never an error
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoutePlan {
    pub steps: Vec<PathStep>,
    pub found: bool,
}

impl RoutePlan {
    /// Sum of step distances
    pub fn total_cost(&self) -> f64 {
        self.steps.iter().map(|step| step.distance).sum()
    }

    /// Rows for the step table: the source first at distance 0, then
    /// one row per arrival node with the distance of the hop just taken
    pub fn rows(&self, graph: &Graph) -> Vec<RouteRow> {
        let Some(first) = self.steps.first() else {
            return Vec::new();
        };

        let mut rows = vec![RouteRow {
            id: first.from.clone(),
            label: label_of(graph, &first.from),
            distance: 0.0,
        }];
        for step in &self.steps {
            rows.push(RouteRow {
                id: step.to.clone(),
                label: label_of(graph, &step.to),
                distance: step.distance,
            });
        }
        rows
    }
}

/// Straight-line distance between the selected source and destination,
/// reported alongside a route for comparison - not a routing result
pub fn bird_eye_distance(store: &WaypointStore) -> Option<f64> {
    Some(travel_distance(store.source()?, store.destination()?))
}

/// Compute the cheapest route between two nodes of the graph
///
/// With either endpoint unset, or both naming the same node, no search
/// runs and the empty not-found plan comes back. An unreachable
/// destination also yields not-found; the caller falls back to showing
/// the whole graph.
pub fn plan(graph: &Graph, source: Option<&str>, destination: Option<&str>) -> RoutePlan {
    let (Some(source), Some(destination)) = (source, destination) else {
        return RoutePlan::default();
    };
    if source == destination {
        return RoutePlan::default();
    }

    let adjacency = graph.adjacency();
    let neighbors = |node: &&str| {
        adjacency
            .get(node)
            .map(|list| {
                list.iter()
                    .map(|&(id, weight)| (id, Cost(effective_weight(weight))))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    };

    let node_map = dijkstra_nodes(source, neighbors);
    let Some(goal_index) = node_map.get_index_of(destination) else {
        debug!("no path from {source} to {destination}");
        return RoutePlan::default();
    };

    // Walk back from the destination along on-shortest-path edges,
    // taking a free (teleport) hop whenever one ties the cost
    let mut hops: Vec<(&str, &str, f64)> = Vec::new();
    let mut visited: HashSet<&str> = HashSet::from([destination]);
    let mut current = destination;

    while current != source {
        let Some(&(_, cost_here)) = node_map.get(current) else {
            return RoutePlan::default();
        };

        let mut chosen: Option<(&str, f64)> = None;
        for &(prev, weight) in adjacency.get(current).map(Vec::as_slice).unwrap_or(&[]) {
            if visited.contains(prev) {
                continue;
            }
            let Some(&(_, cost_prev)) = node_map.get(prev) else {
                continue;
            };
            if cost_prev.get() + effective_weight(weight) == cost_here.get() {
                if weight == 0.0 {
                    chosen = Some((prev, weight));
                    break;
                }
                if chosen.is_none() {
                    chosen = Some((prev, weight));
                }
            }
        }

        match chosen {
            Some((prev, weight)) => {
                hops.push((prev, current, weight));
                visited.insert(prev);
                current = prev;
            }
            // The preference walk dead-ended on visited nodes; the
            // recorded parent chain is always consistent, use it
            None => return plan_from_parents(graph, &node_map, goal_index),
        }
    }

    let steps = hops
        .iter()
        .rev()
        .map(|&(from, to, weight)| PathStep {
            id: edge_id(from, to),
            from: from.to_string(),
            to: to.to_string(),
            distance: weight,
        })
        .collect();

    RoutePlan { steps, found: true }
}

/// Route built straight from the search's parent pointers
fn plan_from_parents(graph: &Graph, node_map: &GraphNodeMap<&str, Cost>, goal_index: usize) -> RoutePlan {
    let Some(path) = shortest_path(node_map, goal_index) else {
        return RoutePlan::default();
    };

    let steps = path
        .windows(2)
        .map(|pair| {
            let (from, to) = (pair[0], pair[1]);
            PathStep {
                id: edge_id(from, to),
                from: from.to_string(),
                to: to.to_string(),
                distance: graph.edge_weight(from, to).unwrap_or(1.0),
            }
        })
        .collect();

    RoutePlan { steps, found: true }
}

/// Stored weights are finite by construction; anything else falls back
/// to a unit cost
fn effective_weight(weight: f64) -> f64 {
    if weight.is_finite() { weight } else { 1.0 }
}

fn label_of(graph: &Graph, id: &str) -> String {
    graph
        .node(id)
        .map(|node| node.label.clone())
        .unwrap_or_else(|| id.to_string())
}
