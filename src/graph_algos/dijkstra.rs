use super::GraphNodeMap;

use std::{collections::BinaryHeap, hash::Hash, cmp::Ordering, fmt::Debug};
use num_traits::Zero;
use indexmap::map::Entry::{Occupied, Vacant};




/// Explore the graph with Dijkstra's Algorithm
/// https://en.wikipedia.org/wiki/Dijkstra%27s_algorithm
/// Returns a map of every reachable node with its best cost from the
/// start and the index of its parent on a cheapest path. A node absent
/// from the map is unreachable - a normal outcome, not an error.
pub fn dijkstra_nodes<N, C, IT, NN>(start: N, neighbors: NN) -> GraphNodeMap<N, C>
where
    N: Eq + Hash + Clone + Debug,
    NN: Fn(&N) -> IT, // returns iterator of neighbors + costs
    IT: IntoIterator<Item = (N, C)>, // Iterator of neighbors + edge cost to neighbor node
    C: Zero + Ord + Copy + Debug,
    {

    // Frontier - binary heap ordered smallest cost first
    // We store the cost from the starting node
    let mut frontier: BinaryHeap<Visit<C>> = BinaryHeap::new();

    // Known nodes with their best cost so far
    // The tuple contains (parent_index, cost) where parent_index is the
    // index of the parent node in the map; the start node has no parent,
    // marked with usize::MAX
    let mut node_map: GraphNodeMap<N, C> = GraphNodeMap::default();

    let start_index = node_map.insert_full(start, (usize::MAX, Zero::zero())).0;
    frontier.push(Visit {
        index: start_index,
        cost: Zero::zero(),
    });

    // Pop the cheapest node each round
    while let Some(Visit { cost, index }) = frontier.pop() {

        // fetch current best cost for node
        let Some((node, &(_, best))) = node_map.get_index(index) else {
            continue;
        };

        // A cheaper path to this node was already expanded
        if cost > best {
            continue;
        }

        // loop over neighbors
        for (neighbor, edge_cost) in neighbors(node).into_iter() {

            // new cost to reach this node = edge cost + node cost
            let new_cost = edge_cost + best;

            // Keep the neighbor only if this path improves on what we know
            let neighbor_index;

            match node_map.entry(neighbor) {
                Vacant(e) => {
                    neighbor_index = e.index();
                    e.insert((index, new_cost));
                }
                Occupied(mut e) => {
                    if e.get().1 > new_cost {
                        neighbor_index = e.index();
                        e.insert((index, new_cost));
                    } else {
                        continue;
                    }
                }
            }

            frontier.push(Visit {
                index: neighbor_index,
                cost: new_cost,
            });
        }
    }

    node_map
}


/// Heap entry
/// - ordering only needs the cost and a way to find the node again
/// - reversed so the BinaryHeap pops the smallest cost
#[derive(Debug)]
struct Visit<C> {
    index: usize,
    cost: C,
}

impl<C: Ord> Ord for Visit<C> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.cmp(&self.cost)
    }
}
impl<C: Ord> PartialOrd for Visit<C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<C: PartialEq> PartialEq for Visit<C> {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}
impl<C: PartialEq> Eq for Visit<C> {}
