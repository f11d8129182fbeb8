use super::GraphNodeMap;

/// Construct the shortest path from the goal node back to the start
/// Returns the ordered path as a vector of nodes from start to goal, or
/// None when the map holds no chain from the goal to a root
/// node_map: GraphNodeMap<N, C> - map of nodes with their parent index and cost
/// goal_index: usize - index of the goal node in the node_map
pub fn shortest_path<N, C>(node_map: &GraphNodeMap<N, C>, goal_index: usize) -> Option<Vec<N>>
where
    N: Clone,
{

    let mut path = Vec::new();
    let mut current_index = goal_index;

    // Trace back from goal to start
    while current_index != usize::MAX {
        let (node, &(parent_index, _)) = node_map.get_index(current_index)?;
        path.push(node.clone());
        current_index = parent_index;
    }

    // The path is in reverse order, so reverse it
    path.reverse();

    if path.is_empty() {
        return None;
    }

    Some(path)
}
