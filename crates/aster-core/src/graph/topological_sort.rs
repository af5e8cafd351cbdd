// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A deterministic implementation of Kahn's algorithm for topological
//! sorting over index-identified nodes.

/// An error indicating that a cycle was detected in the graph.
///
/// Carries the indices of the nodes that could not be ordered (every node
/// that participates in, or is downstream of, a cycle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    /// Nodes left unsorted when the algorithm ran out of roots.
    pub unsorted: Vec<usize>,
}

/// Topologically sorts the nodes `0..node_count` of a directed graph.
///
/// Edges are `(parent, child)` pairs; the parent is ordered before the
/// child. Among nodes that become ready at the same time, the one with the
/// lowest index is emitted first, so the result is stable across runs for
/// the same input; callers rely on this for reproducible rebuilds.
///
/// Returns the node indices in a valid topological order, or a
/// [`CycleError`] listing the nodes that could not be ordered.
pub fn topological_sort(
    node_count: usize,
    edges: impl IntoIterator<Item = (usize, usize)>,
) -> Result<Vec<usize>, CycleError> {
    if node_count == 0 {
        return Ok(Vec::new());
    }

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut in_degree: Vec<usize> = vec![0; node_count];

    for (parent, child) in edges {
        debug_assert!(parent < node_count && child < node_count);
        // Parallel edges are common here (several pins between the same two
        // passes); count each one so the in-degree bookkeeping stays exact.
        adjacency[parent].push(child);
        in_degree[child] += 1;
    }

    // A sorted ready-set instead of a FIFO queue keeps the output
    // deterministic: always pick the smallest ready index.
    let mut ready: Vec<usize> = (0..node_count).filter(|&n| in_degree[n] == 0).collect();
    ready.sort_unstable_by(|a, b| b.cmp(a));

    let mut sorted = Vec::with_capacity(node_count);
    while let Some(node) = ready.pop() {
        sorted.push(node);
        for &child in &adjacency[node] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                let pos = match ready.binary_search_by(|x| child.cmp(x)) {
                    Ok(pos) | Err(pos) => pos,
                };
                ready.insert(pos, child);
            }
        }
    }

    if sorted.len() != node_count {
        let unsorted = (0..node_count).filter(|&n| in_degree[n] > 0).collect();
        Err(CycleError { unsorted })
    } else {
        Ok(sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_graph() {
        assert_eq!(topological_sort(0, []), Ok(Vec::new()));
    }

    #[test]
    fn chain_is_preserved() {
        let order = topological_sort(4, [(0, 1), (1, 2), (2, 3)]).unwrap();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn diamond_is_deterministic() {
        // 0 -> {1, 2} -> 3, with 1 and 2 ready simultaneously.
        let order = topological_sort(4, [(0, 1), (0, 2), (1, 3), (2, 3)]).unwrap();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn parallel_edges_are_counted() {
        let order = topological_sort(2, [(0, 1), (0, 1)]).unwrap();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn cycle_is_reported() {
        let err = topological_sort(3, [(0, 1), (1, 2), (2, 1)]).unwrap_err();
        assert_eq!(err.unsorted, vec![1, 2]);
    }
}
