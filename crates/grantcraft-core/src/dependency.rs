//! Aim dependency inference.
//!
//! Aims reference each other either explicitly ("using the cohort from Aim 1")
//! or by reusing an earlier aim's endpoint. The graph is tiny (a handful of
//! aims) so the longest chain is found with a plain memoised DFS.

use crate::model::Aim;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static AIM_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\baim\s*#?\s*(\d+)").expect("valid aim reference regex"));

const MIN_ENDPOINT_LEN: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyEdge {
    /// 1-based number of the aim that is depended on.
    pub from: usize,
    /// 1-based number of the dependent aim.
    pub to: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub aim_count: usize,
    /// `adjacency[i]` lists the 0-based aims that depend on aim `i`.
    pub adjacency: Vec<Vec<usize>>,
    pub edges: Vec<DependencyEdge>,
    /// 1-based aim numbers along the longest dependency chain.
    pub longest_chain: Vec<usize>,
    pub independent_aims: Vec<usize>,
    pub has_cycle: bool,
}

impl DependencyGraph {
    pub fn dependents_of(&self, aim_index: usize) -> &[usize] {
        self.adjacency
            .get(aim_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

pub fn build(aims: &[Aim]) -> DependencyGraph {
    let n = aims.len();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut edges = Vec::new();

    let mut add_edge = |from: usize, to: usize, reason: String| {
        if from == to || from >= n || adjacency[from].contains(&to) {
            return;
        }
        adjacency[from].push(to);
        edges.push(DependencyEdge {
            from: from + 1,
            to: to + 1,
            reason,
        });
    };

    for (j, aim) in aims.iter().enumerate() {
        let text = aim.combined_text();
        let lower = text.to_lowercase();

        for caps in AIM_REFERENCE.captures_iter(&text) {
            let Some(number) = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) else {
                continue;
            };
            if number == 0 {
                continue;
            }
            add_edge(number - 1, j, format!("references Aim {}", number));
        }

        for (i, other) in aims.iter().enumerate() {
            if i == j {
                continue;
            }
            let shared = other.endpoints.iter().map(|e| e.trim()).find(|e| {
                e.chars().count() >= MIN_ENDPOINT_LEN && lower.contains(&e.to_lowercase())
            });
            if let Some(endpoint) = shared {
                add_edge(i, j, format!("uses endpoint '{}'", endpoint));
            }
        }
    }

    let (longest, has_cycle) = longest_chain(&adjacency);

    let mut touched = vec![false; n];
    for e in &edges {
        touched[e.from - 1] = true;
        touched[e.to - 1] = true;
    }
    let independent_aims = (0..n).filter(|i| !touched[*i]).map(|i| i + 1).collect();

    DependencyGraph {
        aim_count: n,
        adjacency,
        edges,
        longest_chain: longest.into_iter().map(|i| i + 1).collect(),
        independent_aims,
        has_cycle,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

/// Longest simple path (0-based) and whether a back edge was seen.
///
/// Back edges are skipped, so on cyclic input the result is the longest path
/// through the DFS tree rather than an infinite walk.
fn longest_chain(adjacency: &[Vec<usize>]) -> (Vec<usize>, bool) {
    let n = adjacency.len();
    let mut marks = vec![Mark::White; n];
    // best[i] = (length, next) of the longest chain starting at i
    let mut best: Vec<(usize, Option<usize>)> = vec![(1, None); n];
    let mut has_cycle = false;

    fn visit(
        node: usize,
        adjacency: &[Vec<usize>],
        marks: &mut [Mark],
        best: &mut [(usize, Option<usize>)],
        has_cycle: &mut bool,
    ) {
        marks[node] = Mark::Gray;
        for &next in &adjacency[node] {
            match marks[next] {
                Mark::Gray => {
                    *has_cycle = true;
                    continue;
                }
                Mark::White => visit(next, adjacency, marks, best, has_cycle),
                Mark::Black => {}
            }
            let candidate = best[next].0 + 1;
            if candidate > best[node].0 {
                best[node] = (candidate, Some(next));
            }
        }
        marks[node] = Mark::Black;
    }

    for start in 0..n {
        if marks[start] == Mark::White {
            visit(start, adjacency, &mut marks, &mut best, &mut has_cycle);
        }
    }

    let Some(start) = (0..n).max_by(|a, b| best[*a].0.cmp(&best[*b].0).then(b.cmp(a))) else {
        return (Vec::new(), has_cycle);
    };

    let mut chain = vec![start];
    let mut cursor = best[start].1;
    while let Some(next) = cursor {
        if chain.contains(&next) {
            break;
        }
        chain.push(next);
        cursor = best[next].1;
    }

    (chain, has_cycle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aim(title: &str, rationale: &str, endpoints: &[&str]) -> Aim {
        Aim {
            title: title.to_string(),
            hypothesis: String::new(),
            falsifiable: true,
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
            rationale: rationale.to_string(),
        }
    }

    #[test]
    fn infers_explicit_and_endpoint_edges() {
        let aims = vec![
            aim("Build the organoid cohort", "", &["validated organoid lines"]),
            aim("Profile signaling", "Uses validated organoid lines", &["phospho-proteome"]),
            aim("Test drugs", "Builds on Aim 2 results", &[]),
        ];
        let graph = build(&aims);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.longest_chain, vec![1, 2, 3]);
        assert!(graph.independent_aims.is_empty());
        assert!(!graph.has_cycle);
        assert_eq!(graph.dependents_of(0), &[1]);
    }

    #[test]
    fn ignores_self_and_out_of_range_references() {
        let aims = vec![
            aim("Aim 1: map the circuit", "Aim 7 is future work", &[]),
            aim("Measure behavior", "", &[]),
        ];
        let graph = build(&aims);
        assert!(graph.edges.is_empty());
        assert_eq!(graph.independent_aims, vec![1, 2]);
        assert_eq!(graph.longest_chain.len(), 1);
    }

    #[test]
    fn detects_cycles_without_looping() {
        let aims = vec![
            aim("First", "requires Aim 2", &[]),
            aim("Second", "requires Aim 1", &[]),
        ];
        let graph = build(&aims);
        assert!(graph.has_cycle);
        assert_eq!(graph.longest_chain.len(), 2);
    }

    #[test]
    fn short_endpoints_do_not_create_edges() {
        let aims = vec![
            aim("One", "", &["RNA"]),
            aim("Two", "RNA levels", &[]),
        ];
        assert!(build(&aims).edges.is_empty());
    }

    #[test]
    fn empty_input() {
        let graph = build(&[]);
        assert_eq!(graph.aim_count, 0);
        assert!(graph.longest_chain.is_empty());
    }
}
