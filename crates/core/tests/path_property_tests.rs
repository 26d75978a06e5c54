use std::collections::BTreeMap;

use netpath_core::graph::{Exclusions, Graph};
use netpath_core::ranker::{PathRanker, RankOptions};
use netpath_core::sampler::NullScoreTable;
use netpath_core::scope::{ScopeOptions, scope};
use netpath_core::solver::DijkstraSolver;
use netpath_core::traits::ShortestPathSolver;
use proptest::prelude::*;
use proptest::strategy::Strategy;

const NUM_VERTICES_STRATEGY: std::ops::Range<usize> = 2usize..7;

/// Vertex 0 is `"s"`, the last vertex is `"t"`. Self loops and repeated pairs are
/// dropped so every pair carries exactly one weight.
fn graph_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize, f64)>)> {
    NUM_VERTICES_STRATEGY.prop_flat_map(|n| {
        let edge_generator = (0usize..n, 0usize..n, 0.01f64..10.0);
        let edges_generator = prop::collection::vec(edge_generator, 1..30).prop_map(|edges| {
            let mut pairs = BTreeMap::new();
            for (u, v, w) in edges {
                if u != v {
                    pairs.entry((u, v)).or_insert(w);
                }
            }
            pairs.into_iter().map(|((u, v), w)| (u, v, w)).collect::<Vec<_>>()
        });

        (Just(n), edges_generator)
    })
}

fn build(n: usize, edges: &[(usize, usize, f64)]) -> Graph {
    let mut g = Graph::new();
    for i in 0..n {
        let name = match i {
            0 => "s".to_string(),
            i if i == n - 1 => "t".to_string(),
            i => format!("g{}", i),
        };
        g.add_vertex(&name).unwrap();
    }
    for &(u, v, w) in edges {
        g.add_edge(u, v, w, &format!("c{}_{}", u, v)).unwrap();
    }
    g
}

/// Every loop-free `from -> to` walk with its score, by exhaustive search.
fn simple_paths(n: usize, edges: &[(usize, usize, f64)], from: usize, to: usize) -> Vec<(Vec<usize>, f64)> {
    fn extend(
        edges: &[(usize, usize, f64)],
        to: usize,
        stack: &mut Vec<usize>,
        score: f64,
        out: &mut Vec<(Vec<usize>, f64)>,
    ) {
        let Some(&u) = stack.last() else { return };
        if u == to {
            out.push((stack.clone(), score));
            return;
        }
        for &(a, b, w) in edges {
            if a == u && !stack.contains(&b) {
                stack.push(b);
                extend(edges, to, stack, score + w, out);
                stack.pop();
            }
        }
    }

    let mut out = Vec::new();
    if from < n && to < n {
        extend(edges, to, &mut vec![from], 0.0, &mut out);
    }
    out
}

fn path_score(edges: &[(usize, usize, f64)], vertices: &[usize]) -> f64 {
    vertices
        .windows(2)
        .map(|w| {
            edges
                .iter()
                .find(|&&(a, b, _)| a == w[0] && b == w[1])
                .map_or(f64::NAN, |e| e.2)
        })
        .sum()
}

proptest! {
    /// Property: Dijkstra finds the cheapest loop-free path on positive weights.
    #[test]
    fn shortest_path_matches_exhaustive_search((n, edges) in graph_strategy()) {
        let g = build(n, &edges);
        let found = DijkstraSolver::new()
            .shortest_path(&g, 0, n - 1, &Exclusions::new())
            .unwrap();
        let best = simple_paths(n, &edges, 0, n - 1)
            .into_iter()
            .map(|(_, s)| s)
            .min_by(f64::total_cmp);

        match (found, best) {
            (None, None) => {}
            (Some(path), Some(best)) => {
                prop_assert!((path.score - best).abs() < 1e-9);
                prop_assert_eq!(path.vertices.first(), Some(&0));
                prop_assert_eq!(path.vertices.last(), Some(&(n - 1)));
                prop_assert!(path.is_loopless());
            }
            (found, best) => prop_assert!(false, "solver {:?} vs exhaustive {:?}", found, best),
        }
    }

    /// Property: an unbounded ranking without the hop filter lists every loop-free
    /// `s -> t` path with an interior vertex, each once, ascending by score.
    #[test]
    fn ranking_enumerates_all_loopless_paths((n, edges) in graph_strategy()) {
        let g = build(n, &edges);
        let options = RankOptions::new(10_000, 0).with_trivial_hop_factor(None);
        let outcome = PathRanker::<DijkstraSolver>::default().rank(&g, &options).unwrap();

        let mut expected: Vec<Vec<usize>> = simple_paths(n, &edges, 0, n - 1)
            .into_iter()
            .map(|(p, _)| p)
            .filter(|p| p.len() >= 3)
            .collect();
        expected.sort();

        let mut ranked: Vec<Vec<usize>> = outcome.paths.iter().map(|p| p.vertices.clone()).collect();
        ranked.sort();
        prop_assert_eq!(ranked, expected);
        prop_assert!(outcome.exhausted);

        for pair in outcome.paths.windows(2) {
            prop_assert!(pair[0].score <= pair[1].score);
        }
        for p in &outcome.paths {
            prop_assert!(p.is_loopless());
            prop_assert!((p.score - path_score(&edges, &p.vertices)).abs() < 1e-9);
        }
    }

    /// Property: ranking never reports a path cheaper than the shortest one, never
    /// more than `k` paths, and gives the same answer when repeated.
    #[test]
    fn ranking_is_bounded_and_repeatable((n, edges) in graph_strategy(), k in 1usize..6) {
        let g = build(n, &edges);
        let options = RankOptions::new(k, 0);
        let ranker = PathRanker::<DijkstraSolver>::default();
        let first = ranker.rank(&g, &options).unwrap();
        let second = ranker.rank(&g, &options).unwrap();

        prop_assert!(first.paths.len() <= k);
        prop_assert_eq!(&first, &second);
        if let Some(shortest) = DijkstraSolver::new()
            .shortest_path(&g, 0, n - 1, &Exclusions::new())
            .unwrap()
        {
            for p in &first.paths {
                prop_assert!(p.score >= shortest.score - 1e-9);
            }
        } else {
            prop_assert!(first.paths.is_empty());
        }
    }

    /// Property: significant neighbourhood paths are loop-free, avoid the source,
    /// end at their target and beat the significance threshold.
    #[test]
    fn scope_paths_are_loop_free_and_significant(
        (n, edges) in graph_strategy(),
        null in prop::collection::vec(prop::collection::vec(0.0f64..30.0, 20), 1..5),
        alpha in 0.01f64..0.5,
    ) {
        // Nothing leads back into the source.
        let edges: Vec<_> = edges.into_iter().filter(|&(_, v, _)| v != 0).collect();
        let g = build(n, &edges);
        let table = NullScoreTable::from_rows(null).unwrap();
        let options = ScopeOptions { alpha, early_exit: None };
        let result = scope(&g, &table, &options).unwrap();

        prop_assert_eq!(result.scope.len(), result.paths.len());
        for (name, path) in result.scope.iter().zip(&result.paths) {
            prop_assert_eq!(name, &path.target);
            prop_assert_eq!(path.genes.last(), Some(&path.target));
            prop_assert!(!path.genes.iter().any(|gene| gene == "s"));
            let mut genes = path.genes.clone();
            genes.sort();
            genes.dedup();
            prop_assert_eq!(genes.len(), path.genes.len());
            prop_assert!(path.genes.len() <= table.max_length());
            prop_assert_eq!(path.weights.len() + 1, path.genes.len());
            prop_assert!(path.p_value < alpha);
        }
    }
}
