use std::hint::black_box;
use std::time::Instant;

use netpath_core::DijkstraSolver;
use netpath_core::ranker::{PathRanker, RankOptions};
use perf_bench::*;

fn main() {
    let mut rng = bench_rng();
    let graph = match layered_graph(NUM_LAYERS, LAYER_WIDTH, EDGE_DENSITY, &mut rng) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("Failed to build benchmark graph: {}", e);
            return;
        }
    };
    let ranker = PathRanker::new(DijkstraSolver::new());

    println!(
        "--- Path Ranking Benchmark ({} vertices, {} edges) ---",
        graph.num_vertices(),
        graph.num_edges()
    );
    for k in [1, 10, 50, 200] {
        let options = RankOptions::new(k, 0);

        let start_time = Instant::now();
        let outcome = match ranker.rank(&graph, &options) {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("Ranking failed for k = {}: {}", k, e);
                return;
            }
        };
        let elapsed_time = start_time.elapsed();

        let checksum: f64 = black_box(outcome.paths.iter().map(|p| p.score).sum());
        println!(
            "k = {:>4}: {:>4} paths, {:>5} examined, checksum {:.6}, elapsed {:?}",
            k,
            outcome.paths.len(),
            outcome.examined,
            checksum,
            elapsed_time
        );
    }
}
