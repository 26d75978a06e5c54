use ndarray::Array2;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use netpath_core::graph::Graph;
use netpath_common::error::Error;

pub const NUM_LAYERS: usize = 12;
pub const LAYER_WIDTH: usize = 40;
/// Chance that a vertex links to a given vertex of the next layer.
pub const EDGE_DENSITY: f64 = 0.15;

pub const NUM_PATHS: usize = 2_000;
pub const NUM_FEATURES: usize = 60;
pub const NUM_COMPONENTS: usize = 4;

pub const SEED: u64 = 2024;

pub fn bench_rng() -> SmallRng {
    SmallRng::seed_from_u64(SEED)
}

/// Builds `"s" -> layer 0 -> ... -> layer n-1 -> "t"`, with random weights in
/// `[0.1, 5)` and random links between consecutive layers.
///
/// Every vertex keeps at least one outgoing edge so the sink stays reachable.
pub fn layered_graph<R: Rng>(
    layers: usize,
    width: usize,
    density: f64,
    rng: &mut R,
) -> Result<Graph, Error> {
    let mut graph = Graph::with_capacity(layers * width + 2, layers * width * width);

    let source = graph.add_vertex("s")?;
    let mut grid: Vec<Vec<usize>> = Vec::with_capacity(layers);
    for l in 0..layers {
        let layer = (0..width)
            .map(|i| graph.add_vertex(&format!("g{}_{}", l, i)))
            .collect::<Result<Vec<_>, _>>()?;
        grid.push(layer);
    }
    let sink = graph.add_vertex("t")?;

    let link = |graph: &mut Graph, from: usize, to: usize, rng: &mut R| {
        let weight = rng.random_range(0.1..5.0);
        graph
            .add_edge(from, to, weight, &format!("c{}_{}", from, to))
            .map(|_| ())
    };

    if let (Some(first), Some(last)) = (grid.first(), grid.last()) {
        for &v in first {
            link(&mut graph, source, v, rng)?;
        }
        for &v in last {
            link(&mut graph, v, sink, rng)?;
        }
    }
    for pair in grid.windows(2) {
        for &u in &pair[0] {
            let mut linked = false;
            for &v in &pair[1] {
                if rng.random::<f64>() < density {
                    link(&mut graph, u, v, rng)?;
                    linked = true;
                }
            }
            if !linked {
                let v = pair[1][rng.random_range(0..pair[1].len())];
                link(&mut graph, u, v, rng)?;
            }
        }
    }
    Ok(graph)
}

/// A `rows × cols` binary path matrix drawn from `components` random prototypes,
/// each bit flipped with probability `noise`.
pub fn clustered_matrix<R: Rng>(
    rows: usize,
    cols: usize,
    components: usize,
    noise: f64,
    rng: &mut R,
) -> Array2<f64> {
    let prototypes: Vec<Vec<bool>> = (0..components.max(1))
        .map(|_| (0..cols).map(|_| rng.random::<bool>()).collect())
        .collect();

    let mut x = Array2::zeros((rows, cols));
    for (i, mut row) in x.rows_mut().into_iter().enumerate() {
        let prototype = &prototypes[i % prototypes.len()];
        for (value, &bit) in row.iter_mut().zip(prototype) {
            let flipped = rng.random::<f64>() < noise;
            *value = if bit != flipped { 1.0 } else { 0.0 };
        }
    }
    x
}
