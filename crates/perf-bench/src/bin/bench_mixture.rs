use std::hint::black_box;
use std::time::Instant;

use netpath_core::mixture::{BernoulliLikelihood, MixtureInit, MixtureOptions, path_mix};
use perf_bench::*;

fn main() {
    let mut rng = bench_rng();
    let x = clustered_matrix(NUM_PATHS, NUM_FEATURES, NUM_COMPONENTS, 0.05, &mut rng);

    println!(
        "--- Mixture Benchmark ({} paths x {} features, {} components) ---",
        NUM_PATHS, NUM_FEATURES, NUM_COMPONENTS
    );
    for likelihood in [BernoulliLikelihood::PresenceOnly, BernoulliLikelihood::Full] {
        let options = MixtureOptions::new(NUM_COMPONENTS, 200).with_likelihood(likelihood);

        let start_time = Instant::now();
        let fit = match path_mix(x.view(), &options, MixtureInit::Random, &mut rng) {
            Ok(fit) => fit,
            Err(e) => {
                eprintln!("Mixture fit failed: {}", e);
                return;
            }
        };
        let elapsed_time = start_time.elapsed();

        let final_likelihood = black_box(fit.log_likelihood.last().copied().unwrap_or(f64::NAN));
        println!(
            "{:?}: {} iterations, converged {}, log-likelihood {:.4}, elapsed {:?}",
            likelihood,
            fit.iterations(),
            fit.converged,
            final_likelihood,
            elapsed_time
        );
    }
}
