use criterion::*;

use dual_tree::{
    kde::{Epanechnikov, Gaussian, Kernel, KernelSum},
    metric::Euclidean,
    KdTree, TreeBuilder,
};

mod utils;

fn kernel_sum(c: &mut Criterion) {
    let (_guard, log_path) = utils::configure_logger("kernel-sum").unwrap_or_else(|e| unreachable!("{e}"));
    println!("Logging to {}", log_path.display());

    let seed = 42;
    let (cardinality, dimensionality) = (10_000, 3);
    let data = utils::random_points(cardinality, dimensionality, seed);
    let tree: KdTree = KdTree::new(data, Euclidean, &TreeBuilder::new(20)).unwrap_or_else(|e| unreachable!("{e}"));

    let gaussian = Gaussian::new(0.1).unwrap_or_else(|e| unreachable!("{e}"));
    let epanechnikov = Epanechnikov::new(0.2).unwrap_or_else(|e| unreachable!("{e}"));
    let kernels: [&dyn Kernel; 2] = [&gaussian, &epanechnikov];

    for kernel in kernels {
        let mut group = c.benchmark_group(format!("kernel-sum-{}", kernel.name()));
        group
            .sample_size(10)
            .sampling_mode(SamplingMode::Flat)
            .throughput(Throughput::Elements(cardinality as u64));

        for relative_error in [0.0, 0.01, 0.1] {
            let sum = KernelSum::new(relative_error);
            group.bench_with_input(BenchmarkId::new("serial", relative_error), &sum, |b, sum| {
                b.iter_with_large_drop(|| sum.sum(&tree, &tree, kernel));
            });
            group.bench_with_input(BenchmarkId::new("parallel", relative_error), &sum, |b, sum| {
                b.iter_with_large_drop(|| sum.par_sum(&tree, &tree, kernel));
            });
        }
        group.finish();
    }
}

criterion_group!(benches, kernel_sum);
criterion_main!(benches);
