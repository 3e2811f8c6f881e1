use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use kernelife_core::{KernelShape, KernelSlotConfig, RuleParams, Simulation, SimulationConfig};
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

fn bench_simulation_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_step");
    group.sample_size(env_or("KL_BENCH_SAMPLES", 20_usize).max(10));
    group.warm_up_time(Duration::from_secs(env_or("KL_BENCH_WARMUP_SECS", 2)));
    group.measurement_time(Duration::from_secs(env_or("KL_BENCH_MEASURE_SECS", 8)));
    let steps: usize = env_or("KL_BENCH_STEPS", 16_usize).max(1);
    let sizes: Vec<usize> = std::env::var("KL_BENCH_SIZES")
        .ok()
        .map(|s| {
            s.split(',')
                .filter_map(|t| t.trim().parse::<usize>().ok())
                .collect::<Vec<_>>()
        })
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| vec![128_usize, 256, 512]);

    let rules = RuleParams::default();
    for &size in &sizes {
        for (label, kernels) in [
            ("ring", vec![KernelSlotConfig::default()]),
            (
                "ring+checkerboard",
                vec![
                    KernelSlotConfig::default(),
                    KernelSlotConfig {
                        shape: KernelShape::Checkerboard {
                            size: 15,
                            blur_sigma: 1.0,
                        },
                        gain: 0.25,
                        active: true,
                    },
                ],
            ),
        ] {
            group.bench_function(format!("{label}_{size}x{size}_steps{steps}"), |b| {
                b.iter_batched(
                    || {
                        Simulation::new(SimulationConfig {
                            width: size,
                            height: size,
                            rng_seed: Some(0xBEEF),
                            kernels: kernels.clone(),
                            ..SimulationConfig::default()
                        })
                        .expect("valid bench config")
                    },
                    |mut sim| {
                        for _ in 0..steps {
                            std::hint::black_box(sim.step(&rules, 1.0 / 60.0));
                        }
                        sim
                    },
                    BatchSize::LargeInput,
                );
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_simulation_steps);
criterion_main!(benches);
