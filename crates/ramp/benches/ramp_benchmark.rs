use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stepper_ramp::{RampGenerator, TrapezoidalProfile, TrapezoidalRamp};

fn benchmark_trapezoidal_ramp(c: &mut Criterion) {
    let profile = TrapezoidalProfile::new(50_000, 20_000, 20_000).unwrap();

    c.bench_function("trapezoidal_10k_step_move", |b| {
        b.iter(|| {
            // Plan and fully consume a 10k step move, the way the timer
            // callback would, one interval per pulse.
            let mut ramp = TrapezoidalRamp::new(profile);
            let total = ramp.prepare_move(black_box(10_000));
            let mut sum = 0u64;
            loop {
                let interval = ramp.get_next_interval();
                if interval == 0 {
                    break;
                }
                sum += interval;
            }
            black_box((total, sum))
        })
    });

    c.bench_function("trapezoidal_single_interval", |b| {
        let mut ramp = TrapezoidalRamp::new(profile);
        ramp.prepare_move(u32::MAX);
        // Steady-state cost of the per-step recurrence, the figure that has
        // to fit inside one step interval on the target.
        b.iter(|| black_box(ramp.get_next_interval()));
    });
}

criterion_group!(benches, benchmark_trapezoidal_ramp);
criterion_main!(benches);
