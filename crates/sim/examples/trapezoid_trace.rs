//! Runs a trapezoidal move and a mid-flight stop on the simulation harness
//! and writes the pulse trace to `trapezoid_trace.json`.
//!
//! Run with: `cargo run -p sim --example trapezoid_trace`

use std::path::Path;

use anyhow::Result;
use sim::SimHarness;
use stepper_motion::RampProfile;

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let mut sim = SimHarness::new();
    let profile = RampProfile::trapezoidal(200_000, 20_000, 20_000)
        .expect("rates are non-zero");
    sim.controller().set_ramp(profile).unwrap();

    // Accelerate to cruise, run for a while, then brake mid-move.
    sim.controller().move_by(20_000).unwrap();
    sim.run_pulses(8_000);
    sim.controller().stop().unwrap();
    let braking = sim.run_until_idle(20_000)?;

    println!(
        "emitted {} pulses ({} of them braking) over {:.3} s of virtual time, final position {}",
        sim.driver().pulse_count(),
        braking,
        sim.clock_ns() as f64 / 1e9,
        sim.controller().position(),
    );

    let path = Path::new("trapezoid_trace.json");
    sim.dump_trace(path)?;
    println!("trace written to {}", path.display());
    Ok(())
}
