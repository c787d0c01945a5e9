//! Prints the interval sequence of a short trapezoidal move as a table,
//! handy for eyeballing profile parameters before flashing them.
//!
//! Run with: `cargo run -p stepper-ramp --example print_ramp`

use stepper_ramp::{RampGenerator, TrapezoidalProfile, TrapezoidalRamp};

fn main() {
    let profile = TrapezoidalProfile::new(1_000_000, 4000, 4000).unwrap();
    let mut ramp = TrapezoidalRamp::new(profile);

    let total = ramp.prepare_move(400);
    println!("planned {total} steps");
    println!("{:>6} {:>14} {:>12}", "step", "interval (ns)", "steps/s");

    let mut step = 0u64;
    loop {
        let interval = ramp.get_next_interval();
        if interval == 0 {
            break;
        }
        step += 1;
        println!(
            "{:>6} {:>14} {:>12}",
            step,
            interval,
            1_000_000_000 / interval
        );
    }
}
