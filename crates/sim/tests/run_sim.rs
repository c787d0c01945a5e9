//! End-to-end motion scenarios on the virtual-time harness.
//!
//! Each test replays one of the canonical motion stories (constant cruise,
//! pure trapezoid, reversal mid-flight, stop during cruise, continuous run)
//! and checks the pulse trace the application would observe on hardware.

use std::sync::atomic::{AtomicUsize, Ordering};

use sim::SimHarness;
use stepper_motion::{Direction, MotionEvent, RampProfile};
use stepper_ramp::math::start_interval;

fn trapezoid_1ms() -> RampProfile {
    RampProfile::trapezoidal(1_000_000, 500, 500).unwrap()
}

#[test]
fn constant_cruise_fires_five_evenly_spaced_pulses() {
    static COMPLETED: AtomicUsize = AtomicUsize::new(0);
    fn on_event(event: MotionEvent) {
        if event == MotionEvent::StepsCompleted {
            COMPLETED.fetch_add(1, Ordering::SeqCst);
        }
    }

    let mut sim = SimHarness::new();
    sim.controller()
        .set_ramp(RampProfile::constant(1_000_000))
        .unwrap();
    sim.controller().set_event_callback(Some(on_event));

    sim.controller().move_by(5).unwrap();
    let fired = sim.run_until_idle(10).unwrap();

    assert_eq!(fired, 5);
    assert_eq!(sim.driver().pulses(), vec![Direction::Positive; 5]);
    // 1 ms spacing on the virtual clock, pulse for pulse.
    let timestamps: Vec<u64> = sim.trace().iter().map(|e| e.at_ns).collect();
    assert_eq!(
        timestamps,
        vec![1_000_000, 2_000_000, 3_000_000, 4_000_000, 5_000_000]
    );
    assert_eq!(COMPLETED.load(Ordering::SeqCst), 1);
}

#[test]
fn short_trapezoid_move_is_a_symmetric_triangle() {
    let mut sim = SimHarness::new();
    sim.controller().set_ramp(trapezoid_1ms()).unwrap();

    // 1000 steps cannot reach cruise speed (the acceleration limit alone is
    // 1000 steps), so the plan splits 500/500 with no cruise phase.
    sim.controller().move_by(1000).unwrap();
    let fired = sim.run_until_idle(2000).unwrap();
    assert_eq!(fired, 1000);
    assert_eq!(sim.controller().position(), 1000);

    let intervals = sim.intervals();
    assert_eq!(intervals[0], start_interval(500));
    assert_eq!(*intervals.last().unwrap(), start_interval(500));
    for pair in intervals[..500].windows(2) {
        assert!(pair[0] >= pair[1], "accelerating flank must shrink: {pair:?}");
    }
    // The deceleration flank grows monotonically up to the final interval,
    // which is snapped onto the standstill interval.
    for pair in intervals[500..999].windows(2) {
        assert!(pair[0] <= pair[1], "braking flank must grow: {pair:?}");
    }
}

#[test]
fn negative_move_latches_direction_before_the_first_pulse() {
    let mut sim = SimHarness::new();
    sim.controller()
        .set_ramp(RampProfile::constant(2_000_000))
        .unwrap();

    sim.controller().move_by(-10).unwrap();
    assert_eq!(sim.driver().latched_direction(), Some(Direction::Negative));
    assert_eq!(sim.driver().pulse_count(), 0);

    sim.run_until_idle(20).unwrap();
    assert_eq!(sim.driver().pulses(), vec![Direction::Negative; 10]);
    assert_eq!(sim.controller().position(), -10);
}

#[test]
fn reversal_mid_flight_brakes_first_then_retargets() {
    static COMPLETED: AtomicUsize = AtomicUsize::new(0);
    fn on_event(event: MotionEvent) {
        if event == MotionEvent::StepsCompleted {
            COMPLETED.fetch_add(1, Ordering::SeqCst);
        }
    }

    let mut sim = SimHarness::new();
    sim.controller().set_ramp(trapezoid_1ms()).unwrap();
    sim.controller().set_event_callback(Some(on_event));

    sim.controller().move_by(200).unwrap();
    sim.run_pulses(20);
    assert_eq!(sim.controller().position(), 20);

    // Opposite-direction re-target while accelerating: the motor brakes to
    // rest, flips the direction pin once, and covers both the remaining 100
    // steps and the brake-phase overshoot.
    sim.controller().move_by(-100).unwrap();
    sim.run_until_idle(500).unwrap();

    let pulses = sim.driver().pulses();
    let first_negative = pulses
        .iter()
        .position(|&d| d == Direction::Negative)
        .expect("no reverse pulses recorded");
    // Every pulse before the flip is positive, every one after negative:
    // no wrong-direction pulses sneak into the brake phase.
    assert!(pulses[..first_negative]
        .iter()
        .all(|&d| d == Direction::Positive));
    assert!(pulses[first_negative..]
        .iter()
        .all(|&d| d == Direction::Negative));

    // The brake phase overshot past the command point; the reverse plan
    // covers it, landing exactly 100 steps below the command-time position.
    let overshoot = first_negative - 20;
    assert!(overshoot > 0, "expected a non-empty brake phase");
    assert_eq!(pulses.len() - first_negative, 100 + overshoot);
    assert_eq!(sim.controller().position(), 20 - 100);
    assert_eq!(COMPLETED.load(Ordering::SeqCst), 1);
}

#[test]
fn stop_during_cruise_brakes_over_the_deceleration_limit() {
    static COMPLETED: AtomicUsize = AtomicUsize::new(0);
    fn on_event(event: MotionEvent) {
        if event == MotionEvent::StepsCompleted {
            COMPLETED.fetch_add(1, Ordering::SeqCst);
        }
    }

    let mut sim = SimHarness::new();
    sim.controller().set_ramp(trapezoid_1ms()).unwrap();
    sim.controller().set_event_callback(Some(on_event));

    sim.controller().move_by(10_000).unwrap();
    // 1000 acceleration steps, then cruise; pulse 5000 is mid-cruise.
    sim.run_pulses(5000);

    sim.controller().stop().unwrap();
    let braking = sim.run_until_idle(2000).unwrap();

    // Braking from cruise speed takes v² / (2 * d) = 1000 steps.
    assert_eq!(braking, 1000);
    assert_eq!(sim.controller().position(), 6000);
    assert_eq!(COMPLETED.load(Ordering::SeqCst), 1);

    // The braking tail never speeds up again.
    let intervals = sim.intervals();
    let tail = &intervals[5000..];
    for pair in tail.windows(2) {
        assert!(pair[0] <= pair[1], "braking tail must grow: {pair:?}");
    }
    assert_eq!(*tail.last().unwrap(), start_interval(500));
}

#[test]
fn continuous_run_holds_until_stopped() {
    static COMPLETED: AtomicUsize = AtomicUsize::new(0);
    fn on_event(event: MotionEvent) {
        if event == MotionEvent::StepsCompleted {
            COMPLETED.fetch_add(1, Ordering::SeqCst);
        }
    }

    let mut sim = SimHarness::new();
    sim.controller().set_ramp(trapezoid_1ms()).unwrap();
    sim.controller().set_event_callback(Some(on_event));

    sim.controller().run(Direction::Positive).unwrap();
    sim.run_pulses(10_000);

    // Ten thousand pulses in, the run shows no sign of winding down.
    assert!(sim.controller().is_moving());
    assert_eq!(sim.controller().position(), 10_000);
    assert_eq!(COMPLETED.load(Ordering::SeqCst), 0);

    sim.controller().stop().unwrap();
    let braking = sim.run_until_idle(2000).unwrap();

    assert_eq!(braking, 1000);
    assert!(!sim.controller().is_moving());
    assert_eq!(sim.driver().pulse_count(), 11_000);
    assert_eq!(COMPLETED.load(Ordering::SeqCst), 1);
}
