//! # Motion Simulation Harness
//!
//! Runs the stepper motion controller against in-memory stand-ins for the
//! hardware adapters, on a virtual clock: every armed timer interval is
//! "waited out" by advancing the clock and firing the controller's timing
//! signal handler, exactly the way the hardware expiry interrupt would.
//!
//! This makes every end-to-end motion scenario (ramps, reversals,
//! mid-flight stops, continuous runs) a deterministic host test, and the
//! captured step trace can be dumped as JSON for regression analysis and
//! plotting.

pub mod fake_hw;
pub mod harness;

pub use fake_hw::{FakeStepDriver, FakeTimingSource};
pub use harness::{SimError, SimHarness, TraceEntry};
