//! In-memory stand-ins for the two hardware adapters.
//!
//! Both fakes are cheap clones around shared interior state, so the harness
//! keeps a handle for inspection while the controller owns its copy.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use stepper_motion::{Direction, MicrostepResolution, StepDriver, TimingSource};

#[derive(Debug)]
struct DriverInner {
    pulses: Vec<Direction>,
    latched: Option<Direction>,
    resolution: MicrostepResolution,
    enabled: bool,
}

impl Default for DriverInner {
    fn default() -> Self {
        Self {
            pulses: Vec::new(),
            latched: None,
            resolution: MicrostepResolution::Full,
            enabled: false,
        }
    }
}

/// A step driver that records every pulse with the direction it was emitted
/// in.
#[derive(Clone, Default)]
pub struct FakeStepDriver {
    inner: Rc<RefCell<DriverInner>>,
}

impl FakeStepDriver {
    /// All pulses emitted so far, in order.
    pub fn pulses(&self) -> Vec<Direction> {
        self.inner.borrow().pulses.clone()
    }

    /// Number of pulses emitted so far.
    pub fn pulse_count(&self) -> usize {
        self.inner.borrow().pulses.len()
    }

    /// The most recently emitted pulse, if any.
    pub fn last_pulse(&self) -> Option<Direction> {
        self.inner.borrow().pulses.last().copied()
    }

    /// The currently latched direction.
    pub fn latched_direction(&self) -> Option<Direction> {
        self.inner.borrow().latched
    }

    /// Whether the (virtual) coils are energized.
    pub fn enabled(&self) -> bool {
        self.inner.borrow().enabled
    }
}

impl StepDriver for FakeStepDriver {
    type Error = Infallible;

    fn enable(&mut self) -> Result<(), Infallible> {
        self.inner.borrow_mut().enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), Infallible> {
        self.inner.borrow_mut().enabled = false;
        Ok(())
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), Infallible> {
        self.inner.borrow_mut().latched = Some(direction);
        Ok(())
    }

    fn step(&mut self) -> Result<(), Infallible> {
        let mut inner = self.inner.borrow_mut();
        let direction = inner
            .latched
            .expect("step pulse emitted before any direction latch");
        inner.pulses.push(direction);
        Ok(())
    }

    fn set_microstep_resolution(
        &mut self,
        resolution: MicrostepResolution,
    ) -> Result<(), Infallible> {
        self.inner.borrow_mut().resolution = resolution;
        Ok(())
    }

    fn microstep_resolution(&self) -> MicrostepResolution {
        self.inner.borrow().resolution
    }
}

/// A timing source that remembers the armed interval instead of counting
/// real time. The harness reads it to know how far to advance the virtual
/// clock before the next expiry.
#[derive(Clone, Default)]
pub struct FakeTimingSource {
    armed_ns: Rc<RefCell<u64>>,
}

impl FakeTimingSource {
    /// The interval the controller last armed, or `0` when disarmed.
    pub fn armed_interval_ns(&self) -> u64 {
        *self.armed_ns.borrow()
    }
}

impl TimingSource for FakeTimingSource {
    type Error = Infallible;

    fn start(&mut self, interval_ns: u64) -> Result<(), Infallible> {
        *self.armed_ns.borrow_mut() = interval_ns;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Infallible> {
        *self.armed_ns.borrow_mut() = 0;
        Ok(())
    }

    fn interval_ns(&self) -> u64 {
        *self.armed_ns.borrow()
    }
}
