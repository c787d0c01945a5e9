//! Virtual-time execution harness.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};
use stepper_motion::{Direction, MotionController};
use tracing::{info, instrument};

use crate::fake_hw::{FakeStepDriver, FakeTimingSource};

/// One step pulse as observed by the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Virtual timestamp of the pulse, nanoseconds since simulation start.
    pub at_ns: u64,
    /// The interval that was waited out before this pulse.
    pub interval_ns: u64,
    /// Direction the pulse was emitted in.
    pub direction: Direction,
}

/// Errors produced by the harness.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The motor was still running after the pulse budget was exhausted,
    /// which almost always means a plan that fails to terminate.
    #[error("motor still running after {0} simulated pulses")]
    Overrun(usize),
    /// Trace serialization failed.
    #[error("trace serialization: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Trace file I/O failed.
    #[error("trace i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Drives a [`MotionController`] wired to the fake adapters through virtual
/// time, recording every pulse.
pub struct SimHarness {
    controller: MotionController<FakeStepDriver, FakeTimingSource>,
    driver: FakeStepDriver,
    timing: FakeTimingSource,
    clock_ns: u64,
    trace: Vec<TraceEntry>,
}

impl Default for SimHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl SimHarness {
    /// Build a fresh controller wired to fresh fakes, at virtual time zero.
    pub fn new() -> Self {
        let driver = FakeStepDriver::default();
        let timing = FakeTimingSource::default();
        let controller = MotionController::new(driver.clone(), timing.clone());

        Self {
            controller,
            driver,
            timing,
            clock_ns: 0,
            trace: Vec::new(),
        }
    }

    /// The controller under simulation. All motion commands go through
    /// here, exactly as an application would issue them.
    pub fn controller(&self) -> &MotionController<FakeStepDriver, FakeTimingSource> {
        &self.controller
    }

    /// Inspection handle for the fake step driver.
    pub fn driver(&self) -> &FakeStepDriver {
        &self.driver
    }

    /// Current virtual time in nanoseconds.
    pub fn clock_ns(&self) -> u64 {
        self.clock_ns
    }

    /// Every pulse recorded so far.
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// The recorded intervals, in pulse order.
    pub fn intervals(&self) -> Vec<u64> {
        self.trace.iter().map(|entry| entry.interval_ns).collect()
    }

    /// Wait out the armed interval and fire the timing signal once.
    ///
    /// Returns the recorded pulse, or `None` when the timing source is
    /// disarmed (the motor is idle).
    pub fn tick(&mut self) -> Option<TraceEntry> {
        let interval_ns = self.timing.armed_interval_ns();
        if interval_ns == 0 {
            return None;
        }

        self.clock_ns += interval_ns;
        self.controller.handle_timing_signal();

        let direction = self
            .driver
            .last_pulse()
            .expect("timing signal fired without emitting a pulse");
        let entry = TraceEntry {
            at_ns: self.clock_ns,
            interval_ns,
            direction,
        };
        self.trace.push(entry);
        Some(entry)
    }

    /// Run until the controller disarms its timing source.
    ///
    /// `max_pulses` bounds the simulation; exceeding it returns
    /// [`SimError::Overrun`] instead of spinning forever.
    #[instrument(skip(self))]
    pub fn run_until_idle(&mut self, max_pulses: usize) -> Result<usize, SimError> {
        let mut fired = 0;
        while self.timing.armed_interval_ns() > 0 {
            if fired >= max_pulses {
                return Err(SimError::Overrun(max_pulses));
            }
            self.tick();
            fired += 1;
        }

        info!(
            pulses = fired,
            clock_ns = self.clock_ns,
            position = self.controller.position(),
            "motion settled"
        );
        Ok(fired)
    }

    /// Fire exactly `count` pulses; panics if the motor goes idle early.
    /// Used by scenarios that interrupt a move at a known point.
    pub fn run_pulses(&mut self, count: usize) {
        for fired in 0..count {
            assert!(
                self.tick().is_some(),
                "motor went idle after {fired} of {count} pulses"
            );
        }
    }

    /// Dump the recorded trace as pretty-printed JSON.
    #[instrument(skip(self))]
    pub fn dump_trace(&self, path: &Path) -> Result<(), SimError> {
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(file, &self.trace)?;
        info!(path = %path.display(), entries = self.trace.len(), "trace written");
        Ok(())
    }
}
