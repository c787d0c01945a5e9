//! A `no_std` STEP/DIR step-driver adapter over `embedded-hal` output pins.
//!
//! Implements [`stepper_motion::StepDriver`] for any driver chip controlled
//! through a STEP pulse pin, a DIR level pin and an active-low nENABLE pin
//! (DRV8825, A4988, TMC2209 in legacy mode, ...).
//!
//! The microstep resolution is latched in software only: resolution strap
//! pins differ per chip and board, so wiring them up stays with the
//! integration. The latched value still feeds position bookkeeping and is
//! reported back through the driver contract.

#![no_std]

use embedded_hal::digital::{OutputPin, PinState};
use stepper_motion::{Direction, MicrostepResolution, StepDriver};

/// A step driver built from three GPIO output pins.
pub struct StepDirDriver<STEP, DIR, EN> {
    step: STEP,
    dir: DIR,
    n_enable: EN,
    resolution: MicrostepResolution,
}

impl<STEP, DIR, EN, E> StepDirDriver<STEP, DIR, EN>
where
    STEP: OutputPin<Error = E>,
    DIR: OutputPin<Error = E>,
    EN: OutputPin<Error = E>,
{
    /// Create a driver from its control pins.
    ///
    /// The pins are not touched until the first operation; call
    /// [`disable`](StepDriver::disable) during bring-up if the nENABLE line
    /// does not have a pull-up.
    pub fn new(step: STEP, dir: DIR, n_enable: EN) -> Self {
        Self {
            step,
            dir,
            n_enable,
            resolution: MicrostepResolution::Full,
        }
    }

    /// Release the pins.
    pub fn free(self) -> (STEP, DIR, EN) {
        (self.step, self.dir, self.n_enable)
    }
}

impl<STEP, DIR, EN, E> StepDriver for StepDirDriver<STEP, DIR, EN>
where
    STEP: OutputPin<Error = E>,
    DIR: OutputPin<Error = E>,
    EN: OutputPin<Error = E>,
{
    type Error = E;

    fn enable(&mut self) -> Result<(), E> {
        self.n_enable.set_low()
    }

    fn disable(&mut self) -> Result<(), E> {
        self.n_enable.set_high()
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), E> {
        let state = match direction {
            Direction::Positive => PinState::High,
            Direction::Negative => PinState::Low,
        };
        self.dir.set_state(state)
    }

    fn step(&mut self) -> Result<(), E> {
        // Driver chips want a minimum STEP high time (1-2 µs on the common
        // ones). Two consecutive register writes satisfy that on slow GPIO
        // buses; fast ports need a delay-wrapped pin.
        self.step.set_high()?;
        self.step.set_low()
    }

    fn set_microstep_resolution(
        &mut self,
        resolution: MicrostepResolution,
    ) -> Result<(), E> {
        self.resolution = resolution;
        Ok(())
    }

    fn microstep_resolution(&self) -> MicrostepResolution {
        self.resolution
    }
}
