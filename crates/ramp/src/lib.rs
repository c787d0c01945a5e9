//! # Step-Interval Ramp Generators
//!
//! A ramp generator turns a movement request ("emit N step pulses") into a
//! lazy sequence of inter-step intervals, in nanoseconds. The motion
//! controller pulls one interval per pulse and re-arms its timing source with
//! it, so the generator fully determines the velocity profile of a move.
//!
//! Two generators are provided:
//!
//! - [`ConstantRamp`]: every pulse is separated by the same interval. Stops
//!   are immediate.
//! - [`TrapezoidalRamp`]: acceleration and deceleration phases around a
//!   constant-speed cruise phase, computed with the AVR446 integer
//!   recurrence. Supports re-targeting while already in motion (speed up,
//!   slow down, or brake to a stop).
//!
//! All arithmetic is 64-bit integer math. There is no floating point
//! anywhere in this crate, which keeps it usable on MCUs without an FPU and
//! makes the generated interval sequences bit-for-bit reproducible on the
//! host.
//!
//! ## Contract
//!
//! The three operations of [`RampGenerator`] are total and synchronous:
//! `prepare_move` and `prepare_stop` rewrite the plan and report how many
//! pulses it will emit; `get_next_interval` advances the plan by one step
//! and returns `0` once the plan is exhausted. Returning `0` is the sole
//! termination signal.

#![cfg_attr(not(feature = "std"), no_std)]

mod constant;
pub mod math;
mod trapezoidal;

pub use constant::{ConstantProfile, ConstantRamp};
pub use trapezoidal::{TrapezoidalProfile, TrapezoidalRamp};

/// Errors detected when constructing a ramp profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RampError {
    /// The acceleration rate of a trapezoidal profile must be non-zero.
    ZeroAccelerationRate,
    /// The deceleration rate of a trapezoidal profile must be non-zero.
    ZeroDecelerationRate,
}

/// A velocity profile, constructed at configuration time and read-only
/// afterwards. Installing a profile into a controller instantiates the
/// matching [`Ramp`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum RampProfile {
    /// Constant step rate, no acceleration handling.
    Constant(ConstantProfile),
    /// Trapezoidal acceleration/deceleration profile.
    Trapezoidal(TrapezoidalProfile),
}

impl RampProfile {
    /// Constant-rate profile with the given step interval.
    pub const fn constant(interval_ns: u64) -> Self {
        Self::Constant(ConstantProfile { interval_ns })
    }

    /// Trapezoidal profile with the given cruise interval and
    /// acceleration/deceleration rates in steps/s².
    pub fn trapezoidal(
        interval_ns: u64,
        acceleration_rate: u32,
        deceleration_rate: u32,
    ) -> Result<Self, RampError> {
        TrapezoidalProfile::new(interval_ns, acceleration_rate, deceleration_rate)
            .map(Self::Trapezoidal)
    }
}

/// The operations a ramp generator offers to the motion controller.
///
/// All methods are non-blocking and perform no I/O; they are intended to be
/// called from inside the controller's critical section, including from
/// interrupt context.
pub trait RampGenerator {
    /// Plan a movement of `steps` pulses starting from the current ramp
    /// state, which may be at rest or moving at some velocity.
    ///
    /// Returns the total number of pulses the plan will emit. A plan that is
    /// re-targeted while decelerating may emit more pulses than `steps` in
    /// order to brake first. A return value of `0` means there is nothing to
    /// do.
    fn prepare_move(&mut self, steps: u32) -> u64;

    /// Rewrite the plan so the motor decelerates to rest from its current
    /// velocity.
    ///
    /// Returns the number of pulses in the deceleration tail; `0` when the
    /// generator is already at rest (or decelerates instantly).
    fn prepare_stop(&mut self) -> u64;

    /// Return the interval in nanoseconds until the next pulse and advance
    /// the plan by one step. Returns `0` once the plan is complete.
    fn get_next_interval(&mut self) -> u64;
}

/// A ramp generator instantiated from a [`RampProfile`].
///
/// Dispatch over the variants is a plain `match`; the generators share no
/// state and no vtable.
#[derive(Debug)]
pub enum Ramp {
    /// See [`ConstantRamp`].
    Constant(ConstantRamp),
    /// See [`TrapezoidalRamp`].
    Trapezoidal(TrapezoidalRamp),
}

impl Ramp {
    /// Instantiate the generator matching `profile`, at rest.
    pub fn from_profile(profile: RampProfile) -> Self {
        match profile {
            RampProfile::Constant(p) => Self::Constant(ConstantRamp::new(p)),
            RampProfile::Trapezoidal(p) => Self::Trapezoidal(TrapezoidalRamp::new(p)),
        }
    }

    /// Discard any in-flight plan and return the generator to rest.
    ///
    /// Used when the motor is force-disabled: the next `prepare_move` must
    /// plan from standstill, not from the stale velocity of the abandoned
    /// plan.
    pub fn reset(&mut self) {
        match self {
            Self::Constant(ramp) => ramp.reset(),
            Self::Trapezoidal(ramp) => ramp.reset(),
        }
    }
}

impl From<RampProfile> for Ramp {
    fn from(profile: RampProfile) -> Self {
        Self::from_profile(profile)
    }
}

impl RampGenerator for Ramp {
    fn prepare_move(&mut self, steps: u32) -> u64 {
        match self {
            Self::Constant(ramp) => ramp.prepare_move(steps),
            Self::Trapezoidal(ramp) => ramp.prepare_move(steps),
        }
    }

    fn prepare_stop(&mut self) -> u64 {
        match self {
            Self::Constant(ramp) => ramp.prepare_stop(),
            Self::Trapezoidal(ramp) => ramp.prepare_stop(),
        }
    }

    fn get_next_interval(&mut self) -> u64 {
        match self {
            Self::Constant(ramp) => ramp.get_next_interval(),
            Self::Trapezoidal(ramp) => ramp.get_next_interval(),
        }
    }
}
