//! Trapezoidal ramp generator built on the AVR446 recurrence.
//!
//! The exact interval between pulses `n` and `n + 1` under constant
//! acceleration is `c_n = c_0 * (sqrt(n + 1) - sqrt(n))`. Computing square
//! roots per step is out of the question at interrupt rates, so AVR446
//! ("Linear speed control of stepper motor") substitutes the recurrence
//!
//! ```text
//! c_{n+1} = c_n - 2 * c_n / (4 * n + 1)    while accelerating
//! c_{n+1} = c_n + 2 * c_n / (4 * n - 1)    while decelerating
//! ```
//!
//! with the first interval scaled by 0.676 to cancel the recurrence's
//! startup bias. The division remainder is carried into the next step so
//! rounding error does not accumulate.
//!
//! A plan is at most four phases, consumed in order: pre-deceleration (only
//! when re-targeting to a slower cruise speed while moving), acceleration,
//! cruise, deceleration.

use crate::math;
use crate::{RampError, RampGenerator};

/// Configuration for [`TrapezoidalRamp`].
///
/// Rates are validated at construction; a profile with a zero acceleration
/// or deceleration rate cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct TrapezoidalProfile {
    interval_ns: u64,
    acceleration_rate: u32,
    deceleration_rate: u32,
}

impl TrapezoidalProfile {
    /// Build a profile targeting `interval_ns` between pulses at cruise
    /// speed, accelerating at `acceleration_rate` and braking at
    /// `deceleration_rate` (both in steps/s²).
    pub fn new(
        interval_ns: u64,
        acceleration_rate: u32,
        deceleration_rate: u32,
    ) -> Result<Self, RampError> {
        if acceleration_rate == 0 {
            return Err(RampError::ZeroAccelerationRate);
        }
        if deceleration_rate == 0 {
            return Err(RampError::ZeroDecelerationRate);
        }

        Ok(Self {
            interval_ns,
            acceleration_rate,
            deceleration_rate,
        })
    }

    /// Interval between pulses at cruise speed, in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.interval_ns
    }

    /// Acceleration rate in steps/s².
    pub fn acceleration_rate(&self) -> u32 {
        self.acceleration_rate
    }

    /// Deceleration rate in steps/s².
    pub fn deceleration_rate(&self) -> u32 {
        self.deceleration_rate
    }
}

/// Working memory of an in-flight trapezoidal plan.
///
/// `current_interval` doubles as the "are we moving, and how fast" query
/// that `prepare_move` uses to decide between speeding up and slowing down
/// when re-targeting.
#[derive(Debug, Default)]
struct TrapezoidalState {
    pre_decel_steps_left: u32,
    accel_steps_left: u32,
    run_steps_left: u32,
    decel_steps_left: u32,
    run_interval: u64,
    first_acceleration_interval: u64,
    last_deceleration_interval: u64,
    interval_remainder: u64,
    acceleration_idx: u32,
    current_interval: u64,
}

impl TrapezoidalState {
    fn next_accel_interval(&mut self) {
        self.accel_steps_left -= 1;

        if self.acceleration_idx == 0 {
            self.acceleration_idx = 1;
            self.interval_remainder = 0;
            self.current_interval = self.first_acceleration_interval;
            return;
        }
        self.acceleration_idx += 1;

        let numerator = 2 * self.current_interval + self.interval_remainder;
        let denominator = 4 * self.acceleration_idx as u64;

        self.interval_remainder = numerator % denominator;
        self.current_interval -= numerator / denominator;
    }

    /// Braking towards a slower cruise speed: the interval grows, anchored
    /// against the total number of deceleration steps still ahead.
    fn next_pre_decel_interval(&mut self) {
        let numerator = 2 * self.current_interval + self.interval_remainder;
        let denominator =
            4 * (self.pre_decel_steps_left as u64 + self.decel_steps_left as u64);

        self.interval_remainder = numerator % denominator;
        self.current_interval += numerator / denominator;

        self.pre_decel_steps_left -= 1;
    }

    fn next_decel_interval(&mut self) {
        self.decel_steps_left -= 1;

        if self.decel_steps_left == 0 {
            self.interval_remainder = 0;
            self.current_interval = self.last_deceleration_interval;
            return;
        }

        let numerator = 2 * self.current_interval + self.interval_remainder;
        let denominator = 4 * self.decel_steps_left as u64;

        self.interval_remainder = numerator % denominator;
        self.current_interval += numerator / denominator;
    }
}

/// Trapezoidal ramp generator.
#[derive(Debug)]
pub struct TrapezoidalRamp {
    profile: TrapezoidalProfile,
    state: TrapezoidalState,
}

impl TrapezoidalRamp {
    /// Create a generator for `profile`, at rest.
    pub fn new(profile: TrapezoidalProfile) -> Self {
        Self {
            profile,
            state: TrapezoidalState::default(),
        }
    }

    /// Drop any in-flight plan and return to rest.
    pub fn reset(&mut self) {
        self.state = TrapezoidalState::default();
    }
}

impl RampGenerator for TrapezoidalRamp {
    fn prepare_move(&mut self, steps: u32) -> u64 {
        let profile = &self.profile;
        let state = &mut self.state;

        state.first_acceleration_interval = math::start_interval(profile.acceleration_rate);
        state.last_deceleration_interval = math::start_interval(profile.deceleration_rate);

        // steps needed to stop from the current velocity
        let stop_lim = math::steps_to_change(state.current_interval, profile.deceleration_rate);
        // steps needed to reach the cruise velocity from rest
        let accel_lim = math::steps_to_change(profile.interval_ns, profile.acceleration_rate);
        // steps needed to stop from the cruise velocity
        let decel_lim = math::steps_to_change(profile.interval_ns, profile.deceleration_rate);

        if state.current_interval != 0 && state.current_interval < profile.interval_ns {
            // Already moving faster than the requested cruise velocity:
            // brake down to it before the regular cruise/deceleration split.
            state.pre_decel_steps_left = stop_lim.saturating_sub(decel_lim);
            state.accel_steps_left = 0;
            state.acceleration_idx = accel_lim;
            state.decel_steps_left = decel_lim;

            let total_decel =
                state.pre_decel_steps_left as u64 + state.decel_steps_left as u64;
            state.run_steps_left = (steps as u64).saturating_sub(total_decel) as u32;
        } else {
            // At rest, or moving at or below the requested cruise velocity:
            // accelerate the remaining distance up to cruise.
            state.pre_decel_steps_left = 0;
            state.accel_steps_left = accel_lim.saturating_sub(stop_lim);

            if state.accel_steps_left as u64 + decel_lim as u64 >= steps as u64 {
                // Not enough distance for a full trapezoid: split the
                // available steps between the two flanks in proportion to
                // their rates, cutting the cruise phase entirely.
                state.decel_steps_left = (steps as u64 * profile.acceleration_rate as u64
                    / (profile.acceleration_rate as u64 + profile.deceleration_rate as u64))
                    as u32;
                state.accel_steps_left = steps - state.decel_steps_left;
            } else {
                state.decel_steps_left = decel_lim;
            }

            state.run_steps_left = steps
                .saturating_sub(state.accel_steps_left)
                .saturating_sub(state.decel_steps_left);
            state.acceleration_idx = 0;
        }

        state.run_interval = profile.interval_ns;

        state.pre_decel_steps_left as u64
            + state.accel_steps_left as u64
            + state.run_steps_left as u64
            + state.decel_steps_left as u64
    }

    fn prepare_stop(&mut self) -> u64 {
        let state = &mut self.state;

        let deceleration_steps =
            math::steps_to_change(state.current_interval, self.profile.deceleration_rate);

        state.pre_decel_steps_left = 0;
        state.accel_steps_left = 0;
        state.run_steps_left = 0;
        state.run_interval = 0;
        state.decel_steps_left = deceleration_steps;

        deceleration_steps as u64
    }

    fn get_next_interval(&mut self) -> u64 {
        let state = &mut self.state;

        if state.pre_decel_steps_left > 0 {
            state.next_pre_decel_interval();
        } else if state.accel_steps_left > 0 {
            state.next_accel_interval();
        } else if state.run_steps_left > 0 {
            state.run_steps_left -= 1;
            state.current_interval = state.run_interval;
        } else if state.decel_steps_left > 0 {
            state.next_decel_interval();
        } else {
            // movement finished
            state.current_interval = 0;
        }

        state.current_interval
    }
}
