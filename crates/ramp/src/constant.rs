//! Constant-velocity ramp generator.
//!
//! The simplest possible interval source: every pulse of a move is separated
//! by the profile's interval, and a stop request drops the remaining steps
//! on the floor. Useful for slow axes and for tests that need exactly
//! predictable timing.

use crate::RampGenerator;

/// Configuration for [`ConstantRamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstantProfile {
    /// Interval between step pulses in nanoseconds.
    pub interval_ns: u64,
}

/// Constant-rate ramp generator.
#[derive(Debug)]
pub struct ConstantRamp {
    profile: ConstantProfile,
    interval_ns: u64,
    steps_left: u32,
}

impl ConstantRamp {
    /// Create a generator for `profile`, at rest.
    pub fn new(profile: ConstantProfile) -> Self {
        Self {
            profile,
            interval_ns: 0,
            steps_left: 0,
        }
    }

    /// Drop any in-flight plan.
    pub fn reset(&mut self) {
        self.interval_ns = 0;
        self.steps_left = 0;
    }
}

impl RampGenerator for ConstantRamp {
    fn prepare_move(&mut self, steps: u32) -> u64 {
        self.interval_ns = self.profile.interval_ns;
        self.steps_left = steps;

        steps as u64
    }

    /// A constant ramp has no deceleration tail; the motor halts after the
    /// pulse currently in flight.
    fn prepare_stop(&mut self) -> u64 {
        self.steps_left = 0;

        0
    }

    fn get_next_interval(&mut self) -> u64 {
        if self.steps_left > 0 {
            self.steps_left -= 1;
            return self.interval_ns;
        }

        // movement finished
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_exactly_the_requested_number_of_intervals() {
        let mut ramp = ConstantRamp::new(ConstantProfile {
            interval_ns: 1_000_000,
        });

        assert_eq!(ramp.prepare_move(5), 5);
        for _ in 0..5 {
            assert_eq!(ramp.get_next_interval(), 1_000_000);
        }
        assert_eq!(ramp.get_next_interval(), 0);
        // The termination signal is sticky.
        assert_eq!(ramp.get_next_interval(), 0);
    }

    #[test]
    fn prepare_stop_halts_immediately() {
        let mut ramp = ConstantRamp::new(ConstantProfile {
            interval_ns: 500_000,
        });

        ramp.prepare_move(100);
        assert_eq!(ramp.get_next_interval(), 500_000);

        assert_eq!(ramp.prepare_stop(), 0);
        assert_eq!(ramp.get_next_interval(), 0);
    }

    #[test]
    fn zero_step_plan_is_empty() {
        let mut ramp = ConstantRamp::new(ConstantProfile {
            interval_ns: 1_000_000,
        });

        assert_eq!(ramp.prepare_move(0), 0);
        assert_eq!(ramp.get_next_interval(), 0);
    }
}
