//! # Stepper Motion Controller
//!
//! Translates high-level motion requests ("move by N microsteps", "move to
//! position P", "run continuously", "stop") into a time-sequenced series of
//! single step pulses whose spacing follows a ramp generator from
//! [`stepper_ramp`].
//!
//! ## Architecture
//!
//! The controller sits between three collaborators, all supplied by the
//! integration:
//!
//! - a [`StepDriver`]: latches a direction and emits one pulse per request
//!   (typically a STEP/DIR GPIO pair, see the `driver-step-dir` crate);
//! - a [`TimingSource`]: a one-shot hardware timer re-armed after every
//!   pulse with the interval the ramp generator hands out;
//! - the application, which receives [`MotionEvent`]s when a motion request
//!   completes.
//!
//! The timer's interrupt handler calls
//! [`MotionController::handle_timing_signal`]. Everything else happens
//! inside that call: emitting the pulse, accounting the outstanding steps,
//! pulling the next interval, re-arming or disarming the timer, and
//! chaining a deferred reversal.
//!
//! ## Concurrency
//!
//! All controller state lives behind a `critical_section::Mutex`, so the
//! user-facing API and the interrupt path serialize against each other and
//! the controller can be placed in a `static`. Every operation is
//! non-blocking and completes in a bounded number of integer operations;
//! there is no allocation anywhere on the motion path.
//!
//! ## Events
//!
//! Completion events are delivered from whichever call finishes the motion
//! request, after the controller has released its critical section, so an
//! event callback is free to issue the next command.

#![cfg_attr(not(feature = "std"), no_std)]

mod controller;
mod driver;
mod error;
mod timing;

pub use controller::{
    DriverEventCallback, MotionController, MotionEvent, MotionEventCallback,
};
pub use driver::{Direction, MicrostepResolution, StepDriver, StepDriverEvent};
pub use error::MotionError;
pub use timing::TimingSource;

// Ramp types are part of this crate's public API surface (`set_ramp` takes
// a profile), so re-export them for downstream convenience.
pub use stepper_ramp::{
    ConstantProfile, Ramp, RampError, RampGenerator, RampProfile, TrapezoidalProfile,
};
