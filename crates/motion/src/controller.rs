//! The motion controller state machine.

use core::cell::RefCell;

use critical_section::Mutex;
use stepper_ramp::{Ramp, RampGenerator, RampProfile};

use crate::driver::{Direction, MicrostepResolution, StepDriver, StepDriverEvent};
use crate::error::MotionError;
use crate::timing::TimingSource;

/// Events describing the lifecycle of a motion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum MotionEvent {
    /// The steps requested by `move_by`, `move_to` or `run` have all been
    /// executed (for `run`, after the `stop` deceleration finished).
    StepsCompleted,
    /// A `stop` request halted the motor without a deceleration tail:
    /// either it was already at rest, or the installed ramp stops
    /// instantly.
    Stopped,
}

/// Callback invoked when a motion request completes.
///
/// Delivered outside the controller's critical section, so the callback may
/// call back into the controller (e.g. to start the next move).
pub type MotionEventCallback = fn(MotionEvent);

/// Callback for hardware events forwarded from the step driver.
pub type DriverEventCallback = fn(StepDriverEvent);

/// An event captured inside the critical section, delivered after it.
type PendingEvent = Option<(MotionEventCallback, MotionEvent)>;

/// Outstanding work for the current motion request.
///
/// `Finite(n)` is the signed number of pulses still to emit; each pulse
/// subtracts the direction delta, so it counts toward zero while moving
/// toward the target and *away* from zero while braking in the opposite
/// direction, which keeps relative moves anchored to the position at
/// command time. `Continuous` runs until a `stop` request and is never
/// decremented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Finite(i32),
    Continuous(Direction),
}

impl Progress {
    fn is_idle(self) -> bool {
        matches!(self, Progress::Finite(0))
    }
}

struct ControllerState<D, T> {
    driver: D,
    timing: T,
    ramp: Option<Ramp>,
    direction: Direction,
    progress: Progress,
    position: i32,
    event_callback: Option<MotionEventCallback>,
    driver_event_callback: Option<DriverEventCallback>,
    fault_count: u32,
}

/// The motion controller.
///
/// Owns the step driver, the timing source and the installed ramp
/// generator behind a short critical-section lock, so the user-facing API
/// and the timer interrupt observe a consistent state tuple. All methods
/// take `&self`; a controller for `Send` adapters can live in a `static`
/// and be shared with the interrupt handler.
pub struct MotionController<D, T> {
    state: Mutex<RefCell<ControllerState<D, T>>>,
}

impl<D, T> MotionController<D, T>
where
    D: StepDriver,
    T: TimingSource,
{
    /// Create a controller around the two adapters.
    ///
    /// No ramp is installed yet; motion commands are rejected with
    /// [`MotionError::NoRamp`] until [`set_ramp`](Self::set_ramp) is called.
    pub fn new(driver: D, timing: T) -> Self {
        Self {
            state: Mutex::new(RefCell::new(ControllerState {
                driver,
                timing,
                ramp: None,
                direction: Direction::Positive,
                progress: Progress::Finite(0),
                position: 0,
                event_callback: None,
                driver_event_callback: None,
                fault_count: 0,
            })),
        }
    }

    /// Energize the motor and re-latch the current direction into the
    /// driver.
    pub fn enable(&self) -> Result<(), MotionError<D::Error, T::Error>> {
        critical_section::with(|cs| {
            let state = &mut *self.state.borrow_ref_mut(cs);
            state.driver.enable().map_err(MotionError::Driver)?;
            let direction = state.direction;
            state.driver.set_direction(direction).map_err(MotionError::Driver)
        })
    }

    /// De-energize the motor. Any in-flight motion is abandoned: the timing
    /// source is disarmed, the outstanding-step counter cleared and the
    /// ramp returned to standstill. No completion event is emitted.
    pub fn disable(&self) -> Result<(), MotionError<D::Error, T::Error>> {
        critical_section::with(|cs| {
            let state = &mut *self.state.borrow_ref_mut(cs);
            state.timing.stop().map_err(MotionError::Timing)?;
            state.progress = Progress::Finite(0);
            if let Some(ramp) = state.ramp.as_mut() {
                ramp.reset();
            }
            state.driver.disable().map_err(MotionError::Driver)
        })
    }

    /// Install (or replace) the ramp generator from a profile.
    ///
    /// Refused with [`MotionError::Busy`] while the motor is moving: the
    /// new generator would start from standstill state and lose the current
    /// velocity.
    pub fn set_ramp(
        &self,
        profile: RampProfile,
    ) -> Result<(), MotionError<D::Error, T::Error>> {
        critical_section::with(|cs| {
            let state = &mut *self.state.borrow_ref_mut(cs);
            if !state.progress.is_idle() {
                return Err(MotionError::Busy);
            }
            state.ramp = Some(Ramp::from_profile(profile));
            Ok(())
        })
    }

    /// Move by `microsteps` relative to the current position. The sign
    /// selects the direction.
    ///
    /// If the motor is already moving the other way, it first decelerates
    /// to rest and then launches toward the new target; the brake-phase
    /// overshoot is accounted for, so the motor ends exactly `microsteps`
    /// away from where it was when the command was accepted.
    ///
    /// `move_by(0)` is a logical no-op that fires
    /// [`MotionEvent::StepsCompleted`] immediately.
    pub fn move_by(
        &self,
        microsteps: i32,
    ) -> Result<(), MotionError<D::Error, T::Error>> {
        let pending = critical_section::with(|cs| {
            let state = &mut *self.state.borrow_ref_mut(cs);
            state.move_by(microsteps)
        })?;
        Self::deliver(pending);
        Ok(())
    }

    /// Move to the absolute position `target` (in microsteps, relative to
    /// the reference set with [`set_position`](Self::set_position)).
    pub fn move_to(
        &self,
        target: i32,
    ) -> Result<(), MotionError<D::Error, T::Error>> {
        let pending = critical_section::with(|cs| {
            let state = &mut *self.state.borrow_ref_mut(cs);
            let delta = target.wrapping_sub(state.position);
            state.move_by(delta)
        })?;
        Self::deliver(pending);
        Ok(())
    }

    /// Run continuously in `direction` until a `stop` request arrives.
    pub fn run(
        &self,
        direction: Direction,
    ) -> Result<(), MotionError<D::Error, T::Error>> {
        let pending = critical_section::with(|cs| {
            let state = &mut *self.state.borrow_ref_mut(cs);
            state.run(direction)
        })?;
        Self::deliver(pending);
        Ok(())
    }

    /// Decelerate to rest.
    ///
    /// The pulse currently in flight completes, the ramp's deceleration
    /// tail runs out, then [`MotionEvent::StepsCompleted`] fires. When
    /// there is no tail to run (the motor is at rest, or the ramp halts
    /// instantly) [`MotionEvent::Stopped`] fires immediately instead.
    pub fn stop(&self) -> Result<(), MotionError<D::Error, T::Error>> {
        let pending = critical_section::with(|cs| {
            let state = &mut *self.state.borrow_ref_mut(cs);
            state.stop()
        })?;
        Self::deliver(pending);
        Ok(())
    }

    /// Whether a motion request is still outstanding.
    pub fn is_moving(&self) -> bool {
        critical_section::with(|cs| !self.state.borrow_ref(cs).progress.is_idle())
    }

    /// Current position in microsteps.
    pub fn position(&self) -> i32 {
        critical_section::with(|cs| self.state.borrow_ref(cs).position)
    }

    /// Set the reference position the motor is currently at.
    pub fn set_position(&self, position: i32) {
        critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).position = position;
        });
    }

    /// Select the driver's microstep resolution. Refused while moving; a
    /// resolution change mid-plan would silently rescale the remaining
    /// distance.
    pub fn set_microstep_resolution(
        &self,
        resolution: MicrostepResolution,
    ) -> Result<(), MotionError<D::Error, T::Error>> {
        critical_section::with(|cs| {
            let state = &mut *self.state.borrow_ref_mut(cs);
            if !state.progress.is_idle() {
                return Err(MotionError::Busy);
            }
            state
                .driver
                .set_microstep_resolution(resolution)
                .map_err(MotionError::Driver)
        })
    }

    /// The driver's currently selected microstep resolution.
    pub fn microstep_resolution(&self) -> MicrostepResolution {
        critical_section::with(|cs| self.state.borrow_ref(cs).driver.microstep_resolution())
    }

    /// Register the callback receiving [`MotionEvent`]s. `None` disables
    /// delivery.
    pub fn set_event_callback(&self, callback: Option<MotionEventCallback>) {
        critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).event_callback = callback;
        });
    }

    /// Register the callback receiving forwarded [`StepDriverEvent`]s.
    pub fn set_driver_event_callback(&self, callback: Option<DriverEventCallback>) {
        critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).driver_event_callback = callback;
        });
    }

    /// Forward a hardware event from the lower driver layer to the
    /// application. The controller itself takes no action.
    pub fn notify_driver_event(&self, event: StepDriverEvent) {
        let callback =
            critical_section::with(|cs| self.state.borrow_ref(cs).driver_event_callback);
        if let Some(callback) = callback {
            callback(event);
        }
    }

    /// Number of adapter failures swallowed on the timer-callback path,
    /// where no caller exists to receive an error.
    pub fn fault_count(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow_ref(cs).fault_count)
    }

    /// Entry point for the timing source's expiry handler.
    ///
    /// Emits one pulse, accounts it, asks the ramp for the next interval
    /// and re-arms the timing source. When the plan is exhausted it either
    /// chains the deferred plan of a pending reversal or completes the
    /// motion request.
    pub fn handle_timing_signal(&self) {
        let pending = critical_section::with(|cs| {
            let state = &mut *self.state.borrow_ref_mut(cs);
            state.on_timing_signal()
        });
        Self::deliver(pending);
    }

    fn deliver(pending: PendingEvent) {
        if let Some((callback, event)) = pending {
            callback(event);
        }
    }
}

impl<D, T> ControllerState<D, T>
where
    D: StepDriver,
    T: TimingSource,
{
    fn move_by(
        &mut self,
        microsteps: i32,
    ) -> Result<PendingEvent, MotionError<D::Error, T::Error>> {
        if self.ramp.is_none() {
            return Err(MotionError::NoRamp);
        }
        if microsteps == 0 {
            return Ok(self.completion(MotionEvent::StepsCompleted));
        }

        let direction = Direction::of(microsteps);
        let planned = self.plan_or_brake(direction, microsteps.unsigned_abs())?;
        self.progress = Progress::Finite(microsteps);

        if planned > 0 {
            Ok(self.advance_plan())
        } else if self.timing.interval_ns() > 0 {
            // Braking toward a reversal with an instantaneous ramp: the
            // timer is still armed and the next expiry chains the new plan.
            Ok(None)
        } else {
            self.progress = Progress::Finite(0);
            Ok(self.completion(MotionEvent::StepsCompleted))
        }
    }

    fn run(
        &mut self,
        direction: Direction,
    ) -> Result<PendingEvent, MotionError<D::Error, T::Error>> {
        if self.ramp.is_none() {
            return Err(MotionError::NoRamp);
        }

        let planned = self.plan_or_brake(direction, i32::MAX as u32)?;
        self.progress = Progress::Continuous(direction);

        if planned > 0 {
            Ok(self.advance_plan())
        } else {
            // Only reachable while braking for a reversal; the timer chains
            // the continuous plan on its next expiry.
            Ok(None)
        }
    }

    /// Common front half of `move_by` and `run`: when moving against the
    /// requested direction, rewrite the plan into a brake and leave the
    /// launch to the timer callback; otherwise latch the direction and plan
    /// the move from the current velocity.
    fn plan_or_brake(
        &mut self,
        direction: Direction,
        steps: u32,
    ) -> Result<u64, MotionError<D::Error, T::Error>> {
        let moving = self.timing.interval_ns() > 0;

        if moving && self.direction == direction.opposite() {
            Ok(self.ramp_prepare_stop())
        } else {
            self.latch_direction(direction).map_err(MotionError::Driver)?;
            Ok(self.ramp_prepare_move(steps))
        }
    }

    fn stop(&mut self) -> Result<PendingEvent, MotionError<D::Error, T::Error>> {
        if self.ramp.is_none() {
            return Err(MotionError::NoRamp);
        }

        let tail = self.ramp_prepare_stop();
        if tail > 0 {
            // Account the braking pulses so position tracking stays exact.
            let tail = tail.min(i32::MAX as u64) as i32;
            self.progress = Progress::Finite(self.direction.delta().wrapping_mul(tail));
            Ok(self.advance_plan())
        } else {
            self.progress = Progress::Finite(0);
            self.timing.stop().map_err(MotionError::Timing)?;
            Ok(self.completion(MotionEvent::Stopped))
        }
    }

    fn on_timing_signal(&mut self) -> PendingEvent {
        if self.driver.step().is_err() {
            self.note_fault();
            #[cfg(feature = "defmt")]
            defmt::error!("step driver failed to pulse");
        }

        self.position = self.position.wrapping_add(self.direction.delta());
        if let Progress::Finite(remaining) = self.progress {
            self.progress = Progress::Finite(remaining.wrapping_sub(self.direction.delta()));
        }

        self.advance_plan()
    }

    /// Pull the next interval and re-arm, or finish the plan: either chain
    /// the deferred plan recorded in `progress` or report completion.
    fn advance_plan(&mut self) -> PendingEvent {
        let next = self.ramp_next_interval();
        if next > 0 {
            self.start_timing(next);
            return None;
        }

        self.stop_timing();
        match self.progress {
            Progress::Finite(0) => self.completion(MotionEvent::StepsCompleted),
            Progress::Finite(remaining) => {
                self.launch(Direction::of(remaining), remaining.unsigned_abs())
            }
            Progress::Continuous(direction) => self.launch(direction, i32::MAX as u32),
        }
    }

    /// Start a fresh plan in `direction`. Used on the timer path to chain
    /// the second half of a reversal, so adapter failures are recorded, not
    /// returned.
    fn launch(&mut self, direction: Direction, steps: u32) -> PendingEvent {
        if self.latch_direction(direction).is_err() {
            self.note_fault();
        }

        let planned = self.ramp_prepare_move(steps);
        if planned == 0 {
            self.progress = Progress::Finite(0);
            return self.completion(MotionEvent::StepsCompleted);
        }

        let first = self.ramp_next_interval();
        if first > 0 {
            self.start_timing(first);
            None
        } else {
            self.progress = Progress::Finite(0);
            self.completion(MotionEvent::StepsCompleted)
        }
    }

    fn latch_direction(&mut self, direction: Direction) -> Result<(), D::Error> {
        self.direction = direction;
        self.driver.set_direction(direction)
    }

    fn ramp_prepare_move(&mut self, steps: u32) -> u64 {
        match self.ramp.as_mut() {
            Some(ramp) => ramp.prepare_move(steps),
            None => 0,
        }
    }

    fn ramp_prepare_stop(&mut self) -> u64 {
        match self.ramp.as_mut() {
            Some(ramp) => ramp.prepare_stop(),
            None => 0,
        }
    }

    fn ramp_next_interval(&mut self) -> u64 {
        match self.ramp.as_mut() {
            Some(ramp) => ramp.get_next_interval(),
            None => 0,
        }
    }

    fn start_timing(&mut self, interval_ns: u64) {
        if self.timing.start(interval_ns).is_err() {
            self.note_fault();
            #[cfg(feature = "defmt")]
            defmt::error!("timing source failed to re-arm");
        }
    }

    fn stop_timing(&mut self) {
        if self.timing.stop().is_err() {
            self.note_fault();
            #[cfg(feature = "defmt")]
            defmt::error!("timing source failed to disarm");
        }
    }

    fn completion(&self, event: MotionEvent) -> PendingEvent {
        self.event_callback.map(|callback| (callback, event))
    }

    fn note_fault(&mut self) {
        self.fault_count = self.fault_count.saturating_add(1);
    }
}
