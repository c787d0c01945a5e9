//! Timing-source adapter contract.

/// A one-shot (or self-re-arming) timer with nanosecond programming.
///
/// The controller re-programs the period after every pulse, so `start` is
/// called once per step while moving. The timer's expiry handler is expected
/// to call [`MotionController::handle_timing_signal`]; that wiring happens
/// at integration time and is outside this trait.
///
/// [`MotionController::handle_timing_signal`]:
///     crate::MotionController::handle_timing_signal
pub trait TimingSource {
    /// Error reported by the underlying timer peripheral.
    type Error;

    /// Arm the timer to fire once after `interval_ns` nanoseconds,
    /// replacing any previously programmed interval.
    fn start(&mut self, interval_ns: u64) -> Result<(), Self::Error>;

    /// Disarm the timer. No further expiries occur until `start`.
    fn stop(&mut self) -> Result<(), Self::Error>;

    /// The currently programmed interval, or `0` when disarmed.
    ///
    /// The controller uses this as its "is the motor physically moving"
    /// probe when deciding whether a new command must brake first.
    fn interval_ns(&self) -> u64;
}
