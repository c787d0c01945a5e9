//! Error types for the motion controller.

/// Errors surfaced by the user-facing motion operations.
///
/// Errors are reported before any state is committed: a failed call leaves
/// the controller exactly as it was. The timer-callback path never produces
/// one of these, since there is no caller to receive it; failures on that
/// path are counted instead (see
/// [`MotionController::fault_count`](crate::MotionController::fault_count)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionError<DE, TE> {
    /// No ramp generator has been installed; call `set_ramp` first.
    NoRamp,
    /// The operation is not permitted while the motor is moving.
    Busy,
    /// The step driver reported a failure.
    Driver(DE),
    /// The timing source reported a failure.
    Timing(TE),
}
