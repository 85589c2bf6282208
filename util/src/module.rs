//! Module interfaces
//!
//! Cyclic modules implement `State`. Modules which drive actuators also
//! implement `MakeSafe` so the executable can stop them without knowing what
//! they do.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// The module's internal state.
///
/// A module is initialised once with `init` and then driven by calling `proc`
/// exactly once per control cycle. The module is the only writer of its own
/// state.
pub trait State {
    /// Data required during initialisation
    type InitData;
    /// An error which can occur during initialisation.
    type InitError;

    /// Data required for cyclic processing.
    type InputData;
    /// Data produced by cyclic processing.
    type OutputData;
    /// A report on the status of the cyclic processing.
    type StatusReport;
    /// An error which can occur during cyclic processing.
    type ProcError;

    /// Initialise the module.
    ///
    /// # Inputs
    /// - `init_data`: Everything the module needs to build itself,
    ///   typically its already loaded parameters
    /// - `session`: The current session, used to place archives
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>;

    /// Run one control cycle, returning the output and status report for
    /// the cycle.
    ///
    /// Calling this before `init` succeeds is an error, not a panic.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}

// ---------------------------------------------------------------------------
// SAFETY
// ---------------------------------------------------------------------------

/// A module which can be commanded into a safe (stopped) state.
pub trait MakeSafe {
    /// Abandon any ongoing activity. The next output of the module shall be
    /// a safe one.
    fn make_safe(&mut self);

    /// True if the module has been made safe and not given a new command
    /// since.
    fn is_safe(&self) -> bool;
}
