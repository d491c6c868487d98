//! Collaborators the access controller drives. Each sits behind a trait so the
//! controller runs the same against real hardware and test fakes.

pub mod actuator;
pub mod display;
pub mod keypad;

pub use actuator::{LoggingActuator, SysfsGpioActuator};
pub use display::{LcdBuffer, TerminalLcd};
pub use keypad::ConsoleKeypad;

use crate::common::Result;

/// Character display in front of the enclosure.
pub trait Display {
    fn clear(&mut self);
    fn write(&mut self, text: &str);
}

/// Lock mechanism. Both operations are idempotent.
pub trait Actuator {
    fn lock(&mut self) -> Result<()>;
    fn unlock(&mut self) -> Result<()>;
}

/// Keypad or console the secondary code is entered on. Blocks until a code is
/// entered; an error (timeout, cancelled, closed) counts as a failed attempt.
pub trait SecondaryInput {
    fn read_code(&mut self) -> Result<String>;
}
