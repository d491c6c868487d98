pub mod console;
pub mod preview;

pub use console::{ConsoleLogWriter, KeyboardQuit, TerminalSession};
pub use preview::{annotate_frame, AsciiPreview, AsciiRenderer};
