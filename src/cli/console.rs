use crate::common::Result;
use crate::core::pipeline::QuitSignal;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::{cursor, terminal};
use std::io::{self, Write};
use std::time::Duration;

/// Raw-mode terminal for the duration of a run; restored on drop.
pub struct TerminalSession;

impl TerminalSession {
    pub fn start() -> Result<Self> {
        terminal::enable_raw_mode()?;
        crossterm::execute!(
            io::stdout(),
            terminal::Clear(terminal::ClearType::All),
            cursor::MoveTo(0, 0)
        )?;
        Ok(Self)
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::warn!("Failed to restore terminal: {}", e);
        }
    }
}

/// Log sink for the operator terminal. In raw mode a bare `\n` only moves the
/// cursor down, so line feeds are written as `\r\n`.
pub struct ConsoleLogWriter<W> {
    inner: W,
    raw_mode: bool,
}

impl<W: Write> ConsoleLogWriter<W> {
    pub fn new(inner: W, raw_mode: bool) -> Self {
        Self { inner, raw_mode }
    }
}

impl ConsoleLogWriter<io::Stderr> {
    pub fn stderr(raw_mode: bool) -> Self {
        Self::new(io::stderr(), raw_mode)
    }
}

impl<W: Write> Write for ConsoleLogWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.raw_mode {
            return self.inner.write(buf);
        }

        let mut translated = Vec::with_capacity(buf.len() + 8);
        let mut previous = None;
        for &byte in buf {
            if byte == b'\n' && previous != Some(b'\r') {
                translated.push(b'\r');
            }
            translated.push(byte);
            previous = Some(byte);
        }
        self.inner.write_all(&translated)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind == KeyEventKind::Release {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// Quits on `q`, Esc or Ctrl-C from the operator terminal.
#[derive(Default)]
pub struct KeyboardQuit;

impl QuitSignal for KeyboardQuit {
    fn quit_requested(&mut self) -> Result<bool> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if is_quit_key(&key) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_mode_log_lines_end_in_crlf() {
        let mut writer = ConsoleLogWriter::new(Vec::new(), true);
        let written = writer.write(b"INFO first\nINFO second\r\n").unwrap();
        assert_eq!(written, 24);
        assert_eq!(writer.inner, b"INFO first\r\nINFO second\r\n");
    }

    #[test]
    fn cooked_mode_log_lines_pass_through() {
        let mut writer = ConsoleLogWriter::new(Vec::new(), false);
        writer.write_all(b"INFO line\n").unwrap();
        assert_eq!(writer.inner, b"INFO line\n");
    }

    #[test]
    fn quit_keys() {
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit_key(&KeyEvent::new(KeyCode::Char('1'), KeyModifiers::NONE)));
    }
}
