use crate::common::{FaceLockError, Result};
use crate::hardware::SecondaryInput;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io::{self, Write};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const MAX_CODE_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum EntryState {
    Pending,
    Submitted(String),
    Cancelled,
}

/// Collects keystrokes into a code. Non-digit characters are kept so the
/// verifier can reject them.
#[derive(Debug, Default)]
pub struct CodeEntry {
    typed: String,
}

impl CodeEntry {
    pub fn feed(&mut self, key: KeyEvent) -> EntryState {
        if key.kind == KeyEventKind::Release {
            return EntryState::Pending;
        }
        match key.code {
            KeyCode::Enter => EntryState::Submitted(std::mem::take(&mut self.typed)),
            KeyCode::Esc => EntryState::Cancelled,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => EntryState::Cancelled,
            KeyCode::Backspace => {
                self.typed.pop();
                EntryState::Pending
            }
            KeyCode::Char(ch) if self.typed.len() < MAX_CODE_LEN => {
                self.typed.push(ch);
                EntryState::Pending
            }
            _ => EntryState::Pending,
        }
    }

    pub fn len(&self) -> usize {
        self.typed.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.typed.is_empty()
    }
}

/// Reads the code from the operator terminal (or a USB keypad/scanner that
/// presents itself as a keyboard).
pub struct ConsoleKeypad {
    timeout: Option<Duration>,
}

impl ConsoleKeypad {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn echo(&self, entry: &CodeEntry) {
        let mut stdout = io::stdout();
        let _ = write!(stdout, "\rScan ID Now: {:<width$}", "*".repeat(entry.len()), width = MAX_CODE_LEN);
        let _ = stdout.flush();
    }
}

impl SecondaryInput for ConsoleKeypad {
    fn read_code(&mut self) -> Result<String> {
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let mut entry = CodeEntry::default();
        self.echo(&entry);

        loop {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    print!("\r\n");
                    return Err(FaceLockError::Input("Timed out waiting for code".into()));
                }
            }

            if !event::poll(POLL_INTERVAL)? {
                continue;
            }

            if let Event::Key(key) = event::read()? {
                match entry.feed(key) {
                    EntryState::Pending => self.echo(&entry),
                    EntryState::Submitted(code) => {
                        print!("\r\n");
                        return Ok(code);
                    }
                    EntryState::Cancelled => {
                        print!("\r\n");
                        return Err(FaceLockError::Input("Code entry cancelled".into()));
                    }
                }
            }
        }
    }
}
