use crate::hardware::Display;
use std::io::{self, Write};

pub const MSG_UNLOCKED: &str = "Safe Unlocked";
pub const MSG_LOCKING: &str = "Safe locking\nKeep Away";
pub const MSG_REJECTED: &str = "ID not valid\nRestart";

pub fn prompt_message(identity: &str) -> String {
    format!("Hi {}\nPlease Scan ID", identity)
}

/// Character grid with HD44780-style cursor behaviour: text wraps at the end of
/// a row, `\n` moves to the start of the next row, and the last row wraps back
/// to the first.
#[derive(Debug, Clone, PartialEq)]
pub struct LcdBuffer {
    cells: Vec<Vec<char>>,
    row: usize,
    col: usize,
}

impl LcdBuffer {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            cells: vec![vec![' '; columns.max(1)]; rows.max(1)],
            row: 0,
            col: 0,
        }
    }

    pub fn columns(&self) -> usize {
        self.cells[0].len()
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn clear(&mut self) {
        for row in &mut self.cells {
            row.fill(' ');
        }
        self.row = 0;
        self.col = 0;
    }

    pub fn write(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.next_row();
                continue;
            }
            if self.col == self.columns() {
                self.next_row();
            }
            self.cells[self.row][self.col] = ch;
            self.col += 1;
        }
    }

    fn next_row(&mut self) {
        self.row = (self.row + 1) % self.rows();
        self.col = 0;
    }

    pub fn lines(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
            .collect()
    }
}

/// Emulates the enclosure's character LCD on the operator terminal.
pub struct TerminalLcd {
    buffer: LcdBuffer,
    shown: Option<Vec<String>>,
}

impl TerminalLcd {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            buffer: LcdBuffer::new(columns, rows),
            shown: None,
        }
    }

    fn render(&mut self) {
        let lines = self.buffer.lines();
        if self.shown.as_ref() == Some(&lines) {
            return;
        }

        let width = self.buffer.columns();
        let mut out = String::new();
        out.push_str(&format!("\r\n┌{}┐\r\n", "─".repeat(width)));
        for line in &lines {
            out.push_str(&format!("│{:<width$}│\r\n", line, width = width));
        }
        out.push_str(&format!("└{}┘\r\n", "─".repeat(width)));

        let mut stdout = io::stdout();
        if let Err(e) = stdout.write_all(out.as_bytes()).and_then(|_| stdout.flush()) {
            tracing::warn!("Failed to draw display: {}", e);
        }
        tracing::debug!("Display: {:?}", lines);
        self.shown = Some(lines);
    }
}

impl Display for TerminalLcd {
    fn clear(&mut self) {
        self.buffer.clear();
        self.render();
    }

    fn write(&mut self, text: &str) {
        self.buffer.write(text);
        self.render();
    }
}
