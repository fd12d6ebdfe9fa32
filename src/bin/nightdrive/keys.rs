//! Raw-mode terminal input
//!
//! Terminals that support the kitty keyboard protocol report key releases,
//! so notes sustain while held. Elsewhere only presses arrive and each note
//! is released after a fixed hold.

use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

use color_eyre::eyre::{Result as EyreResult, WrapErr};
use crossterm::{
    cursor::MoveToColumn,
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::Print,
    terminal::{self, Clear, ClearType},
};

use nightdrive::io::key_to_note;

/// Hold time for terminals that never report releases
const FALLBACK_HOLD: Duration = Duration::from_millis(300);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    NoteOn(u8),
    NoteOff(u8),
    ToggleSequencer,
    Quit,
}

pub struct Keyboard {
    stdout: Stdout,
    reports_release: bool,
    /// Notes awaiting their fallback release
    held: Vec<(u8, Instant)>,
}

impl Keyboard {
    pub fn open() -> EyreResult<Self> {
        terminal::enable_raw_mode().wrap_err("failed to enter raw mode")?;
        let mut stdout = io::stdout();

        let reports_release = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if reports_release {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }

        Ok(Self {
            stdout,
            reports_release,
            held: Vec::new(),
        })
    }

    /// Replace the status line.
    pub fn status(&mut self, line: &str) -> EyreResult<()> {
        queue!(
            self.stdout,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        )?;
        self.stdout.flush()?;
        Ok(())
    }

    /// Wait briefly for the next key action.
    pub fn next_action(&mut self) -> EyreResult<Option<KeyAction>> {
        if let Some(note) = self.expired_hold() {
            return Ok(Some(KeyAction::NoteOff(note)));
        }
        if !event::poll(POLL_INTERVAL)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) => Ok(self.translate(key)),
            _ => Ok(None),
        }
    }

    fn translate(&mut self, key: KeyEvent) -> Option<KeyAction> {
        match (key.code, key.kind) {
            (KeyCode::Esc, KeyEventKind::Press) => Some(KeyAction::Quit),
            (KeyCode::Char('c'), KeyEventKind::Press)
                if key.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                Some(KeyAction::Quit)
            }
            (KeyCode::Char(' '), KeyEventKind::Press) => Some(KeyAction::ToggleSequencer),
            (KeyCode::Char(c), KeyEventKind::Press) => {
                let note = key_to_note(c)?;
                if !self.reports_release {
                    self.held.retain(|&(n, _)| n != note);
                    self.held.push((note, Instant::now() + FALLBACK_HOLD));
                }
                Some(KeyAction::NoteOn(note))
            }
            (KeyCode::Char(c), KeyEventKind::Release) => key_to_note(c).map(KeyAction::NoteOff),
            _ => None,
        }
    }

    fn expired_hold(&mut self) -> Option<u8> {
        let now = Instant::now();
        let index = self.held.iter().position(|&(_, at)| at <= now)?;
        Some(self.held.swap_remove(index).0)
    }
}

impl Drop for Keyboard {
    fn drop(&mut self) {
        if self.reports_release {
            let _ = execute!(self.stdout, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(self.stdout, Print("\r\n"));
        let _ = terminal::disable_raw_mode();
    }
}
