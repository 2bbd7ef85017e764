//! The display region: one text slot, overwritten on every write.

use std::io::Write;
use std::sync::Mutex;

/// Where results are shown. Each write replaces whatever was there.
pub trait Display: Send + Sync {
    fn set_text(&self, text: &str);
}

/// An in-memory display region. Starts empty.
#[derive(Debug, Default)]
pub struct TextSlot {
    /// Current text and write count, updated together.
    state: Mutex<(Option<String>, usize)>,
}

impl TextSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current content, `None` until the first write.
    pub fn text(&self) -> Option<String> {
        self.state.lock().unwrap().0.clone()
    }

    /// How many times the slot has been written.
    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().1
    }

    /// Content and write count read together.
    pub fn state(&self) -> (Option<String>, usize) {
        self.state.lock().unwrap().clone()
    }
}

impl Display for TextSlot {
    fn set_text(&self, text: &str) {
        let mut state = self.state.lock().unwrap();
        state.0 = Some(text.to_string());
        state.1 += 1;
    }
}

/// Prints each result to stdout on its own `=> ` line.
#[derive(Debug, Default)]
pub struct TerminalDisplay {
    slot: TextSlot,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last text printed.
    pub fn text(&self) -> Option<String> {
        self.slot.text()
    }
}

impl Display for TerminalDisplay {
    fn set_text(&self, text: &str) {
        self.slot.set_text(text);
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "\n=> {text}");
        let _ = out.flush();
    }
}
