use std::cell::{Cell, RefCell};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("failed to write clipboard: {0}")]
    Write(String),
}

/// 只寫入的剪貼簿。 / Write-only text clipboard.
pub trait Clipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// 記憶體內剪貼簿。 / In-memory clipboard, optionally failing every write.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: RefCell<Option<String>>,
    failing: Cell<bool>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let clipboard = Self::default();
        clipboard.failing.set(true);
        clipboard
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.borrow().clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        if self.failing.get() {
            return Err(ClipboardError::Write("clipboard rejected the write".to_string()));
        }
        *self.contents.borrow_mut() = Some(text.to_string());
        Ok(())
    }
}
