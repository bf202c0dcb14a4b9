//! Holder for the free-text prompt.

use tokio::sync::watch;

/// The current prompt text. No validation happens here.
#[derive(Debug)]
pub struct PromptState {
    tx: watch::Sender<String>,
}

impl Default for PromptState {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptState {
    /// Creates an empty prompt.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(String::new());
        Self { tx }
    }

    /// Replaces the prompt text.
    pub fn set(&self, text: impl Into<String>) {
        let text = text.into();
        self.tx.send_if_modified(|current| {
            if *current == text {
                return false;
            }
            *current = text;
            true
        });
    }

    /// Returns a copy of the current prompt.
    pub fn get(&self) -> String {
        self.tx.borrow().clone()
    }

    /// Subscribes to prompt changes.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }
}
