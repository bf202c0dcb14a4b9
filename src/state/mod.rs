//! Input-side state holders.
//!
//! Each holder wraps a `tokio::sync::watch` channel: writes replace the value
//! and are immediately visible to `borrow()`, and subscribers are woken on
//! every change.

mod preview;
mod prompt;
mod upload;

pub use preview::{PreviewHandle, PreviewRegistry};
pub use prompt::PromptState;
pub use upload::{Upload, UploadState};
