//! Maps the current outcome to what the result panel shows.

use crate::orchestrator::Outcome;
use std::fmt;

/// Text shown while a request is in flight.
pub const LOADING_TEXT: &str = "Generating your masterpiece...";
/// Text shown before anything has been generated.
pub const PLACEHOLDER_TEXT: &str = "Your creation will appear here.";

/// The inputs the result panel is drawn from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    /// A request is in flight.
    pub is_loading: bool,
    /// Message of the last failure.
    pub error: Option<String>,
    /// Data URL of the last generated image.
    pub generated_image: Option<String>,
}

impl From<&Outcome> for ViewState {
    fn from(outcome: &Outcome) -> Self {
        Self {
            is_loading: outcome.is_pending(),
            error: outcome.error().map(str::to_string),
            generated_image: outcome.generated_image().map(str::to_string),
        }
    }
}

/// One of the four mutually exclusive result panel modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendering<'a> {
    /// Spinner.
    Loading,
    /// Error panel with a message.
    Error(&'a str),
    /// The generated image.
    Result(&'a str),
    /// Empty panel.
    Placeholder,
}

/// Picks the rendering for a view state.
///
/// Loading wins over everything, then errors, then the result image.
pub fn present<'a>(
    is_loading: bool,
    error: Option<&'a str>,
    generated_image: Option<&'a str>,
) -> Rendering<'a> {
    if is_loading {
        return Rendering::Loading;
    }
    if let Some(error) = error.filter(|e| !e.is_empty()) {
        return Rendering::Error(error);
    }
    match generated_image.filter(|uri| !uri.is_empty()) {
        Some(uri) => Rendering::Result(uri),
        None => Rendering::Placeholder,
    }
}

impl ViewState {
    /// Renders this state.
    pub fn render(&self) -> Rendering<'_> {
        present(
            self.is_loading,
            self.error.as_deref(),
            self.generated_image.as_deref(),
        )
    }
}

impl fmt::Display for Rendering<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "{LOADING_TEXT}"),
            Self::Error(msg) => write!(f, "Error: {msg}"),
            Self::Result(uri) => {
                // Data URLs are long; show the header and payload size only.
                match uri.split_once(',') {
                    Some((header, payload)) if uri.starts_with("data:") => {
                        write!(f, "Generated image ({header}, {} chars)", payload.len())
                    }
                    _ => write!(f, "Generated image: {uri}"),
                }
            }
            Self::Placeholder => write!(f, "{PLACEHOLDER_TEXT}"),
        }
    }
}
