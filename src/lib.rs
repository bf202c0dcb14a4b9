#![warn(missing_docs)]
//! NovaArt - prompt-driven AI image generation and editing.
//!
//! A session ([`Studio`]) holds the prompt, an optional reference image,
//! and the outcome of the latest generation request. Input arrives as
//! discrete [`Event`]s; the result panel is derived from the outcome by
//! [`presenter::present`].
//!
//! # Quick Start
//!
//! ```no_run
//! use novaart::{encoder, Event, GeminiProvider, Reaction, Studio};
//!
//! #[tokio::main]
//! async fn main() -> novaart::Result<()> {
//!     let studio = Studio::new(GeminiProvider::builder().build()?);
//!
//!     let photo = encoder::read_file("photo.png").await?;
//!     studio.handle(Event::SelectFile(photo));
//!     studio.handle(Event::SetPrompt("Add a party hat".into()));
//!
//!     if let Reaction::Started(request) = studio.handle(Event::Submit) {
//!         let _ = request.await;
//!     }
//!     println!("{}", studio.view().render());
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `gemini`: Gemini (Google) provider
//! - `cli`: command-line front-end and logging setup

mod error;

pub mod encoder;
pub mod image;
pub mod orchestrator;
pub mod presenter;
pub mod state;
pub mod studio;

#[cfg(feature = "cli")]
pub mod config;

#[cfg(test)]
mod testing;

// Re-export error types at crate root
pub use error::{NovaError, Result, UNKNOWN_ERROR_MESSAGE};

pub use encoder::{SelectedFile, UploadedImage};
pub use image::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat, ImageProvider,
    ImageProviderKind, ReferenceImage,
};
pub use orchestrator::{Admission, Generator, Outcome, Submission};
pub use presenter::{Rendering, ViewState};
pub use studio::{Event, Reaction, Studio};

#[cfg(feature = "gemini")]
pub use image::providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{NovaError, Result};
    pub use crate::image::{GenerationRequest, ImageProvider};
    pub use crate::orchestrator::Outcome;
    pub use crate::studio::{Event, Reaction, Studio};

    #[cfg(feature = "gemini")]
    pub use crate::image::providers::GeminiProvider;
}
