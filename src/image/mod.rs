//! Image generation module.

mod provider;
pub mod providers;
mod types;

pub use provider::ImageProvider;
pub use types::{
    decode_data_url, GeneratedImage, GenerationMetadata, GenerationRequest, ImageFormat,
    ImageProviderKind, ReferenceImage,
};
