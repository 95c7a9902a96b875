//! Image decoding and rendition derivation.

pub mod data_uri;
pub mod rendition;

use image::DynamicImage;

pub use data_uri::{EncodedImage, image_from_data_uri, parse_data_uri};
pub use rendition::{
    EncodedRendition, OUTPUT_CONTENT_TYPE, RenditionSet, derive_renditions,
    encode_jpeg, render, thumbnail_dimensions,
};

/// A decoded source image owned by a single pipeline run.
#[derive(Debug, Clone)]
pub struct DecodedImage(DynamicImage);

impl DecodedImage {
    pub fn new(image: DynamicImage) -> Self {
        Self(image)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.0.width(), self.0.height())
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.0
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.0
    }
}
