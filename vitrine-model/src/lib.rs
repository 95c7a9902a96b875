//! Core data model definitions shared across vitrine crates.
#![allow(missing_docs)]

pub use ::chrono;

pub mod content_type;
pub mod media;
pub mod rendition;

pub use content_type::ContentType;
pub use media::{MediaDescriptor, MediaInsert, MediaRecord};
pub use rendition::{Rendition, RenditionKind, THUMBNAIL_MAX_HEIGHT};
