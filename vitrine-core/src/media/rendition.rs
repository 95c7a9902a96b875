use std::borrow::Cow;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, RgbImage};
use tracing::debug;
use vitrine_model::{ContentType, Rendition, RenditionKind};

use super::DecodedImage;
use crate::error::{MediaError, Result};

/// Every rendition is stored as JPEG regardless of the source encoding.
pub const OUTPUT_CONTENT_TYPE: ContentType = ContentType::Jpeg;

const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// Encoded bytes of one rendition, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRendition {
    pub kind: RenditionKind,
    pub content_type: ContentType,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// The three renditions derived from one source image.
#[derive(Debug, Clone)]
pub struct RenditionSet {
    pub full_size: EncodedRendition,
    pub compressed: EncodedRendition,
    pub thumbnail: EncodedRendition,
}

impl RenditionSet {
    pub fn get(&self, kind: RenditionKind) -> &EncodedRendition {
        match kind {
            RenditionKind::FullSize => &self.full_size,
            RenditionKind::Compressed => &self.compressed,
            RenditionKind::Thumbnail => &self.thumbnail,
        }
    }

    pub fn total_bytes(&self) -> usize {
        self.full_size.bytes.len()
            + self.compressed.bytes.len()
            + self.thumbnail.bytes.len()
    }
}

/// Target size when bounding `height` by `max_height`.
///
/// Images at or below the bound are unchanged. Taller images are scaled to
/// exactly `max_height`, width rounded to the nearest pixel and at least 1.
pub fn thumbnail_dimensions(
    width: u32,
    height: u32,
    max_height: u32,
) -> (u32, u32) {
    if height <= max_height || height == 0 {
        return (width, height);
    }

    let (w, h, max) = (u64::from(width), u64::from(height), u64::from(max_height));
    // Half-up rounding of max * w / h without going through floats.
    let scaled = (2 * max * w + h) / (2 * h);
    let scaled = u32::try_from(scaled).unwrap_or(u32::MAX).max(1);
    (scaled, max_height)
}

/// Apply the geometric part of a rendition policy.
fn transform<'a>(
    source: &'a DynamicImage,
    rendition: &Rendition,
) -> Cow<'a, DynamicImage> {
    let Some(max_height) = rendition.max_height() else {
        return Cow::Borrowed(source);
    };

    let (width, height) =
        thumbnail_dimensions(source.width(), source.height(), max_height);
    if (width, height) == (source.width(), source.height()) {
        return Cow::Borrowed(source);
    }

    Cow::Owned(source.resize_exact(width, height, RESIZE_FILTER))
}

/// Encode as baseline JPEG at the given quality.
///
/// RGB8 sources go straight to the encoder; anything else (alpha, 16-bit,
/// grayscale) is flattened to RGB8 first.
pub fn encode_jpeg(
    image: &DynamicImage,
    quality: u8,
) -> std::result::Result<Vec<u8>, image::ImageError> {
    let rgb: Cow<'_, RgbImage> = match image {
        DynamicImage::ImageRgb8(buf) => Cow::Borrowed(buf),
        other => Cow::Owned(other.to_rgb8()),
    };

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder.encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(bytes)
}

/// Derive and encode a single rendition of `source`.
pub fn render(
    source: &DecodedImage,
    rendition: Rendition,
) -> Result<EncodedRendition> {
    let kind = rendition.kind();
    let image = transform(source.as_dynamic(), &rendition);

    let bytes = encode_jpeg(&image, rendition.quality()).map_err(|e| {
        MediaError::Encode {
            kind,
            reason: e.to_string(),
        }
    })?;

    debug!(
        kind = %kind,
        width = image.width(),
        height = image.height(),
        quality = rendition.quality(),
        encoded_size = bytes.len(),
        "encoded rendition"
    );

    Ok(EncodedRendition {
        kind,
        content_type: OUTPUT_CONTENT_TYPE,
        width: image.width(),
        height: image.height(),
        bytes,
    })
}

/// Derive all three renditions in parallel on the rayon pool.
///
/// CPU bound; call from a blocking context.
pub fn derive_renditions(source: &DecodedImage) -> Result<RenditionSet> {
    let render_kind =
        |kind: RenditionKind| render(source, Rendition::for_kind(kind));

    let (full_size, (compressed, thumbnail)) = rayon::join(
        || render_kind(RenditionKind::FullSize),
        || {
            rayon::join(
                || render_kind(RenditionKind::Compressed),
                || render_kind(RenditionKind::Thumbnail),
            )
        },
    );

    Ok(RenditionSet {
        full_size: full_size?,
        compressed: compressed?,
        thumbnail: thumbnail?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::test_support::gradient;
    use image::{GenericImageView, ImageFormat, Rgba, RgbaImage};

    fn decoded(width: u32, height: u32) -> DecodedImage {
        DecodedImage::new(gradient(width, height))
    }

    fn assert_jpeg_of_size(rendition: &EncodedRendition, w: u32, h: u32) {
        assert_eq!(
            image::guess_format(&rendition.bytes).unwrap(),
            ImageFormat::Jpeg
        );
        let reread = image::load_from_memory(&rendition.bytes).unwrap();
        assert_eq!(reread.dimensions(), (w, h));
        assert_eq!((rendition.width, rendition.height), (w, h));
    }

    #[test]
    fn thumbnail_dimensions_preserve_aspect_ratio() {
        assert_eq!(thumbnail_dimensions(4000, 3000, 1080), (1440, 1080));
        assert_eq!(thumbnail_dimensions(1920, 2160, 1080), (960, 1080));
        // 1080 * 1000 / 1081 = 999.07
        assert_eq!(thumbnail_dimensions(1000, 1081, 1080), (999, 1080));
        // 1080 * 1001 / 2000 = 540.54
        assert_eq!(thumbnail_dimensions(1001, 2000, 1080), (541, 1080));
    }

    #[test]
    fn thumbnail_dimensions_leave_short_images_alone() {
        assert_eq!(thumbnail_dimensions(800, 600, 1080), (800, 600));
        assert_eq!(thumbnail_dimensions(5000, 1080, 1080), (5000, 1080));
    }

    #[test]
    fn thumbnail_width_never_collapses_to_zero() {
        assert_eq!(thumbnail_dimensions(1, 100_000, 1080), (1, 1080));
    }

    #[test]
    fn short_source_keeps_dimensions_in_every_rendition() {
        let derived = derive_renditions(&decoded(120, 90)).unwrap();
        for kind in RenditionKind::ALL {
            let rendition = derived.get(kind);
            assert_eq!(rendition.kind, kind);
            assert_eq!(rendition.content_type, ContentType::Jpeg);
            assert_jpeg_of_size(rendition, 120, 90);
        }
    }

    #[test]
    fn tall_source_only_shrinks_thumbnail() {
        let derived = derive_renditions(&decoded(200, 2000)).unwrap();
        assert_jpeg_of_size(&derived.full_size, 200, 2000);
        assert_jpeg_of_size(&derived.compressed, 200, 2000);
        assert_jpeg_of_size(&derived.thumbnail, 108, 1080);
    }

    #[test]
    fn compressed_is_smaller_than_full_size() {
        let derived = derive_renditions(&decoded(320, 240)).unwrap();
        assert!(derived.compressed.bytes.len() < derived.full_size.bytes.len());
    }

    #[test]
    fn transparent_sources_encode_as_jpeg() {
        let rgba = RgbaImage::from_pixel(16, 12, Rgba([10, 20, 30, 0]));
        let source = DecodedImage::new(DynamicImage::ImageRgba8(rgba));
        let rendition =
            render(&source, Rendition::for_kind(RenditionKind::FullSize))
                .unwrap();
        assert_jpeg_of_size(&rendition, 16, 12);
    }
}
