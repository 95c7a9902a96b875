use std::fmt::{self, Display, Formatter};

/// Height above which the thumbnail rendition is scaled down.
pub const THUMBNAIL_MAX_HEIGHT: u32 = 1080;

/// One derived image variant produced from a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum RenditionKind {
    FullSize,
    Compressed,
    Thumbnail,
}

impl RenditionKind {
    /// Every kind, in the order the pipeline uploads them.
    pub const ALL: [RenditionKind; 3] = [
        RenditionKind::FullSize,
        RenditionKind::Compressed,
        RenditionKind::Thumbnail,
    ];

    /// Suffix appended to the base name in the object key.
    pub const fn suffix(self) -> &'static str {
        match self {
            RenditionKind::FullSize => "og",
            RenditionKind::Compressed => "compressed",
            RenditionKind::Thumbnail => "thumb",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RenditionKind::FullSize => "full-size",
            RenditionKind::Compressed => "compressed",
            RenditionKind::Thumbnail => "thumbnail",
        }
    }
}

impl Display for RenditionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a decoded image is transformed and encoded for one [`RenditionKind`].
///
/// `quality` is always within `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rendition {
    kind: RenditionKind,
    quality: u8,
    max_height: Option<u32>,
}

impl Rendition {
    /// Builds a rendition, clamping `quality` into `1..=100`.
    pub const fn new(
        kind: RenditionKind,
        quality: u8,
        max_height: Option<u32>,
    ) -> Self {
        let quality = if quality == 0 {
            1
        } else if quality > 100 {
            100
        } else {
            quality
        };
        Self {
            kind,
            quality,
            max_height,
        }
    }

    /// The fixed derivation policy for each kind.
    pub const fn for_kind(kind: RenditionKind) -> Self {
        match kind {
            RenditionKind::FullSize => Self::new(kind, 100, None),
            RenditionKind::Compressed => Self::new(kind, 60, None),
            RenditionKind::Thumbnail => {
                Self::new(kind, 90, Some(THUMBNAIL_MAX_HEIGHT))
            }
        }
    }

    pub const fn kind(&self) -> RenditionKind {
        self.kind
    }

    pub const fn quality(&self) -> u8 {
        self.quality
    }

    pub const fn max_height(&self) -> Option<u32> {
        self.max_height
    }
}
