use std::fmt::{self, Display, Formatter};

/// Image encodings accepted from clients and written to object storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ContentType {
    Jpeg,
    Png,
}

impl ContentType {
    /// MIME type sent as the object's `Content-Type`.
    pub const fn mime(self) -> &'static str {
        match self {
            ContentType::Jpeg => "image/jpeg",
            ContentType::Png => "image/png",
        }
    }

    /// File extension used in object keys.
    pub const fn extension(self) -> &'static str {
        match self {
            ContentType::Jpeg => "jpg",
            ContentType::Png => "png",
        }
    }

    /// The `data:[mediatype]` prefix of a data URI carrying this encoding.
    pub const fn data_uri_tag(self) -> &'static str {
        match self {
            ContentType::Jpeg => "data:image/jpeg",
            ContentType::Png => "data:image/png",
        }
    }

    pub fn from_data_uri_tag(tag: &str) -> Option<Self> {
        match tag {
            "data:image/jpeg" => Some(ContentType::Jpeg),
            "data:image/png" => Some(ContentType::Png),
            _ => None,
        }
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}
