use chrono::{DateTime, Utc};

/// The three public rendition URLs persisted as one composite media record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MediaInsert {
    pub full_size: String,
    pub compressed: String,
    pub thumbnail: String,
}

/// A freshly registered media record, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MediaDescriptor {
    pub id: i64,
    pub full_size: String,
    pub compressed: String,
    pub thumbnail: String,
}

impl MediaDescriptor {
    pub fn new(id: i64, insert: MediaInsert) -> Self {
        let MediaInsert {
            full_size,
            compressed,
            thumbnail,
        } = insert;
        Self {
            id,
            full_size,
            compressed,
            thumbnail,
        }
    }
}

/// A stored media row.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MediaRecord {
    pub id: i64,
    pub full_size: String,
    pub compressed: String,
    pub thumbnail: String,
    pub created_at: DateTime<Utc>,
}

impl From<MediaRecord> for MediaDescriptor {
    fn from(record: MediaRecord) -> Self {
        Self {
            id: record.id,
            full_size: record.full_size,
            compressed: record.compressed,
            thumbnail: record.thumbnail,
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn descriptor_serializes_with_camel_case_fields() {
        let descriptor = MediaDescriptor::new(
            7,
            MediaInsert {
                full_size: "https://cdn/p/a-og.jpg".into(),
                compressed: "https://cdn/p/a-compressed.jpg".into(),
                thumbnail: "https://cdn/p/a-thumb.jpg".into(),
            },
        );

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["fullSize"], "https://cdn/p/a-og.jpg");
        assert_eq!(json["compressed"], "https://cdn/p/a-compressed.jpg");
        assert_eq!(json["thumbnail"], "https://cdn/p/a-thumb.jpg");
    }
}
