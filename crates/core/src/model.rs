use serde::{Deserialize, Serialize};

/// A book as submitted by a client, before the storage service assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookDraft {
    /// Book title.
    pub title: String,

    /// Author name.
    pub author: String,

    /// Price in the store's currency.
    pub price: f64,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// Short author biography.
    #[serde(default)]
    pub author_bio: String,
}

/// A stored book, addressed by the id the storage service generated for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Storage-assigned identifier.
    pub id: i64,

    /// The submitted book fields.
    #[serde(flatten)]
    pub details: BookDraft,
}

impl Book {
    /// Attach a storage-assigned id to a draft.
    pub fn from_draft(id: i64, details: BookDraft) -> Self {
        Self { id, details }
    }
}
