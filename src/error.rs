use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content source unavailable at {url}: {reason}")]
    Unavailable { url: String, reason: String },

    #[error("GET {url} failed with status {status}")]
    Rejected { url: String, status: u16 },

    #[error("unexpected response shape from {url}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cursor {0} does not point at the configured endpoint")]
    ForeignCursor(String),

    #[error("content source did not advertise a master ref")]
    NoMasterRef,
}

impl ContentError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ContentError::Unavailable { .. })
    }
}
