use serde::{Deserialize, Serialize};

/// The persisted record: one mapping from a short code to an original URL.
///
/// This is also the wire shape of the file backend (one JSON object per
/// line) and of JSON payloads elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUrl {
    /// Record identity. Engine-created records use the short code itself,
    /// which lets the relational primary key double as the short-code
    /// uniqueness constraint.
    pub uuid: String,
    pub short_url: String,
    pub original_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl StoredUrl {
    pub fn new(short_code: &str, original_url: &str, user_id: Option<&str>) -> Self {
        StoredUrl {
            uuid: short_code.to_string(),
            short_url: short_code.to_string(),
            original_url: original_url.to_string(),
            user_id: user_id.map(str::to_string),
            is_deleted: false,
        }
    }
}
