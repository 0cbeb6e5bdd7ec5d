use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::pagination::{BackendPagination, Pagination};

/// Asset as owned by the backend. Cached client-side as read-only; only
/// `status` and `metadata` ever change server-side after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub filename: String,
    pub original_name: String,
    #[serde(default)]
    pub file_type: String,
    pub mime_type: String,
    pub file_size: u64,
    #[serde(default)]
    pub storage_path: String,
    #[serde(default)]
    pub storage_bucket: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: AssetMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        rename = "signedUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub signed_url: Option<String>,
}

impl Asset {
    pub fn category(&self) -> FileCategory {
        FileCategory::from_mime(&self.mime_type)
    }
}

/// Free-form descriptive metadata attached to an asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Wire shape of `GET /assets` and `GET /assets/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetListResponse {
    #[serde(default)]
    pub data: Vec<Asset>,
    pub pagination: BackendPagination,
}

/// A page of assets with client-normalized pagination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetPage {
    pub assets: Vec<Asset>,
    pub pagination: Pagination,
}

impl From<AssetListResponse> for AssetPage {
    fn from(response: AssetListResponse) -> Self {
        AssetPage {
            assets: response.data,
            pagination: response.pagination.into(),
        }
    }
}

/// Generic `{ data: T }` envelope used by single-asset and stats endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// Coarse display category derived from a mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Video,
    Audio,
    Document,
    Archive,
    Font,
    Other,
}

impl FileCategory {
    pub fn from_mime(mime_type: &str) -> Self {
        let mime = mime_type.to_lowercase();

        if mime.starts_with("image/") {
            return FileCategory::Image;
        }
        if mime.starts_with("video/") {
            return FileCategory::Video;
        }
        if mime.starts_with("audio/") {
            return FileCategory::Audio;
        }
        if ["pdf", "document", "word", "excel", "powerpoint", "text/"]
            .iter()
            .any(|needle| mime.contains(needle))
        {
            return FileCategory::Document;
        }
        if ["zip", "rar", "7z", "tar", "gz"]
            .iter()
            .any(|needle| mime.contains(needle))
        {
            return FileCategory::Archive;
        }
        if ["font", "ttf", "otf", "woff"]
            .iter()
            .any(|needle| mime.contains(needle))
        {
            return FileCategory::Font;
        }
        FileCategory::Other
    }
}

impl Display for FileCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileCategory::Image => write!(f, "image"),
            FileCategory::Video => write!(f, "video"),
            FileCategory::Audio => write!(f, "audio"),
            FileCategory::Document => write!(f, "document"),
            FileCategory::Archive => write!(f, "archive"),
            FileCategory::Font => write!(f, "font"),
            FileCategory::Other => write!(f, "other"),
        }
    }
}
