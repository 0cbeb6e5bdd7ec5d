use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;

use crate::error::{DamError, DamResult};

/// Locally generated identifier of a selected file. Unique per selection
/// event, so selecting the same filename twice yields two ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(name: &str, disambiguator: u64) -> Self {
        FileId(format!("{}-{}", name, disambiguator))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileId {
    fn from(value: &str) -> Self {
        FileId(value.to_string())
    }
}

/// Binary file handle selected for upload. Lives only in a file registry;
/// never part of serializable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub name: String,
    pub mime_type: String,
    pub content: Bytes,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: impl Into<Bytes>) -> Self {
        FileHandle {
            name: name.into(),
            mime_type: mime_type.into(),
            content: content.into(),
        }
    }

    /// Read a local file, guessing its mime type from the extension.
    pub fn from_path(path: &Path) -> DamResult<Self> {
        if path
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(DamError::Io(format!("Invalid input: {}", path.display())));
        }

        let content = std::fs::read(path)
            .map_err(|e| DamError::Io(format!("Failed to read file {}: {}", path.display(), e)))?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();

        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(FileHandle::new(name, mime_type, content))
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Serializable record of a selected file. Carries metadata only; the bytes
/// stay in the registry under the same [`FileId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingFile {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl PendingFile {
    pub fn from_handle(id: FileId, handle: &FileHandle) -> Self {
        let preview = handle
            .mime_type
            .starts_with("image/")
            .then(|| format!("preview://{}", id));
        PendingFile {
            id,
            name: handle.name.clone(),
            size: handle.size(),
            mime_type: handle.mime_type.clone(),
            preview,
        }
    }
}

/// `{uploaded, replaced, skipped}` counts as reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadCounts {
    #[serde(default)]
    pub uploaded: usize,
    #[serde(default)]
    pub replaced: usize,
    #[serde(default)]
    pub skipped: usize,
}

impl UploadCounts {
    pub fn total(&self) -> usize {
        self.uploaded + self.replaced + self.skipped
    }
}

/// One asset entry of an upload response. Only the fields reconciliation
/// needs are decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default, alias = "uploadStatus", skip_serializing_if = "Option::is_none")]
    pub upload_status: Option<String>,
}

impl UploadedAsset {
    /// Name the user selected, falling back to the stored filename.
    pub fn display_name(&self) -> Option<&str> {
        self.original_name
            .as_deref()
            .or(self.filename.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

/// Wire shape of `POST /assets/upload`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<OneOrMany<UploadedAsset>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub summary: Option<UploadCounts>,
    #[serde(default)]
    pub count: Option<usize>,
}

impl UploadResponse {
    pub fn assets(&self) -> Vec<UploadedAsset> {
        self.data.clone().map(OneOrMany::into_vec).unwrap_or_default()
    }
}

/// What the server does when an uploaded file matches an existing asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateAction {
    Skip,
    Replace,
    Error,
}

impl DuplicateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateAction::Skip => "skip",
            DuplicateAction::Replace => "replace",
            DuplicateAction::Error => "error",
        }
    }
}

impl Display for DuplicateAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicateAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(DuplicateAction::Skip),
            "replace" => Ok(DuplicateAction::Replace),
            "error" => Ok(DuplicateAction::Error),
            _ => Err(anyhow::anyhow!("Invalid duplicate action: {}", s)),
        }
    }
}

/// Metadata and duplicate handling sent with an upload batch. Applies to
/// every file of the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadOptions {
    pub category: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub author: Option<String>,
    pub department: Option<String>,
    pub project: Option<String>,
    pub duplicate_action: Option<DuplicateAction>,
    pub replace_asset_id: Option<i64>,
}

impl UploadOptions {
    /// Text fields of the multipart form. Blank values are left out; tags
    /// are sent as one comma-separated field.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        let text = [
            ("category", &self.category),
            ("description", &self.description),
            ("author", &self.author),
            ("department", &self.department),
            ("project", &self.project),
        ];
        for (name, value) in text {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                fields.push((name, v.to_string()));
            }
        }

        let tags: Vec<&str> = self
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if !tags.is_empty() {
            fields.push(("tags", tags.join(",")));
        }
        if let Some(action) = self.duplicate_action {
            fields.push(("duplicateAction", action.to_string()));
        }
        if let Some(id) = self.replace_asset_id {
            fields.push(("replaceAssetId", id.to_string()));
        }
        fields
    }
}

/// How an [`UploadSummary`] was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileMode {
    /// Per-asset status strings returned by the server.
    Explicit,
    /// Submitted names split by the returned counts, in order.
    Positional,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDetails {
    pub uploaded: Vec<String>,
    pub replaced: Vec<String>,
    pub skipped: Vec<String>,
}

/// Outcome of one upload batch. Counts always equal the lengths of the
/// detail lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub replaced: usize,
    pub skipped: usize,
    pub details: UploadDetails,
    pub mode: ReconcileMode,
}

impl UploadSummary {
    pub fn from_details(details: UploadDetails, mode: ReconcileMode) -> Self {
        UploadSummary {
            uploaded: details.uploaded.len(),
            replaced: details.replaced.len(),
            skipped: details.skipped.len(),
            details,
            mode,
        }
    }

    pub fn total(&self) -> usize {
        self.uploaded + self.replaced + self.skipped
    }
}
