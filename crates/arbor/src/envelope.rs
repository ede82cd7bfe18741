//! Persisted entry envelope.
//!
//! The envelope is the durable record of a managed entry. The object-store
//! backend keeps it in a user-metadata attribute on the object; the
//! filesystem backend stores it as the body of a side-car file. A backend
//! entry without a parseable envelope is unmanaged and invisible to the
//! contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{ContentType, EntryInfo, MetadataMap, TreeEntry, TreeFile, TreeFolder};
use crate::error::{Error, Result};
use crate::path::TreePathBuf;

/// User-metadata attribute under which the object store keeps the envelope.
pub const ENVELOPE_ATTRIBUTE: &str = "arbor-envelope";

/// Entry shape tag in the persisted envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A file entry.
    File,
    /// A folder entry.
    Folder,
}

/// The persisted JSON envelope.
///
/// Timestamps serialize as RFC 3339 / ISO-8601. File-only fields stay absent
/// on folder envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Relative logical path of the entry.
    pub path: String,
    /// Display name, normally the path's final segment.
    pub name: String,
    /// Entry shape.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Optional free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional application-defined metadata map.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataMap>,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    /// Last modification timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_time: Option<DateTime<Utc>>,
    /// Last access timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed_time: Option<DateTime<Utc>>,
    /// Byte length, file only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Content hash, file only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Content category, file only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl Envelope {
    /// Build a folder envelope stamped with the current time.
    pub fn folder(
        path: &TreePathBuf,
        description: Option<String>,
        metadata: Option<MetadataMap>,
    ) -> Self {
        let now = Utc::now();
        Self {
            path: path.as_str().to_string(),
            name: path.name().to_string(),
            kind: EntryKind::Folder,
            description,
            metadata,
            creation_time: Some(now),
            last_modified_time: Some(now),
            last_accessed_time: Some(now),
            size: None,
            checksum: None,
            content_type: None,
        }
    }

    /// Build a file envelope stamped with the current time.
    pub fn file(
        path: &TreePathBuf,
        size: i64,
        checksum: Option<String>,
        content_type: ContentType,
        description: Option<String>,
        metadata: Option<MetadataMap>,
    ) -> Self {
        let now = Utc::now();
        Self {
            path: path.as_str().to_string(),
            name: path.name().to_string(),
            kind: EntryKind::File,
            description,
            metadata,
            creation_time: Some(now),
            last_modified_time: Some(now),
            last_accessed_time: Some(now),
            size: Some(size),
            checksum,
            content_type: Some(content_type.as_str().to_string()),
        }
    }

    /// Whether this envelope describes a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    /// Rewrite the stored location, keeping everything else intact.
    ///
    /// Used after copy/move: a bulk backend copy preserves the envelope
    /// bytes, so the embedded `path` (and `name` on a rename) must be
    /// re-pointed at the new location.
    pub fn relocate(&mut self, path: &TreePathBuf) {
        self.path = path.as_str().to_string();
        self.name = path.name().to_string();
    }

    /// Convert to the in-memory entry snapshot.
    pub fn to_entry(&self) -> Result<TreeEntry> {
        let path = TreePathBuf::new(&self.path)
            .map_err(|_| Error::Backend(format!("envelope carries invalid path: {}", self.path)))?;
        let info = EntryInfo {
            name: self.name.clone(),
            path,
            description: self.description.clone(),
            metadata: self.metadata.clone(),
            created: self.creation_time,
            modified: self.last_modified_time,
            accessed: self.last_accessed_time,
        };
        Ok(match self.kind {
            EntryKind::Folder => TreeEntry::Folder(TreeFolder::new(info)),
            EntryKind::File => TreeEntry::File(TreeFile {
                info,
                size: self.size.unwrap_or(-1),
                checksum: self.checksum.clone(),
                content_type: self
                    .content_type
                    .as_deref()
                    .map(ContentType::parse)
                    .unwrap_or(ContentType::Application),
            }),
        })
    }

    /// Convert to a folder snapshot.
    ///
    /// # Errors
    /// - `NotAFolder` when the envelope describes a file
    pub fn to_folder(&self) -> Result<TreeFolder> {
        match self.to_entry()? {
            TreeEntry::Folder(folder) => Ok(folder),
            TreeEntry::File(_) => Err(Error::NotAFolder(self.path.clone())),
        }
    }

    /// Convert to a file snapshot.
    ///
    /// # Errors
    /// - `NotAFile` when the envelope describes a folder
    pub fn to_file(&self) -> Result<TreeFile> {
        match self.to_entry()? {
            TreeEntry::File(file) => Ok(file),
            TreeEntry::Folder(_) => Err(Error::NotAFile(self.path.clone())),
        }
    }

    /// Serialize to the persisted JSON form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the persisted JSON form.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Parse the persisted JSON form from raw bytes.
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }
}
