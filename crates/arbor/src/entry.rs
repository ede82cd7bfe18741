//! Tree entry value types.
//!
//! Entries are immutable snapshots produced by a provider call; mutating the
//! backend afterwards does not change an entry already returned. The backend
//! envelope is the durable record, these types are its in-memory view.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::path::TreePathBuf;

/// Application-defined metadata attached to an entry.
pub type MetadataMap = HashMap<String, String>;

/// Capabilities shared by every entry: identity, description, metadata, and
/// the three timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryInfo {
    /// Relative logical path of the entry.
    pub path: TreePathBuf,
    /// Display name; defaults to the path's final segment.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Optional application-defined metadata map.
    pub metadata: Option<MetadataMap>,
    /// Creation timestamp.
    pub created: Option<DateTime<Utc>>,
    /// Last modification timestamp.
    pub modified: Option<DateTime<Utc>>,
    /// Last access timestamp.
    pub accessed: Option<DateTime<Utc>>,
}

impl EntryInfo {
    /// Create an info block with the name derived from the path.
    pub fn new(path: TreePathBuf) -> Self {
        let name = path.name().to_string();
        Self {
            path,
            name,
            description: None,
            metadata: None,
            created: None,
            modified: None,
            accessed: None,
        }
    }

    /// Whether a caller-supplied metadata map is present and non-empty.
    pub fn has_metadata(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| !m.is_empty())
    }
}

/// Enumerated MIME category of a file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    /// Plain or structured text.
    Text,
    /// Raster or vector images.
    Image,
    /// Audio streams.
    Audio,
    /// Video streams.
    Video,
    /// Generic binary content.
    Application,
    /// Anything outside the enumerated categories.
    Other(String),
}

impl ContentType {
    /// Guess a category from a file name's extension.
    pub fn from_name(name: &str) -> Self {
        let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        match ext.as_str() {
            "txt" | "md" | "json" | "xml" | "html" | "htm" | "css" | "csv" | "log" | "toml"
            | "yaml" | "yml" => Self::Text,
            "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "bmp" | "ico" => Self::Image,
            "mp3" | "wav" | "ogg" | "flac" | "aac" => Self::Audio,
            "mp4" | "mkv" | "mov" | "webm" | "avi" => Self::Video,
            _ => Self::Application,
        }
    }

    /// The category as its persisted string form.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Application => "application",
            Self::Other(s) => s,
        }
    }

    /// Parse the persisted string form back into a category.
    pub fn parse(s: &str) -> Self {
        match s {
            "text" => Self::Text,
            "image" => Self::Image,
            "audio" => Self::Audio,
            "video" => Self::Video,
            "application" => Self::Application,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A file entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeFile {
    /// Shared entry capabilities.
    pub info: EntryInfo,
    /// Byte length, `-1` when unknown.
    pub size: i64,
    /// Opaque content hash.
    pub checksum: Option<String>,
    /// Content category.
    pub content_type: ContentType,
}

/// A folder entry with optionally populated children.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeFolder {
    /// Shared entry capabilities.
    pub info: EntryInfo,
    /// `None` until the caller requested children (depth >= 1); a populated
    /// empty collection means "folder confirmed empty".
    items: Option<Vec<TreeEntry>>,
}

impl TreeFolder {
    /// Create an unpopulated folder.
    pub fn new(info: EntryInfo) -> Self {
        Self { info, items: None }
    }

    /// Child entries, or `None` when the folder was not populated.
    pub fn items(&self) -> Option<&[TreeEntry]> {
        self.items.as_deref()
    }

    /// Whether the populated collection is non-empty.
    pub fn has_items(&self) -> bool {
        self.items.as_ref().is_some_and(|items| !items.is_empty())
    }

    /// Switch an unpopulated folder to "populated, no children yet".
    pub fn mark_populated(&mut self) {
        if self.items.is_none() {
            self.items = Some(Vec::new());
        }
    }

    /// Attach a child, keeping names unique.
    ///
    /// When a child with the same name is already attached, the existing
    /// child is returned and the candidate is dropped. Insertion order is
    /// preserved for new names.
    pub fn attach_child(&mut self, child: TreeEntry) -> &mut TreeEntry {
        let items = self.items.get_or_insert_with(Vec::new);
        if let Some(pos) = items.iter().position(|e| e.name() == child.name()) {
            return &mut items[pos];
        }
        items.push(child);
        let last = items.len() - 1;
        &mut items[last]
    }

    /// Attach a chain of entries below this folder, one level per element,
    /// reusing existing children by name. Intermediate elements must be
    /// folders; the chain stops early at a file-shaped intermediate.
    pub(crate) fn attach_chain(&mut self, mut chain: std::collections::VecDeque<TreeEntry>) {
        let Some(entry) = chain.pop_front() else {
            return;
        };
        let descend = !chain.is_empty();
        let attached = self.attach_child(entry);
        if descend {
            if let TreeEntry::Folder(folder) = attached {
                folder.mark_populated();
                folder.attach_chain(chain);
            }
        }
    }
}

/// A tree entry: folder or file.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEntry {
    /// Folder variant.
    Folder(TreeFolder),
    /// File variant.
    File(TreeFile),
}

impl TreeEntry {
    /// Shared entry capabilities.
    pub fn info(&self) -> &EntryInfo {
        match self {
            Self::Folder(f) => &f.info,
            Self::File(f) => &f.info,
        }
    }

    /// Entry name.
    pub fn name(&self) -> &str {
        &self.info().name
    }

    /// Relative logical path.
    pub fn path(&self) -> &TreePathBuf {
        &self.info().path
    }

    /// Whether this entry is a folder.
    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder(_))
    }

    /// Whether this entry is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    /// Borrow the folder variant.
    pub fn as_folder(&self) -> Option<&TreeFolder> {
        match self {
            Self::Folder(f) => Some(f),
            Self::File(_) => None,
        }
    }

    /// Borrow the file variant.
    pub fn as_file(&self) -> Option<&TreeFile> {
        match self {
            Self::File(f) => Some(f),
            Self::Folder(_) => None,
        }
    }
}
