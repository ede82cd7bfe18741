//! Storage provider contract.
//!
//! This module provides the [`StorageProvider`] trait, the single abstraction
//! callers program against. Two implementations ship with the crate:
//!
//! | Backend | Provider |
//! |---------|----------|
//! | Flat prefix-listable bucket | [`ObjectStoreProvider`](crate::ObjectStoreProvider) |
//! | Local directory tree | [`FilesystemProvider`](crate::FilesystemProvider) |
//!
//! Which concrete provider backs a given client is an external wiring
//! concern (see [`ProviderConfig`](crate::ProviderConfig)); the contract
//! expects already-resolved relative paths.
//!
//! # Consistency
//!
//! Operations run to completion per call with no coordination across calls.
//! Multi-item operations (hydration, folder copy, folder trash/delete) are
//! not atomic as a whole: a concurrent mutation of an overlapping path can
//! produce a torn read or a partially completed write, bounded only by the
//! backend's own per-key/per-syscall atomicity.

use async_trait::async_trait;

use crate::entry::{MetadataMap, TreeFile, TreeFolder};
use crate::error::{Error, Result};
use crate::filter::EntryFilter;
use crate::path::TreePathBuf;

/// Options for [`StorageProvider::open_folder`].
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// Predicate applied per hydrated entry.
    pub filter: EntryFilter,
    /// How many levels of children to fetch; `0` returns the bare folder.
    pub max_levels: u32,
}

impl OpenOptions {
    /// Options with no filter and no hydration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hydration depth bound.
    pub fn max_levels(mut self, levels: u32) -> Self {
        self.max_levels = levels;
        self
    }

    /// Set the entry filter.
    pub fn filter(mut self, filter: EntryFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Options for [`StorageProvider::copy`] and [`StorageProvider::move_entry`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyOptions {
    /// Overwrite an existing file at the destination.
    pub replace: bool,
    /// Copy a folder's descendants, not just the folder itself.
    pub recursive: bool,
    /// Copy a folder *into* the target (`target/source-name/...`) instead of
    /// copying its contents directly under the target. Only meaningful for
    /// recursive folder copies.
    pub into: bool,
}

impl CopyOptions {
    /// Non-replacing, non-recursive, content-mode options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow overwriting existing destination files.
    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Copy folder descendants recursively.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Copy the source folder itself into the target.
    pub fn into_target(mut self, into: bool) -> Self {
        self.into = into;
        self
    }
}

/// The storage contract.
///
/// All operations are fallible with the typed kinds in [`Error`]; boolean
/// probes (`exists`, `is_folder`, `is_file`) never fail for "absent", only
/// for backend communication failures.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Create a folder, creating every missing ancestor with no metadata.
    ///
    /// Existing ancestors are left untouched.
    ///
    /// # Errors
    /// - `FolderExists` when the target folder already exists
    /// - `PathExists` when a file occupies the target path
    async fn create_folder(
        &self,
        path: &TreePathBuf,
        description: Option<String>,
        metadata: Option<MetadataMap>,
    ) -> Result<TreeFolder>;

    /// Open a folder, hydrating up to `max_levels` levels of children that
    /// satisfy the filter. Never returns an absent folder as a value.
    ///
    /// # Errors
    /// - `NoSuchFolder` when the path is absent
    /// - `NotAFolder` when the path resolves to a file
    async fn open_folder(&self, path: &TreePathBuf, options: OpenOptions) -> Result<TreeFolder>;

    /// Create a file with the given content, creating missing ancestors.
    ///
    /// # Errors
    /// - `FileExists` when the target already denotes a managed file
    /// - `PathExists` when a folder occupies the target path
    async fn create_file(
        &self,
        path: &TreePathBuf,
        content: &[u8],
        description: Option<String>,
        metadata: Option<MetadataMap>,
    ) -> Result<TreeFile>;

    /// Read a managed file's content.
    ///
    /// # Errors
    /// - `NoSuchPath` when the path does not denote a managed file
    async fn read(&self, path: &TreePathBuf) -> Result<Vec<u8>>;

    /// Read the caller-supplied metadata map of a managed entry, or `None`
    /// when none was ever set.
    ///
    /// # Errors
    /// - `NoSuchPath` when the path is unmanaged
    async fn read_metadata(&self, path: &TreePathBuf) -> Result<Option<MetadataMap>>;

    /// Whether a managed entry lives at the path.
    async fn exists(&self, path: &TreePathBuf) -> Result<bool>;

    /// Whether a managed folder lives at the path.
    async fn is_folder(&self, path: &TreePathBuf) -> Result<bool>;

    /// Whether a managed file lives at the path.
    async fn is_file(&self, path: &TreePathBuf) -> Result<bool>;

    /// Whether a managed folder has zero direct children.
    ///
    /// # Errors
    /// - `NoSuchPath` when the path is absent
    /// - `NotAFolder` when the path resolves to a file
    async fn is_empty(&self, path: &TreePathBuf) -> Result<bool>;

    /// Copy an entry per the shape decision table:
    ///
    /// | source | target | behavior |
    /// |--------|--------|----------|
    /// | folder | existing folder, `into` | source folder lands at `target/source-name/...` |
    /// | folder | existing folder, content mode | source's contents land directly under `target/...` |
    /// | folder | missing | target folder is created first, then as above |
    /// | file | folder | file copied into the folder, name kept |
    /// | file | file-shaped path | copy renames to the target's name |
    /// | folder | file | fails, a folder cannot become a file |
    ///
    /// Copying a file onto itself fails with `PathExists`, as does any file
    /// collision without `replace`. A failure partway through a multi-item
    /// folder copy does not roll back items already copied.
    async fn copy(
        &self,
        source: &TreePathBuf,
        target: &TreePathBuf,
        options: CopyOptions,
    ) -> Result<()>;

    /// Move an entry: a copy followed by a forced trash of the source.
    ///
    /// When the copy half fails the source is left untouched.
    async fn move_entry(
        &self,
        source: &TreePathBuf,
        target: &TreePathBuf,
        options: CopyOptions,
    ) -> Result<()> {
        self.copy(source, target, options).await?;
        self.trash(source, true).await
    }

    /// Soft-delete: relocate the entry to the parallel trash root. After
    /// success the path is absent from the live tree.
    ///
    /// # Errors
    /// - `NoSuchPath` when the path is absent
    /// - `FolderNotEmpty` for a non-empty folder without `force`
    async fn trash(&self, path: &TreePathBuf, force: bool) -> Result<()>;

    /// [`trash`](Self::trash), but silently a no-op when the path never
    /// existed. Returns whether anything was trashed.
    async fn trash_if_exists(&self, path: &TreePathBuf, force: bool) -> Result<bool> {
        if !self.exists(path).await? {
            return Ok(false);
        }
        self.trash(path, force).await?;
        Ok(true)
    }

    /// Permanently remove an entry currently residing in the trash root.
    /// Deleting a folder removes all of its descendants.
    ///
    /// # Errors
    /// - `NoSuchPath` when the path is not present in the trash root
    async fn delete(&self, path: &TreePathBuf) -> Result<()>;

    /// [`delete`](Self::delete), but silently a no-op when the path is not
    /// in the trash root. Returns whether anything was deleted.
    async fn delete_if_exists(&self, path: &TreePathBuf) -> Result<bool> {
        match self.delete(path).await {
            Ok(()) => Ok(true),
            Err(Error::NoSuchPath(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
