//! Local-filesystem storage provider.
//!
//! Every managed folder or file is marked by a side-car metadata file
//! holding the JSON envelope: `<name>.d` beside a managed directory,
//! `<name>.f` beside a managed file. A bare directory or file without a
//! side-car is unmanaged and invisible to the contract. Three recursive
//! visitors walk the real tree: hydrate (open), move (trash relocation),
//! and reindex (post-copy rewriting of each side-car's stored path).

use async_trait::async_trait;
use std::collections::HashSet;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tracing::{debug, warn};

use crate::entry::{ContentType, MetadataMap, TreeEntry, TreeFile, TreeFolder};
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::filter::EntryFilter;
use crate::path::TreePathBuf;
use crate::provider::{CopyOptions, OpenOptions, StorageProvider};

/// Fixed suffix deriving the trash root from the live root.
pub const TRASH_ROOT_SUFFIX: &str = ".trash";

/// Side-car suffix marking a managed directory.
const FOLDER_SIDECAR_SUFFIX: &str = ".d";

/// Side-car suffix marking a managed file.
const FILE_SIDECAR_SUFFIX: &str = ".f";

/// Boxed, Send future - the return type of the recursive visitors.
type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Append a suffix to a path's final component.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

/// Side-car path of a managed directory.
fn folder_sidecar(dir: &Path) -> PathBuf {
    with_suffix(dir, FOLDER_SIDECAR_SUFFIX)
}

/// Side-car path of a managed file.
fn file_sidecar(file: &Path) -> PathBuf {
    with_suffix(file, FILE_SIDECAR_SUFFIX)
}

/// Read and parse a side-car. A present side-car that fails to parse marks
/// the entry unmanaged, same as an absent one.
async fn read_sidecar(path: &Path) -> Result<Option<Envelope>> {
    match fs::read(path).await {
        Ok(raw) => match Envelope::from_slice(&raw) {
            Ok(env) => Ok(Some(env)),
            Err(e) => {
                debug!("unparseable side-car {}: {}", path.display(), e);
                Ok(None)
            }
        },
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_sidecar(path: &Path, env: &Envelope) -> Result<()> {
    fs::write(path, env.to_json()?.as_bytes()).await?;
    Ok(())
}

/// The managing envelope of an OS directory, if any.
async fn dir_envelope(dir: &Path) -> Result<Option<Envelope>> {
    match fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => read_sidecar(&folder_sidecar(dir)).await,
        Ok(_) => Ok(None),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// The managing envelope of an OS file, if any.
async fn file_envelope(file: &Path) -> Result<Option<Envelope>> {
    match fs::metadata(file).await {
        Ok(meta) if meta.is_file() => read_sidecar(&file_sidecar(file)).await,
        Ok(_) => Ok(None),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Move one file, falling back to copy-then-delete when the rename
/// primitive fails (cross-device trash roots).
async fn move_file(src: &Path, dst: &Path) -> Result<()> {
    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(src, dst).await?;
            fs::remove_file(src).await?;
            Ok(())
        }
    }
}

/// A managed child of a directory: its OS path, name, and envelope.
struct ManagedChild {
    os_path: PathBuf,
    name: String,
    envelope: Envelope,
}

/// List a directory's managed children in name order.
///
/// Side-car files of present siblings are not children themselves, and any
/// entry without a parseable side-car is skipped.
async fn managed_children(dir: &Path) -> Result<Vec<ManagedChild>> {
    let mut read_dir = match fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut listed: Vec<(String, bool)> = Vec::new();
    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry.file_type().await?.is_dir();
        listed.push((name, is_dir));
    }
    listed.sort();

    let present: HashSet<&str> = listed.iter().map(|(name, _)| name.as_str()).collect();
    let mut children = Vec::new();
    for (name, is_dir) in &listed {
        if !is_dir {
            let sidecar_of_sibling = [FOLDER_SIDECAR_SUFFIX, FILE_SIDECAR_SUFFIX]
                .iter()
                .any(|suffix| {
                    name.strip_suffix(suffix)
                        .is_some_and(|base| present.contains(base))
                });
            if sidecar_of_sibling {
                continue;
            }
        }
        let os_path = dir.join(name);
        let envelope = if *is_dir {
            dir_envelope(&os_path).await?
        } else {
            file_envelope(&os_path).await?
        };
        if let Some(envelope) = envelope {
            children.push(ManagedChild {
                os_path,
                name: name.clone(),
                envelope,
            });
        }
    }
    Ok(children)
}

/// Hydrate visitor: attach a directory's managed children to `folder`,
/// recursing while levels remain. Unmanaged and filtered-out subtrees are
/// skipped entirely.
fn hydrate_children<'a>(
    dir: &'a Path,
    folder: &'a mut TreeFolder,
    levels: u32,
    filter: &'a EntryFilter,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        folder.mark_populated();
        for child in managed_children(dir).await? {
            if !filter.accepts(&child.name) {
                continue;
            }
            let attached = folder.attach_child(child.envelope.to_entry()?);
            if levels > 1 {
                if let TreeEntry::Folder(sub) = attached {
                    hydrate_children(&child.os_path, sub, levels - 1, filter).await?;
                }
            }
        }
        Ok(())
    })
}

/// Copy visitor: replicate a directory's managed children (content and
/// side-cars) under a destination directory.
fn copy_children<'a>(
    src_dir: &'a Path,
    dst_dir: &'a Path,
    dst_rel: &'a TreePathBuf,
    replace: bool,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        fs::create_dir_all(dst_dir).await?;
        for child in managed_children(src_dir).await? {
            let dst_child = dst_dir.join(&child.name);
            let child_rel = dst_rel.join(&child.name)?;
            if child.envelope.is_folder() {
                fs::create_dir_all(&dst_child).await?;
                fs::copy(folder_sidecar(&child.os_path), folder_sidecar(&dst_child)).await?;
                copy_children(&child.os_path, &dst_child, &child_rel, replace).await?;
            } else {
                if !replace && file_envelope(&dst_child).await?.is_some() {
                    return Err(Error::PathExists(child_rel.to_string()));
                }
                fs::copy(&child.os_path, &dst_child).await?;
                fs::copy(file_sidecar(&child.os_path), file_sidecar(&dst_child)).await?;
            }
        }
        Ok(())
    })
}

/// Move visitor: relocate a directory's contents, then remove the emptied
/// source directory post-order. The native rename primitive is not
/// recursive, so the subtree is walked explicitly; per-entry failures are
/// logged and the walk continues.
fn move_tree<'a>(src_dir: &'a Path, dst_dir: &'a Path) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        fs::create_dir_all(dst_dir).await?;
        let mut read_dir = fs::read_dir(src_dir).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let src_child = entry.path();
            let dst_child = dst_dir.join(entry.file_name());
            let moved = if entry.file_type().await?.is_dir() {
                move_tree(&src_child, &dst_child).await
            } else {
                move_file(&src_child, &dst_child).await
            };
            if let Err(e) = moved {
                warn!("failed to relocate {}: {}", src_child.display(), e);
            }
        }
        if let Err(e) = fs::remove_dir(src_dir).await {
            warn!("failed to remove emptied directory {}: {}", src_dir.display(), e);
        }
        Ok(())
    })
}

/// Reindex visitor: rewrite each side-car's stored logical path below a
/// copied or moved subtree. A bulk copy preserves side-car bytes, so the
/// embedded locations still point at the old subtree until this pass runs.
fn reindex_tree<'a>(dir: &'a Path, rel: &'a TreePathBuf) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let own = folder_sidecar(dir);
        if let Some(mut env) = read_sidecar(&own).await? {
            env.relocate(rel);
            write_sidecar(&own, &env).await?;
        }
        for child in managed_children(dir).await? {
            let child_rel = rel.join(&child.name)?;
            if child.envelope.is_folder() {
                reindex_tree(&child.os_path, &child_rel).await?;
            } else {
                let mut env = child.envelope;
                env.relocate(&child_rel);
                write_sidecar(&file_sidecar(&child.os_path), &env).await?;
            }
        }
        Ok(())
    })
}

/// Storage provider over a local directory tree.
pub struct FilesystemProvider {
    root: PathBuf,
    trash_root: PathBuf,
}

impl FilesystemProvider {
    /// Create a provider rooted at the given directory. The trash root is
    /// the sibling directory derived by the fixed [`TRASH_ROOT_SUFFIX`]
    /// convention.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let trash_root = with_suffix(&root, TRASH_ROOT_SUFFIX);
        Self { root, trash_root }
    }

    /// Override the derived trash root.
    pub fn with_trash_root(mut self, trash_root: impl Into<PathBuf>) -> Self {
        self.trash_root = trash_root.into();
        self
    }

    /// The live root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The trash root directory.
    pub fn trash_root(&self) -> &Path {
        &self.trash_root
    }

    fn live_path(&self, path: &TreePathBuf) -> PathBuf {
        self.root.join(path.as_str())
    }

    fn trash_path(&self, path: &TreePathBuf) -> PathBuf {
        self.trash_root.join(path.as_str())
    }

    /// Create every missing ancestor folder with no metadata; existing
    /// ancestors are left untouched.
    async fn ensure_ancestors(&self, path: &TreePathBuf) -> Result<()> {
        for ancestor in path.ancestors() {
            let os = self.live_path(&ancestor);
            if dir_envelope(&os).await?.is_some() {
                continue;
            }
            if file_envelope(&os).await?.is_some() {
                return Err(Error::NotAFolder(ancestor.to_string()));
            }
            fs::create_dir_all(&os).await?;
            let env = Envelope::folder(&ancestor, None, None);
            write_sidecar(&folder_sidecar(&os), &env).await?;
        }
        Ok(())
    }

    async fn copy_file_entry(
        &self,
        source: &TreePathBuf,
        env: Envelope,
        target: &TreePathBuf,
        options: CopyOptions,
    ) -> Result<()> {
        let dest = if dir_envelope(&self.live_path(target)).await?.is_some() {
            target.join(source.name())?
        } else {
            target.clone()
        };
        if dest == *source {
            return Err(Error::PathExists(dest.to_string()));
        }
        let dest_os = self.live_path(&dest);
        if dir_envelope(&dest_os).await?.is_some() {
            return Err(Error::PathExists(dest.to_string()));
        }
        if !options.replace && file_envelope(&dest_os).await?.is_some() {
            return Err(Error::PathExists(dest.to_string()));
        }
        self.ensure_ancestors(&dest).await?;
        if let Some(parent) = dest_os.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(self.live_path(source), &dest_os).await?;
        let mut env = env;
        env.relocate(&dest);
        write_sidecar(&file_sidecar(&dest_os), &env).await
    }

    async fn copy_folder_entry(
        &self,
        source: &TreePathBuf,
        env: Envelope,
        target: &TreePathBuf,
        options: CopyOptions,
    ) -> Result<()> {
        let target_os = self.live_path(target);
        if file_envelope(&target_os).await?.is_some() {
            // A folder cannot become a file.
            return Err(Error::NotAFolder(target.to_string()));
        }
        if dir_envelope(&target_os).await?.is_none() {
            self.create_folder(target, None, None).await?;
        }

        let base = if options.into {
            target.join(source.name())?
        } else {
            target.clone()
        };
        if base == *source {
            return Err(Error::PathExists(base.to_string()));
        }
        let base_os = self.live_path(&base);
        if options.into {
            // The source folder itself lands at base, envelope included.
            fs::create_dir_all(&base_os).await?;
            write_sidecar(&folder_sidecar(&base_os), &env).await?;
        }
        if options.recursive {
            copy_children(&self.live_path(source), &base_os, &base, options.replace).await?;
        }
        // Post-copy housekeeping: the copied side-cars still carry their old
        // locations until the destination subtree is reindexed.
        reindex_tree(&base_os, &base).await
    }
}

#[async_trait]
impl StorageProvider for FilesystemProvider {
    async fn create_folder(
        &self,
        path: &TreePathBuf,
        description: Option<String>,
        metadata: Option<MetadataMap>,
    ) -> Result<TreeFolder> {
        let os = self.live_path(path);
        if dir_envelope(&os).await?.is_some() {
            return Err(Error::FolderExists(path.to_string()));
        }
        if file_envelope(&os).await?.is_some() {
            return Err(Error::PathExists(path.to_string()));
        }
        self.ensure_ancestors(path).await?;
        fs::create_dir_all(&os).await?;
        let env = Envelope::folder(path, description, metadata);
        write_sidecar(&folder_sidecar(&os), &env).await?;
        env.to_folder()
    }

    async fn open_folder(&self, path: &TreePathBuf, options: OpenOptions) -> Result<TreeFolder> {
        let os = self.live_path(path);
        let Some(env) = dir_envelope(&os).await? else {
            if file_envelope(&os).await?.is_some() {
                return Err(Error::NotAFolder(path.to_string()));
            }
            return Err(Error::NoSuchFolder(path.to_string()));
        };
        let mut top = env.to_folder()?;
        if options.max_levels == 0 {
            return Ok(top);
        }
        hydrate_children(&os, &mut top, options.max_levels, &options.filter).await?;
        Ok(top)
    }

    async fn create_file(
        &self,
        path: &TreePathBuf,
        content: &[u8],
        description: Option<String>,
        metadata: Option<MetadataMap>,
    ) -> Result<TreeFile> {
        let os = self.live_path(path);
        if file_envelope(&os).await?.is_some() {
            return Err(Error::FileExists(path.to_string()));
        }
        if dir_envelope(&os).await?.is_some() {
            return Err(Error::PathExists(path.to_string()));
        }
        self.ensure_ancestors(path).await?;
        if let Some(parent) = os.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&os, content).await?;
        let env = Envelope::file(
            path,
            content.len() as i64,
            Some(sha256_hex(content)),
            ContentType::from_name(path.name()),
            description,
            metadata,
        );
        write_sidecar(&file_sidecar(&os), &env).await?;
        env.to_file()
    }

    async fn read(&self, path: &TreePathBuf) -> Result<Vec<u8>> {
        let os = self.live_path(path);
        if file_envelope(&os).await?.is_none() {
            if dir_envelope(&os).await?.is_some() {
                return Err(Error::NotAFile(path.to_string()));
            }
            return Err(Error::NoSuchPath(path.to_string()));
        }
        Ok(fs::read(&os).await?)
    }

    async fn read_metadata(&self, path: &TreePathBuf) -> Result<Option<MetadataMap>> {
        let os = self.live_path(path);
        if let Some(env) = dir_envelope(&os).await? {
            return Ok(env.metadata);
        }
        if let Some(env) = file_envelope(&os).await? {
            return Ok(env.metadata);
        }
        Err(Error::NoSuchPath(path.to_string()))
    }

    async fn exists(&self, path: &TreePathBuf) -> Result<bool> {
        Ok(self.is_folder(path).await? || self.is_file(path).await?)
    }

    async fn is_folder(&self, path: &TreePathBuf) -> Result<bool> {
        Ok(dir_envelope(&self.live_path(path)).await?.is_some())
    }

    async fn is_file(&self, path: &TreePathBuf) -> Result<bool> {
        Ok(file_envelope(&self.live_path(path)).await?.is_some())
    }

    async fn is_empty(&self, path: &TreePathBuf) -> Result<bool> {
        let os = self.live_path(path);
        if dir_envelope(&os).await?.is_none() {
            if file_envelope(&os).await?.is_some() {
                return Err(Error::NotAFolder(path.to_string()));
            }
            return Err(Error::NoSuchPath(path.to_string()));
        }
        Ok(managed_children(&os).await?.is_empty())
    }

    async fn copy(
        &self,
        source: &TreePathBuf,
        target: &TreePathBuf,
        options: CopyOptions,
    ) -> Result<()> {
        let src_os = self.live_path(source);
        if let Some(env) = dir_envelope(&src_os).await? {
            return self.copy_folder_entry(source, env, target, options).await;
        }
        if let Some(env) = file_envelope(&src_os).await? {
            return self.copy_file_entry(source, env, target, options).await;
        }
        Err(Error::NoSuchPath(source.to_string()))
    }

    async fn trash(&self, path: &TreePathBuf, force: bool) -> Result<()> {
        let src_os = self.live_path(path);
        if dir_envelope(&src_os).await?.is_some() {
            if !force && !managed_children(&src_os).await?.is_empty() {
                return Err(Error::FolderNotEmpty(path.to_string()));
            }
            let dst_os = self.trash_path(path);
            if let Some(parent) = dst_os.parent() {
                fs::create_dir_all(parent).await?;
            }
            move_tree(&src_os, &dst_os).await?;
            move_file(&folder_sidecar(&src_os), &folder_sidecar(&dst_os)).await?;
            return Ok(());
        }
        if file_envelope(&src_os).await?.is_some() {
            let dst_os = self.trash_path(path);
            if let Some(parent) = dst_os.parent() {
                fs::create_dir_all(parent).await?;
            }
            move_file(&src_os, &dst_os).await?;
            move_file(&file_sidecar(&src_os), &file_sidecar(&dst_os)).await?;
            return Ok(());
        }
        Err(Error::NoSuchPath(path.to_string()))
    }

    async fn delete(&self, path: &TreePathBuf) -> Result<()> {
        let os = self.trash_path(path);
        if dir_envelope(&os).await?.is_some() {
            fs::remove_dir_all(&os).await?;
            return remove_if_exists(&folder_sidecar(&os)).await;
        }
        if file_envelope(&os).await?.is_some() {
            fs::remove_file(&os).await?;
            return remove_if_exists(&file_sidecar(&os)).await;
        }
        Err(Error::NoSuchPath(path.to_string()))
    }
}

fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let result = Sha256::digest(data);
    result.iter().map(|b| format!("{:02x}", b)).collect()
}
