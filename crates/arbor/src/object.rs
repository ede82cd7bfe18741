//! Object-store storage provider.
//!
//! The backend is a flat, prefix-listable key space with no native directory
//! concept: folder keys carry a trailing delimiter, file keys do not, and
//! one listing call returns an entire subtree's keys unordered. This module
//! owns the flat-to-tree hydration algorithm that folds such a listing into
//! a nested [`TreeFolder`], plus trash/delete as per-key copy-then-delete
//! loops against a sibling trash bucket.
//!
//! # Hydration
//!
//! Opening a folder at depth `0` costs one metadata fetch. At depth `n` it
//! costs one prefix listing plus at most one metadata fetch per distinct
//! key touched in the requested subtree: every key's segment walk consults a
//! per-call bounded LRU cache first, so a folder touched by many sibling
//! keys is fetched once, not once per sibling. The cache lives for exactly
//! one `open_folder` call; there is no cross-request reuse and therefore no
//! cross-request invalidation.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::bucket::{Attributes, ObjectStore};
use crate::entry::{ContentType, MetadataMap, TreeFile, TreeFolder};
use crate::envelope::{Envelope, ENVELOPE_ATTRIBUTE};
use crate::error::{Error, Result};
use crate::filter::EntryFilter;
use crate::path::{parse_key, TreePathBuf, DELIMITER};
use crate::provider::{CopyOptions, OpenOptions, StorageProvider};

/// Fixed suffix deriving the trash bucket from the live bucket.
pub const TRASH_BUCKET_SUFFIX: &str = "-trash";

/// Capacity of the per-hydration envelope lookup cache.
const LOOKUP_CACHE_CAPACITY: usize = 100;

/// Per-hydration memo of envelope lookups, bounded with least-recently-used
/// eviction. Scoped to a single `open_folder` call and passed by reference
/// through the key walk.
struct LookupCache {
    map: HashMap<String, Option<Envelope>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl LookupCache {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&mut self, key: &str) -> Option<Option<Envelope>> {
        let hit = self.map.get(key).cloned()?;
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(touched) = self.order.remove(pos) {
                self.order.push_back(touched);
            }
        }
        Some(hit)
    }

    fn insert(&mut self, key: String, value: Option<Envelope>) {
        if self.map.contains_key(&key) {
            self.map.insert(key, value);
            return;
        }
        if self.map.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.map.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.map.insert(key, value);
    }
}

/// Storage provider over a flat object store.
pub struct ObjectStoreProvider {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    trash_bucket: String,
}

impl ObjectStoreProvider {
    /// Create a provider over the given bucket. The trash bucket is derived
    /// by the fixed [`TRASH_BUCKET_SUFFIX`] convention.
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let trash_bucket = format!("{bucket}{TRASH_BUCKET_SUFFIX}");
        Self {
            store,
            bucket,
            trash_bucket,
        }
    }

    /// Override the derived trash bucket name.
    pub fn with_trash_bucket(mut self, trash_bucket: impl Into<String>) -> Self {
        self.trash_bucket = trash_bucket.into();
        self
    }

    /// The live bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The trash bucket name.
    pub fn trash_bucket(&self) -> &str {
        &self.trash_bucket
    }

    /// Fetch and parse the envelope attribute of a key, if the object exists
    /// and is managed. A present object whose envelope is missing or fails
    /// to parse is unmanaged and reads as absent.
    async fn load_envelope(&self, bucket: &str, key: &str) -> Result<Option<Envelope>> {
        let Some(info) = self.store.head(bucket, key).await? else {
            return Ok(None);
        };
        let Some(raw) = info.attributes.get(ENVELOPE_ATTRIBUTE) else {
            return Ok(None);
        };
        match Envelope::from_json(raw) {
            Ok(env) => Ok(Some(env)),
            Err(e) => {
                debug!("unparseable envelope on {}/{}: {}", bucket, key, e);
                Ok(None)
            }
        }
    }

    /// Cache-aware envelope lookup used during hydration.
    async fn cached_envelope(
        &self,
        cache: &mut LookupCache,
        key: &str,
    ) -> Result<Option<Envelope>> {
        if let Some(hit) = cache.get(key) {
            return Ok(hit);
        }
        let env = self.load_envelope(&self.bucket, key).await?;
        cache.insert(key.to_string(), env.clone());
        Ok(env)
    }

    fn envelope_attributes(env: &Envelope) -> Result<Attributes> {
        Ok(Attributes::from([(
            ENVELOPE_ATTRIBUTE.to_string(),
            env.to_json()?,
        )]))
    }

    /// Write a folder's placeholder object (empty body, envelope attribute).
    async fn put_folder(&self, path: &TreePathBuf, env: &Envelope) -> Result<()> {
        let attrs = Self::envelope_attributes(env)?;
        self.store
            .put(&self.bucket, &path.folder_key(), &[], attrs)
            .await
    }

    /// Create every missing ancestor folder with no metadata; existing
    /// ancestors are left untouched.
    async fn ensure_ancestors(&self, path: &TreePathBuf) -> Result<()> {
        for ancestor in path.ancestors() {
            if self
                .load_envelope(&self.bucket, &ancestor.folder_key())
                .await?
                .is_some()
            {
                continue;
            }
            if self
                .load_envelope(&self.bucket, &ancestor.file_key())
                .await?
                .is_some()
            {
                return Err(Error::NotAFolder(ancestor.to_string()));
            }
            let env = Envelope::folder(&ancestor, None, None);
            self.put_folder(&ancestor, &env).await?;
        }
        Ok(())
    }

    /// Fold one listed key into the tree under `top`.
    ///
    /// The walk starts from the top folder for every key; only the lookup
    /// cache is shared across keys. An unmanaged or filtered-out segment
    /// drops the key's remainder.
    async fn fold_key(
        &self,
        top: &mut TreeFolder,
        folder_key: &str,
        key: &str,
        options: &OpenOptions,
        cache: &mut LookupCache,
    ) -> Result<()> {
        let is_folder_key = key.ends_with(DELIMITER);
        let stem = key.strip_suffix(DELIMITER).unwrap_or(key);
        let Some(remainder) = stem.strip_prefix(folder_key) else {
            return Ok(());
        };
        let segments: Vec<&str> = remainder.split(DELIMITER).collect();
        if segments.iter().any(|s| s.is_empty()) {
            debug!("skipping malformed key {}", key);
            return Ok(());
        }
        // Keys deeper than the requested level count are not fetched at all.
        if segments.len() > options.max_levels as usize {
            return Ok(());
        }

        let mut chain = VecDeque::new();
        let mut partial = folder_key.to_string();
        for (i, segment) in segments.iter().enumerate() {
            if !options.filter.accepts(segment) {
                break;
            }
            let last = i + 1 == segments.len();
            let segment_key = if last && !is_folder_key {
                format!("{partial}{segment}")
            } else {
                format!("{partial}{segment}{DELIMITER}")
            };
            let Some(env) = self.cached_envelope(cache, &segment_key).await? else {
                // Unmanaged segment: the rest of the key is invisible.
                break;
            };
            chain.push_back(env.to_entry()?);
            partial.push_str(segment);
            partial.push(DELIMITER);
        }
        top.attach_chain(chain);
        Ok(())
    }

    /// Copy one backend object to a new key, re-pointing its envelope.
    async fn copy_object(
        &self,
        src_key: &str,
        dst_key: &str,
        mut env: Envelope,
        dst_path: &TreePathBuf,
    ) -> Result<()> {
        env.relocate(dst_path);
        let attrs = Self::envelope_attributes(&env)?;
        self.store
            .copy(&self.bucket, src_key, &self.bucket, dst_key, Some(attrs))
            .await
    }

    async fn copy_file_entry(
        &self,
        source: &TreePathBuf,
        env: Envelope,
        target: &TreePathBuf,
        options: CopyOptions,
    ) -> Result<()> {
        // A file lands inside an existing folder target under its own name.
        let dest = if self
            .load_envelope(&self.bucket, &target.folder_key())
            .await?
            .is_some()
        {
            target.join(source.name())?
        } else {
            target.clone()
        };
        if dest == *source {
            return Err(Error::PathExists(dest.to_string()));
        }
        if self
            .load_envelope(&self.bucket, &dest.folder_key())
            .await?
            .is_some()
        {
            return Err(Error::PathExists(dest.to_string()));
        }
        if !options.replace
            && self
                .load_envelope(&self.bucket, &dest.file_key())
                .await?
                .is_some()
        {
            return Err(Error::PathExists(dest.to_string()));
        }
        self.ensure_ancestors(&dest).await?;
        self.copy_object(&source.file_key(), &dest.file_key(), env, &dest)
            .await
    }

    async fn copy_folder_entry(
        &self,
        source: &TreePathBuf,
        env: Envelope,
        target: &TreePathBuf,
        options: CopyOptions,
    ) -> Result<()> {
        if self
            .load_envelope(&self.bucket, &target.file_key())
            .await?
            .is_some()
        {
            // A folder cannot become a file.
            return Err(Error::NotAFolder(target.to_string()));
        }
        if self
            .load_envelope(&self.bucket, &target.folder_key())
            .await?
            .is_none()
        {
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
        if options.into {
            self.copy_object(&source.folder_key(), &base.folder_key(), env, &base)
                .await?;
        }
        if !options.recursive {
            return Ok(());
        }

        let src_prefix = source.folder_key();
        let base_prefix = base.folder_key();
        let keys = self.store.list(&self.bucket, &src_prefix).await?;
        for key in keys {
            if key == src_prefix {
                continue;
            }
            let Some(remainder) = key.strip_prefix(&src_prefix) else {
                continue;
            };
            let Some(child_env) = self.load_envelope(&self.bucket, &key).await? else {
                debug!("skipping unmanaged object {} during copy", key);
                continue;
            };
            let dst_key = format!("{base_prefix}{remainder}");
            let (dst_path, folder_shaped) = parse_key(&dst_key)?;
            if !folder_shaped
                && !options.replace
                && self.load_envelope(&self.bucket, &dst_key).await?.is_some()
            {
                return Err(Error::PathExists(dst_path.to_string()));
            }
            self.copy_object(&key, &dst_key, child_env, &dst_path).await?;
        }
        Ok(())
    }

    /// Copy one key into the trash bucket, then delete the original.
    async fn relocate_to_trash(&self, key: &str) -> Result<()> {
        self.store
            .copy(&self.bucket, key, &self.trash_bucket, key, None)
            .await?;
        self.store.delete(&self.bucket, key).await
    }
}

#[async_trait]
impl StorageProvider for ObjectStoreProvider {
    async fn create_folder(
        &self,
        path: &TreePathBuf,
        description: Option<String>,
        metadata: Option<MetadataMap>,
    ) -> Result<TreeFolder> {
        if self
            .load_envelope(&self.bucket, &path.folder_key())
            .await?
            .is_some()
        {
            return Err(Error::FolderExists(path.to_string()));
        }
        if self
            .load_envelope(&self.bucket, &path.file_key())
            .await?
            .is_some()
        {
            return Err(Error::PathExists(path.to_string()));
        }
        self.ensure_ancestors(path).await?;
        let env = Envelope::folder(path, description, metadata);
        self.put_folder(path, &env).await?;
        env.to_folder()
    }

    async fn open_folder(&self, path: &TreePathBuf, options: OpenOptions) -> Result<TreeFolder> {
        let folder_key = path.folder_key();
        let Some(env) = self.load_envelope(&self.bucket, &folder_key).await? else {
            if self
                .load_envelope(&self.bucket, &path.file_key())
                .await?
                .is_some()
            {
                return Err(Error::NotAFolder(path.to_string()));
            }
            return Err(Error::NoSuchFolder(path.to_string()));
        };
        let mut top = env.to_folder()?;
        if options.max_levels == 0 {
            // Cheap path: one metadata fetch, no listing.
            return Ok(top);
        }

        top.mark_populated();
        let mut cache = LookupCache::new(LOOKUP_CACHE_CAPACITY);
        let keys = self.store.list(&self.bucket, &folder_key).await?;
        for key in keys {
            if key == folder_key {
                continue;
            }
            self.fold_key(&mut top, &folder_key, &key, &options, &mut cache)
                .await?;
        }
        Ok(top)
    }

    async fn create_file(
        &self,
        path: &TreePathBuf,
        content: &[u8],
        description: Option<String>,
        metadata: Option<MetadataMap>,
    ) -> Result<TreeFile> {
        if self
            .load_envelope(&self.bucket, &path.file_key())
            .await?
            .is_some()
        {
            return Err(Error::FileExists(path.to_string()));
        }
        if self
            .load_envelope(&self.bucket, &path.folder_key())
            .await?
            .is_some()
        {
            return Err(Error::PathExists(path.to_string()));
        }
        self.ensure_ancestors(path).await?;
        let env = Envelope::file(
            path,
            content.len() as i64,
            Some(sha256_hex(content)),
            ContentType::from_name(path.name()),
            description,
            metadata,
        );
        let attrs = Self::envelope_attributes(&env)?;
        self.store
            .put(&self.bucket, &path.file_key(), content, attrs)
            .await?;
        env.to_file()
    }

    async fn read(&self, path: &TreePathBuf) -> Result<Vec<u8>> {
        if self
            .load_envelope(&self.bucket, &path.file_key())
            .await?
            .is_none()
        {
            if self
                .load_envelope(&self.bucket, &path.folder_key())
                .await?
                .is_some()
            {
                return Err(Error::NotAFile(path.to_string()));
            }
            return Err(Error::NoSuchPath(path.to_string()));
        }
        self.store.get(&self.bucket, &path.file_key()).await
    }

    async fn read_metadata(&self, path: &TreePathBuf) -> Result<Option<MetadataMap>> {
        if let Some(env) = self.load_envelope(&self.bucket, &path.folder_key()).await? {
            return Ok(env.metadata);
        }
        if let Some(env) = self.load_envelope(&self.bucket, &path.file_key()).await? {
            return Ok(env.metadata);
        }
        Err(Error::NoSuchPath(path.to_string()))
    }

    async fn exists(&self, path: &TreePathBuf) -> Result<bool> {
        Ok(self.is_folder(path).await? || self.is_file(path).await?)
    }

    async fn is_folder(&self, path: &TreePathBuf) -> Result<bool> {
        Ok(self
            .load_envelope(&self.bucket, &path.folder_key())
            .await?
            .is_some())
    }

    async fn is_file(&self, path: &TreePathBuf) -> Result<bool> {
        Ok(self
            .load_envelope(&self.bucket, &path.file_key())
            .await?
            .is_some())
    }

    async fn is_empty(&self, path: &TreePathBuf) -> Result<bool> {
        let folder_key = path.folder_key();
        if self.load_envelope(&self.bucket, &folder_key).await?.is_none() {
            if self
                .load_envelope(&self.bucket, &path.file_key())
                .await?
                .is_some()
            {
                return Err(Error::NotAFolder(path.to_string()));
            }
            return Err(Error::NoSuchPath(path.to_string()));
        }
        let keys = self.store.list(&self.bucket, &folder_key).await?;
        Ok(keys.iter().all(|key| *key == folder_key))
    }

    async fn copy(
        &self,
        source: &TreePathBuf,
        target: &TreePathBuf,
        options: CopyOptions,
    ) -> Result<()> {
        if let Some(env) = self
            .load_envelope(&self.bucket, &source.folder_key())
            .await?
        {
            return self.copy_folder_entry(source, env, target, options).await;
        }
        if let Some(env) = self.load_envelope(&self.bucket, &source.file_key()).await? {
            return self.copy_file_entry(source, env, target, options).await;
        }
        Err(Error::NoSuchPath(source.to_string()))
    }

    async fn trash(&self, path: &TreePathBuf, force: bool) -> Result<()> {
        let folder_key = path.folder_key();
        if self.load_envelope(&self.bucket, &folder_key).await?.is_some() {
            if !force && !self.is_empty(path).await? {
                return Err(Error::FolderNotEmpty(path.to_string()));
            }
            let keys = self.store.list(&self.bucket, &folder_key).await?;
            for key in keys {
                if let Err(e) = self.relocate_to_trash(&key).await {
                    warn!("failed to trash object {}: {}", key, e);
                }
            }
            return Ok(());
        }
        if self
            .load_envelope(&self.bucket, &path.file_key())
            .await?
            .is_some()
        {
            return self.relocate_to_trash(&path.file_key()).await;
        }
        Err(Error::NoSuchPath(path.to_string()))
    }

    async fn delete(&self, path: &TreePathBuf) -> Result<()> {
        let folder_key = path.folder_key();
        if self
            .load_envelope(&self.trash_bucket, &folder_key)
            .await?
            .is_some()
        {
            let keys = self.store.list(&self.trash_bucket, &folder_key).await?;
            for key in keys {
                if let Err(e) = self.store.delete(&self.trash_bucket, &key).await {
                    warn!("failed to delete trashed object {}: {}", key, e);
                }
            }
            return Ok(());
        }
        if self
            .load_envelope(&self.trash_bucket, &path.file_key())
            .await?
            .is_some()
        {
            return self.store.delete(&self.trash_bucket, &path.file_key()).await;
        }
        Err(Error::NoSuchPath(path.to_string()))
    }
}

fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let result = Sha256::digest(data);
    result.iter().map(|b| format!("{:02x}", b)).collect()
}
