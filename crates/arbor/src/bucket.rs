//! Flat object-store backend trait and in-memory implementation.
//!
//! The trait is the raw client boundary of the object-store provider: get
//! object metadata by key, list all keys under a prefix, put/copy/delete by
//! key. There is no "list immediate children" - directories do not exist at
//! this layer, only keys. Real deployments hand the provider an S3-style
//! client wrapped in this trait; [`MemoryBucket`] backs tests and embedders.

// RwLock.read()/write().unwrap() only panics on lock poisoning (prior panic
// while holding lock). This is intentional - corrupted state should not propagate.
#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result};

/// User-metadata attributes attached to an object.
pub type Attributes = HashMap<String, String>;

/// Object descriptor returned by [`ObjectStore::head`].
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// The object's key.
    pub key: String,
    /// Body length in bytes.
    pub size: u64,
    /// User-metadata attributes.
    pub attributes: Attributes,
}

/// Raw flat key/value storage addressed by `(bucket, key)`.
///
/// # Contract
///
/// Implementations store bytes plus a user-metadata attribute map per key
/// and answer unordered prefix listings. They do NOT interpret delimiters,
/// enforce tree semantics, or guarantee anything across keys - per-key
/// atomicity only.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` for concurrent access.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's descriptor without its body.
    ///
    /// Returns `Ok(None)` when the key is absent.
    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectInfo>>;

    /// Read an object's body.
    ///
    /// # Errors
    /// - `Backend` when the key is absent
    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Write an object, overwriting any existing object at the key.
    async fn put(&self, bucket: &str, key: &str, body: &[u8], attributes: Attributes)
    -> Result<()>;

    /// Server-side copy, possibly across buckets.
    ///
    /// `attributes` of `Some` replaces the stored attribute map on the
    /// destination; `None` preserves the source's attributes.
    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
        attributes: Option<Attributes>,
    ) -> Result<()>;

    /// List every key under the prefix, in no particular order.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Delete an object. Deleting an absent key is not an error.
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;
}

/// In-memory object store.
///
/// Stores all objects in a `HashMap` keyed by `(bucket, key)`. Listing
/// returns keys in hash order, matching the "unordered" listing contract of
/// real buckets - consumers must not rely on ordering.
#[derive(Default)]
pub struct MemoryBucket {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    attributes: Attributes,
}

impl MemoryBucket {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects held across all buckets.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryBucket {
    async fn head(&self, bucket: &str, key: &str) -> Result<Option<ObjectInfo>> {
        let objects = self.objects.read().unwrap();
        Ok(objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|obj| ObjectInfo {
                key: key.to_string(),
                size: obj.body.len() as u64,
                attributes: obj.attributes.clone(),
            }))
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let objects = self.objects.read().unwrap();
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|obj| obj.body.clone())
            .ok_or_else(|| Error::Backend(format!("no such object: {bucket}/{key}")))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        attributes: Attributes,
    ) -> Result<()> {
        let mut objects = self.objects.write().unwrap();
        objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.to_vec(),
                attributes,
            },
        );
        Ok(())
    }

    async fn copy(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
        attributes: Option<Attributes>,
    ) -> Result<()> {
        let mut objects = self.objects.write().unwrap();
        let mut obj = objects
            .get(&(src_bucket.to_string(), src_key.to_string()))
            .cloned()
            .ok_or_else(|| Error::Backend(format!("no such object: {src_bucket}/{src_key}")))?;
        if let Some(attributes) = attributes {
            obj.attributes = attributes;
        }
        objects.insert((dst_bucket.to_string(), dst_key.to_string()), obj);
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.read().unwrap();
        Ok(objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let mut objects = self.objects.write().unwrap();
        objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}
