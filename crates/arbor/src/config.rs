//! Provider wiring configuration.
//!
//! Which concrete provider backs a logical client - and with which bucket
//! or mount root - is an external concern. This module holds the
//! serde-deserializable wiring shape; credentials and endpoint setup for a
//! real bucket client stay with the embedder, which hands the provider an
//! `Arc<dyn ObjectStore>`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::bucket::ObjectStore;
use crate::error::{Error, Result};
use crate::local::FilesystemProvider;
use crate::object::ObjectStoreProvider;

/// Backend selection and parameters for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Flat bucket backend. The trash bucket defaults to the live bucket
    /// name with the fixed suffix appended.
    ObjectStore {
        /// Live bucket name.
        bucket: String,
        /// Trash bucket override.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trash_bucket: Option<String>,
    },
    /// Local directory backend. The trash root defaults to the live root
    /// with the fixed suffix appended.
    Filesystem {
        /// Live root directory.
        root: PathBuf,
        /// Trash root override.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trash_root: Option<PathBuf>,
    },
}

impl ProviderConfig {
    /// Object-store wiring with the default trash bucket.
    pub fn object_store(bucket: impl Into<String>) -> Self {
        Self::ObjectStore {
            bucket: bucket.into(),
            trash_bucket: None,
        }
    }

    /// Filesystem wiring with the default trash root.
    pub fn filesystem(root: impl Into<PathBuf>) -> Self {
        Self::Filesystem {
            root: root.into(),
            trash_root: None,
        }
    }

    /// Build the filesystem provider this configuration describes.
    ///
    /// # Errors
    /// - `Config` when the configuration describes an object-store backend
    pub fn build_filesystem(&self) -> Result<FilesystemProvider> {
        match self {
            Self::Filesystem { root, trash_root } => {
                let provider = FilesystemProvider::new(root.clone());
                Ok(match trash_root {
                    Some(trash_root) => provider.with_trash_root(trash_root.clone()),
                    None => provider,
                })
            }
            Self::ObjectStore { .. } => Err(Error::Config(
                "configuration describes an object-store backend".to_string(),
            )),
        }
    }

    /// Build the object-store provider this configuration describes over
    /// the given backend client.
    ///
    /// # Errors
    /// - `Config` when the configuration describes a filesystem backend
    pub fn build_object_store(&self, store: Arc<dyn ObjectStore>) -> Result<ObjectStoreProvider> {
        match self {
            Self::ObjectStore {
                bucket,
                trash_bucket,
            } => {
                let provider = ObjectStoreProvider::new(store, bucket.clone());
                Ok(match trash_bucket {
                    Some(trash_bucket) => provider.with_trash_bucket(trash_bucket.clone()),
                    None => provider,
                })
            }
            Self::Filesystem { .. } => Err(Error::Config(
                "configuration describes a filesystem backend".to_string(),
            )),
        }
    }
}
