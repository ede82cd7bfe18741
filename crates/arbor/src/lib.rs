//! Arbor - Virtual folder tree over flat object stores and local disks
//!
//! Part of the Everruns ecosystem.
//!
//! Arbor gives clients folder/file semantics - existence, emptiness,
//! containment, depth-limited listing, copy/move/trash/delete - over
//! backends that have no directory concept of their own. One contract
//! ([`StorageProvider`]), two implementations: [`ObjectStoreProvider`]
//! reconstructs trees from a flat prefix-listable key space, and
//! [`FilesystemProvider`] emulates the same contract with side-car metadata
//! files on a local directory tree.
//!
//! # Example
//!
//! ```rust
//! use arbor::{MemoryBucket, ObjectStoreProvider, OpenOptions, StorageProvider, TreePathBuf};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> arbor::Result<()> {
//!     let provider = ObjectStoreProvider::new(Arc::new(MemoryBucket::new()), "tenant");
//!
//!     let reports = TreePathBuf::new("reports/2024")?;
//!     provider.create_folder(&reports, Some("quarterlies".into()), None).await?;
//!     provider
//!         .create_file(&TreePathBuf::new("reports/2024/q3.txt")?, b"totals", None, None)
//!         .await?;
//!
//!     let tree = provider
//!         .open_folder(&TreePathBuf::new("reports")?, OpenOptions::new().max_levels(2))
//!         .await?;
//!     assert!(tree.has_items());
//!     Ok(())
//! }
//! ```

mod bucket;
mod config;
mod entry;
mod envelope;
mod error;
mod filter;
mod local;
mod object;
mod path;
mod provider;

pub use bucket::{Attributes, MemoryBucket, ObjectInfo, ObjectStore};
pub use config::ProviderConfig;
pub use entry::{ContentType, EntryInfo, MetadataMap, TreeEntry, TreeFile, TreeFolder};
pub use envelope::{Envelope, EntryKind, ENVELOPE_ATTRIBUTE};
pub use error::{Error, Result};
pub use filter::EntryFilter;
pub use local::{FilesystemProvider, TRASH_ROOT_SUFFIX};
pub use object::{ObjectStoreProvider, TRASH_BUCKET_SUFFIX};
pub use path::{parse_key, TreePathBuf, DELIMITER};
pub use provider::{CopyOptions, OpenOptions, StorageProvider};

// Re-exported so implementers of custom [`ObjectStore`] backends don't need
// a direct async-trait dependency.
pub use async_trait::async_trait;
