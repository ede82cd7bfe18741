//! Contract tests run against both storage providers.
//!
//! Every test drives the public `StorageProvider` surface only, so the same
//! body exercises the object-store provider (in-memory bucket) and the
//! filesystem provider (temporary directory roots).

use arbor::{
    CopyOptions, EntryFilter, Error, FilesystemProvider, MemoryBucket, ObjectStoreProvider,
    OpenOptions, StorageProvider, TreePathBuf,
};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

fn p(s: &str) -> TreePathBuf {
    TreePathBuf::new(s).unwrap()
}

/// One provider under test, with whatever scratch state keeps it alive.
struct Fixture {
    label: &'static str,
    provider: Box<dyn StorageProvider>,
    _tmp: Option<TempDir>,
}

fn fixtures() -> Vec<Fixture> {
    let object = Fixture {
        label: "object-store",
        provider: Box::new(ObjectStoreProvider::new(
            Arc::new(MemoryBucket::new()),
            "tenant",
        )),
        _tmp: None,
    };
    let tmp = TempDir::new().unwrap();
    let filesystem = Fixture {
        label: "filesystem",
        provider: Box::new(FilesystemProvider::new(tmp.path().join("live"))),
        _tmp: Some(tmp),
    };
    vec![object, filesystem]
}

#[tokio::test]
async fn ancestor_creation_is_idempotent() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        let meta = HashMap::from([("owner".to_string(), "ops".to_string())]);
        provider
            .create_folder(&p("a"), Some("top".to_string()), Some(meta.clone()))
            .await
            .unwrap();
        provider.create_folder(&p("a/b"), None, None).await.unwrap();
        let before = provider
            .open_folder(&p("a"), OpenOptions::new())
            .await
            .unwrap();

        provider.create_folder(&p("a/b/c"), None, None).await.unwrap();

        let after = provider
            .open_folder(&p("a"), OpenOptions::new())
            .await
            .unwrap();
        assert_eq!(
            provider.read_metadata(&p("a")).await.unwrap(),
            Some(meta),
            "{}",
            fx.label
        );
        assert_eq!(before.info.modified, after.info.modified, "{}", fx.label);
        assert!(provider.is_folder(&p("a/b/c")).await.unwrap(), "{}", fx.label);
    }
}

#[tokio::test]
async fn create_folder_collisions_are_typed() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        provider.create_folder(&p("docs"), None, None).await.unwrap();
        assert!(
            matches!(
                provider.create_folder(&p("docs"), None, None).await,
                Err(Error::FolderExists(_))
            ),
            "{}",
            fx.label
        );

        provider
            .create_file(&p("notes.txt"), b"n", None, None)
            .await
            .unwrap();
        assert!(
            matches!(
                provider.create_file(&p("notes.txt"), b"n", None, None).await,
                Err(Error::FileExists(_))
            ),
            "{}",
            fx.label
        );
    }
}

#[tokio::test]
async fn depth_boundary_is_a_hard_fetch_bound() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        provider
            .create_file(&p("root/x/y/z.txt"), b"deep", None, None)
            .await
            .unwrap();

        let level1 = provider
            .open_folder(&p("root"), OpenOptions::new().max_levels(1))
            .await
            .unwrap();
        let x = level1.items().unwrap()[0].as_folder().unwrap();
        assert_eq!(x.info.name, "x", "{}", fx.label);
        assert!(x.items().is_none(), "{}", fx.label);

        let level2 = provider
            .open_folder(&p("root"), OpenOptions::new().max_levels(2))
            .await
            .unwrap();
        let x = level2.items().unwrap()[0].as_folder().unwrap();
        let y = x.items().unwrap()[0].as_folder().unwrap();
        assert_eq!(y.info.name, "y", "{}", fx.label);
        assert!(y.items().is_none(), "{}", fx.label);

        let level3 = provider
            .open_folder(&p("root"), OpenOptions::new().max_levels(3))
            .await
            .unwrap();
        let x = level3.items().unwrap()[0].as_folder().unwrap();
        let y = x.items().unwrap()[0].as_folder().unwrap();
        assert_eq!(y.items().unwrap()[0].name(), "z.txt", "{}", fx.label);
    }
}

#[tokio::test]
async fn unpopulated_is_distinct_from_confirmed_empty() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        provider.create_folder(&p("hollow"), None, None).await.unwrap();

        let bare = provider
            .open_folder(&p("hollow"), OpenOptions::new())
            .await
            .unwrap();
        assert!(bare.items().is_none(), "{}", fx.label);

        let opened = provider
            .open_folder(&p("hollow"), OpenOptions::new().max_levels(1))
            .await
            .unwrap();
        assert_eq!(opened.items().unwrap().len(), 0, "{}", fx.label);
        assert!(!opened.has_items(), "{}", fx.label);
    }
}

#[tokio::test]
async fn sibling_entries_share_one_parent_folder() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        provider
            .create_file(&p("root/report/x.txt"), b"x", None, None)
            .await
            .unwrap();
        provider
            .create_file(&p("root/report/y.txt"), b"y", None, None)
            .await
            .unwrap();

        let root = provider
            .open_folder(&p("root"), OpenOptions::new().max_levels(2))
            .await
            .unwrap();
        let items = root.items().unwrap();
        assert_eq!(items.len(), 1, "{}", fx.label);
        assert_eq!(items[0].name(), "report", "{}", fx.label);
        assert_eq!(
            items[0].as_folder().unwrap().items().unwrap().len(),
            2,
            "{}",
            fx.label
        );
    }
}

#[tokio::test]
async fn glob_filter_prunes_listings() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        provider
            .create_file(&p("docs/a.txt"), b"a", None, None)
            .await
            .unwrap();
        provider
            .create_file(&p("docs/b.md"), b"b", None, None)
            .await
            .unwrap();

        let folder = provider
            .open_folder(
                &p("docs"),
                OpenOptions::new()
                    .max_levels(1)
                    .filter(EntryFilter::glob("*.txt").unwrap()),
            )
            .await
            .unwrap();
        let names: Vec<&str> = folder.items().unwrap().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a.txt"], "{}", fx.label);
    }
}

#[tokio::test]
async fn probes_never_fail_for_absent_paths() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        assert!(!provider.exists(&p("nowhere")).await.unwrap(), "{}", fx.label);
        assert!(!provider.is_folder(&p("nowhere")).await.unwrap(), "{}", fx.label);
        assert!(!provider.is_file(&p("nowhere")).await.unwrap(), "{}", fx.label);
    }
}

#[tokio::test]
async fn is_empty_checks_shape_and_children() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        provider.create_folder(&p("docs"), None, None).await.unwrap();
        assert!(provider.is_empty(&p("docs")).await.unwrap(), "{}", fx.label);

        provider
            .create_file(&p("docs/a.txt"), b"a", None, None)
            .await
            .unwrap();
        assert!(!provider.is_empty(&p("docs")).await.unwrap(), "{}", fx.label);

        assert!(
            matches!(
                provider.is_empty(&p("docs/a.txt")).await,
                Err(Error::NotAFolder(_))
            ),
            "{}",
            fx.label
        );
        assert!(
            matches!(provider.is_empty(&p("gone")).await, Err(Error::NoSuchPath(_))),
            "{}",
            fx.label
        );
    }
}

#[tokio::test]
async fn trash_guard_requires_force_for_non_empty_folders() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        provider
            .create_file(&p("docs/a.txt"), b"a", None, None)
            .await
            .unwrap();

        assert!(
            matches!(
                provider.trash(&p("docs"), false).await,
                Err(Error::FolderNotEmpty(_))
            ),
            "{}",
            fx.label
        );
        assert!(provider.exists(&p("docs")).await.unwrap(), "{}", fx.label);

        provider.trash(&p("docs"), true).await.unwrap();
        assert!(!provider.exists(&p("docs")).await.unwrap(), "{}", fx.label);
        assert!(!provider.exists(&p("docs/a.txt")).await.unwrap(), "{}", fx.label);
    }
}

#[tokio::test]
async fn trash_if_exists_converts_absent_into_noop() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        assert!(
            !provider.trash_if_exists(&p("ghost"), false).await.unwrap(),
            "{}",
            fx.label
        );

        provider
            .create_file(&p("real.txt"), b"r", None, None)
            .await
            .unwrap();
        assert!(
            provider.trash_if_exists(&p("real.txt"), false).await.unwrap(),
            "{}",
            fx.label
        );
        assert!(!provider.exists(&p("real.txt")).await.unwrap(), "{}", fx.label);
    }
}

#[tokio::test]
async fn trash_then_delete_leaves_no_trace() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        provider
            .create_file(&p("docs/a.txt"), b"a", None, None)
            .await
            .unwrap();

        provider.trash(&p("docs"), true).await.unwrap();
        provider.delete(&p("docs")).await.unwrap();

        assert!(!provider.exists(&p("docs")).await.unwrap(), "{}", fx.label);
        assert!(
            matches!(provider.delete(&p("docs")).await, Err(Error::NoSuchPath(_))),
            "{}",
            fx.label
        );
    }
}

#[tokio::test]
async fn delete_requires_prior_trash() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        provider
            .create_file(&p("live.txt"), b"l", None, None)
            .await
            .unwrap();

        assert!(
            matches!(provider.delete(&p("live.txt")).await, Err(Error::NoSuchPath(_))),
            "{}",
            fx.label
        );
        // The live entry is untouched by the failed delete.
        assert!(provider.exists(&p("live.txt")).await.unwrap(), "{}", fx.label);
        assert!(
            !provider.delete_if_exists(&p("live.txt")).await.unwrap(),
            "{}",
            fx.label
        );
    }
}

async fn seed_source_folder(provider: &dyn StorageProvider) {
    provider
        .create_file(&p("src/a.txt"), b"alpha", None, None)
        .await
        .unwrap();
    provider
        .create_file(&p("src/sub/b.txt"), b"beta", None, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn copy_folder_into_existing_target_nests_under_source_name() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        seed_source_folder(provider).await;
        provider.create_folder(&p("dst"), None, None).await.unwrap();

        provider
            .copy(
                &p("src"),
                &p("dst"),
                CopyOptions::new().recursive(true).into_target(true),
            )
            .await
            .unwrap();

        assert_eq!(
            provider.read(&p("dst/src/a.txt")).await.unwrap(),
            b"alpha",
            "{}",
            fx.label
        );
        assert_eq!(
            provider.read(&p("dst/src/sub/b.txt")).await.unwrap(),
            b"beta",
            "{}",
            fx.label
        );
        // The source is untouched.
        assert_eq!(provider.read(&p("src/a.txt")).await.unwrap(), b"alpha", "{}", fx.label);
    }
}

#[tokio::test]
async fn copy_folder_content_mode_flattens_into_target() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        seed_source_folder(provider).await;
        provider.create_folder(&p("dst"), None, None).await.unwrap();

        provider
            .copy(&p("src"), &p("dst"), CopyOptions::new().recursive(true))
            .await
            .unwrap();

        assert_eq!(provider.read(&p("dst/a.txt")).await.unwrap(), b"alpha", "{}", fx.label);
        assert_eq!(
            provider.read(&p("dst/sub/b.txt")).await.unwrap(),
            b"beta",
            "{}",
            fx.label
        );
        // No extra nesting level.
        assert!(!provider.is_folder(&p("dst/src")).await.unwrap(), "{}", fx.label);
    }
}

#[tokio::test]
async fn copy_folder_to_missing_target_creates_it_first() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        seed_source_folder(provider).await;

        provider
            .copy(&p("src"), &p("fresh"), CopyOptions::new().recursive(true))
            .await
            .unwrap();

        assert!(provider.is_folder(&p("fresh")).await.unwrap(), "{}", fx.label);
        assert_eq!(provider.read(&p("fresh/a.txt")).await.unwrap(), b"alpha", "{}", fx.label);
    }
}

#[tokio::test]
async fn copy_file_into_folder_keeps_its_name() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        seed_source_folder(provider).await;
        provider.create_folder(&p("dst"), None, None).await.unwrap();

        provider
            .copy(&p("src/a.txt"), &p("dst"), CopyOptions::new())
            .await
            .unwrap();
        assert_eq!(provider.read(&p("dst/a.txt")).await.unwrap(), b"alpha", "{}", fx.label);

        // A second copy collides unless replacement is requested.
        assert!(
            matches!(
                provider.copy(&p("src/a.txt"), &p("dst"), CopyOptions::new()).await,
                Err(Error::PathExists(_))
            ),
            "{}",
            fx.label
        );
        provider
            .copy(&p("src/a.txt"), &p("dst"), CopyOptions::new().replace(true))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn copy_file_to_file_shaped_path_renames() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        seed_source_folder(provider).await;

        provider
            .copy(&p("src/a.txt"), &p("src/renamed.txt"), CopyOptions::new())
            .await
            .unwrap();

        assert_eq!(
            provider.read(&p("src/renamed.txt")).await.unwrap(),
            b"alpha",
            "{}",
            fx.label
        );
        let folder = provider
            .open_folder(&p("src"), OpenOptions::new().max_levels(1))
            .await
            .unwrap();
        let renamed = folder
            .items()
            .unwrap()
            .iter()
            .find(|e| e.name() == "renamed.txt")
            .unwrap();
        assert_eq!(renamed.path().as_str(), "src/renamed.txt", "{}", fx.label);
    }
}

#[tokio::test]
async fn copy_folder_onto_file_fails() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        seed_source_folder(provider).await;
        provider
            .create_file(&p("plain.txt"), b"p", None, None)
            .await
            .unwrap();

        assert!(
            matches!(
                provider
                    .copy(&p("src"), &p("plain.txt"), CopyOptions::new().recursive(true))
                    .await,
                Err(Error::NotAFolder(_))
            ),
            "{}",
            fx.label
        );
    }
}

#[tokio::test]
async fn self_copy_is_rejected() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        seed_source_folder(provider).await;

        assert!(
            matches!(
                provider
                    .copy(&p("src/a.txt"), &p("src/a.txt"), CopyOptions::new())
                    .await,
                Err(Error::PathExists(_))
            ),
            "{}",
            fx.label
        );
        // Copying a file into its own parent folder resolves to itself.
        assert!(
            matches!(
                provider.copy(&p("src/a.txt"), &p("src"), CopyOptions::new()).await,
                Err(Error::PathExists(_))
            ),
            "{}",
            fx.label
        );
    }
}

#[tokio::test]
async fn move_removes_source_and_preserves_content() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        provider
            .create_file(&p("m/a.txt"), b"payload", None, None)
            .await
            .unwrap();

        provider
            .move_entry(&p("m/a.txt"), &p("n/b.txt"), CopyOptions::new())
            .await
            .unwrap();

        assert!(!provider.exists(&p("m/a.txt")).await.unwrap(), "{}", fx.label);
        assert_eq!(provider.read(&p("n/b.txt")).await.unwrap(), b"payload", "{}", fx.label);
    }
}

#[tokio::test]
async fn failed_move_leaves_source_untouched() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        provider
            .create_file(&p("m/a.txt"), b"original", None, None)
            .await
            .unwrap();
        provider
            .create_file(&p("n/b.txt"), b"occupied", None, None)
            .await
            .unwrap();

        assert!(
            matches!(
                provider
                    .move_entry(&p("m/a.txt"), &p("n/b.txt"), CopyOptions::new())
                    .await,
                Err(Error::PathExists(_))
            ),
            "{}",
            fx.label
        );
        assert_eq!(provider.read(&p("m/a.txt")).await.unwrap(), b"original", "{}", fx.label);
        assert_eq!(provider.read(&p("n/b.txt")).await.unwrap(), b"occupied", "{}", fx.label);
    }
}

#[tokio::test]
async fn read_metadata_returns_caller_map_or_none() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        let meta = HashMap::from([("label".to_string(), "q3".to_string())]);
        provider
            .create_file(&p("docs/a.txt"), b"a", None, Some(meta.clone()))
            .await
            .unwrap();
        provider.create_folder(&p("plain"), None, None).await.unwrap();

        assert_eq!(
            provider.read_metadata(&p("docs/a.txt")).await.unwrap(),
            Some(meta),
            "{}",
            fx.label
        );
        assert_eq!(provider.read_metadata(&p("plain")).await.unwrap(), None, "{}", fx.label);
        assert!(
            matches!(
                provider.read_metadata(&p("ghost")).await,
                Err(Error::NoSuchPath(_))
            ),
            "{}",
            fx.label
        );
    }
}

#[tokio::test]
async fn open_folder_failures_are_typed() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        provider
            .create_file(&p("docs/a.txt"), b"a", None, None)
            .await
            .unwrap();

        assert!(
            matches!(
                provider.open_folder(&p("missing"), OpenOptions::new()).await,
                Err(Error::NoSuchFolder(_))
            ),
            "{}",
            fx.label
        );
        assert!(
            matches!(
                provider.open_folder(&p("docs/a.txt"), OpenOptions::new()).await,
                Err(Error::NotAFolder(_))
            ),
            "{}",
            fx.label
        );
    }
}

#[tokio::test]
async fn read_failures_are_typed() {
    for fx in fixtures() {
        let provider = fx.provider.as_ref();
        provider.create_folder(&p("docs"), None, None).await.unwrap();

        assert!(
            matches!(provider.read(&p("ghost.txt")).await, Err(Error::NoSuchPath(_))),
            "{}",
            fx.label
        );
        assert!(
            matches!(provider.read(&p("docs")).await, Err(Error::NotAFile(_))),
            "{}",
            fx.label
        );
    }
}
