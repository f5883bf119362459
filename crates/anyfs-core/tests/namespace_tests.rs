//! Namespace tests: path resolution, linking, deletion and rename.

mod common;

use anyfs_core::{EntryKind, FsError, Node};
use common::{create_test_fs, test_content};

#[tokio::test]
async fn test_create_and_resolve_paths() {
    let (fs, _) = create_test_fs().await;
    let root = fs.root().await.unwrap();

    let a = root.create_folder("a").await.unwrap();
    let file = a.create_file("b.txt").await.unwrap();

    let direct = fs.at_path("/a/b.txt").await.unwrap().unwrap();
    assert_eq!(direct.id(), file.id());
    assert_eq!(direct.absolute_path(), "/a/b.txt");
    assert_eq!(direct.as_file().unwrap().name(), "b.txt");
    assert!(direct.as_folder().is_none());

    let folder = fs.at_path("/a").await.unwrap().unwrap();
    assert_eq!(folder.as_folder().unwrap().id(), a.id());
    assert!(folder.as_file().is_none());

    let roundabout = fs.at_path("/a/../a/b.txt").await.unwrap().unwrap();
    assert_eq!(roundabout.id(), file.id());

    let dotted = root.at_path("./a//./b.txt/").await.unwrap().unwrap();
    assert_eq!(dotted.id(), file.id());

    assert!(fs.at_path("/a/missing").await.unwrap().is_none());
    assert!(matches!(fs.at_path("/").await.unwrap(), Some(Node::Folder(_))));
}

#[tokio::test]
async fn test_list_contents_preserves_order() {
    let (fs, _) = create_test_fs().await;
    let root = fs.root().await.unwrap();
    root.create_file("z").await.unwrap();
    root.create_folder("a").await.unwrap();
    root.create_file("m").await.unwrap();

    let entries = root.list_contents().await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["z", "a", "m"]);
    assert_eq!(entries[1].kind, EntryKind::Folder);
}

#[tokio::test]
async fn test_delete_non_empty_folder_requires_force() {
    let (fs, provider) = create_test_fs().await;
    let root = fs.root().await.unwrap();
    let dir = root.create_folder("dir").await.unwrap();
    let child = dir.create_file("child").await.unwrap();
    child.write_all(&test_content(20)).await.unwrap();

    assert!(matches!(
        root.delete_entry("dir", false).await,
        Err(FsError::DirectoryNotEmpty { .. })
    ));
    assert!(root.exists("dir").await.unwrap());

    root.delete_entry("dir", true).await.unwrap();
    assert!(!root.exists("dir").await.unwrap());
    // Forced removal only drops the entry
    assert!(provider.contains(dir.id()).await);
    assert!(provider.contains(child.id()).await);
}

#[tokio::test]
async fn test_delete_file_reclaims_storage() {
    let (fs, provider) = create_test_fs().await;
    let root = fs.root().await.unwrap();
    let baseline = provider.len().await;

    let file = root.create_file("f").await.unwrap();
    file.write_all(&test_content(30)).await.unwrap();
    assert!(provider.len().await > baseline);

    root.delete_entry("f", false).await.unwrap();
    assert_eq!(provider.len().await, baseline);
    assert!(matches!(
        root.delete_entry("f", false).await,
        Err(FsError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_delete_empty_folder() {
    let (fs, provider) = create_test_fs().await;
    let root = fs.root().await.unwrap();
    let dir = root.create_folder("empty").await.unwrap();
    root.delete_entry("empty", false).await.unwrap();
    assert!(!provider.contains(dir.id()).await);
}

#[tokio::test]
async fn test_link_force_semantics() {
    let (fs, _) = create_test_fs().await;
    let root = fs.root().await.unwrap();
    let folder = root.create_folder("folder").await.unwrap();
    let old = root.create_file("old").await.unwrap();
    let new = root.create_file("new").await.unwrap();
    new.write_all(b"new content").await.unwrap();

    assert!(matches!(
        root.link("old", EntryKind::File, new.id().clone(), false).await,
        Err(FsError::AlreadyExists { .. })
    ));
    assert!(matches!(
        root.link("folder", EntryKind::File, new.id().clone(), true).await,
        Err(FsError::IsADirectory { .. })
    ));
    assert!(root.get("folder").await.unwrap().unwrap().is_folder());
    assert_eq!(
        root.get("folder").await.unwrap().unwrap().id(),
        folder.id()
    );

    root.link("old", EntryKind::File, new.id().clone(), true)
        .await
        .unwrap();
    let relinked = root.get("old").await.unwrap().unwrap();
    assert_eq!(relinked.id(), new.id());
    assert_ne!(relinked.id(), old.id());
    assert_eq!(
        relinked.into_file().unwrap().read_all().await.unwrap(),
        b"new content"
    );
}

#[tokio::test]
async fn test_link_rejects_invalid_names() {
    let (fs, _) = create_test_fs().await;
    let root = fs.root().await.unwrap();
    let file = root.create_file("f").await.unwrap();
    for name in [".", "..", "a/b"] {
        assert!(matches!(
            root.link(name, EntryKind::File, file.id().clone(), true).await,
            Err(FsError::InvalidName { .. })
        ));
    }
}

#[tokio::test]
async fn test_rename_within_and_across_folders() {
    let (fs, _) = create_test_fs().await;
    let root = fs.root().await.unwrap();
    let src = root.create_folder("src").await.unwrap();
    root.create_folder("dst").await.unwrap();
    let file = src.create_file("a.txt").await.unwrap();
    file.write_all(b"payload").await.unwrap();

    fs.rename("/src/a.txt", "/src/b.txt").await.unwrap();
    assert!(fs.at_path("/src/a.txt").await.unwrap().is_none());
    let moved = fs.at_path("/src/b.txt").await.unwrap().unwrap();
    assert_eq!(moved.id(), file.id());

    fs.rename("/src/b.txt", "/dst/c.txt").await.unwrap();
    let moved = fs.at_path("/dst/c.txt").await.unwrap().unwrap();
    assert_eq!(moved.id(), file.id());
    assert_eq!(
        moved.into_file().unwrap().read_all().await.unwrap(),
        b"payload"
    );
    assert!(src.list_contents().await.unwrap().is_empty());
    assert!(fs.scheduler_snapshot().is_idle());
}

#[tokio::test]
async fn test_rename_onto_itself_is_noop() {
    let (fs, _) = create_test_fs().await;
    let root = fs.root().await.unwrap();
    let file = root.create_file("same").await.unwrap();
    fs.rename("/same", "/same").await.unwrap();
    assert_eq!(fs.at_path("/same").await.unwrap().unwrap().id(), file.id());
}

#[tokio::test]
async fn test_rename_errors() {
    let (fs, _) = create_test_fs().await;
    let root = fs.root().await.unwrap();
    let outer = root.create_folder("outer").await.unwrap();
    outer.create_folder("inner").await.unwrap();
    root.create_folder("taken").await.unwrap();
    root.create_file("f").await.unwrap();

    assert!(matches!(
        fs.rename("/missing", "/x").await,
        Err(FsError::NotFound { .. })
    ));
    assert!(matches!(
        fs.rename("/f", "/taken").await,
        Err(FsError::IsADirectory { .. })
    ));
    assert!(matches!(
        fs.rename("/outer", "/outer/inner/outer").await,
        Err(FsError::InvalidName { .. })
    ));
    assert!(matches!(
        fs.rename("/f", "/nowhere/f").await,
        Err(FsError::NotFound { .. })
    ));
    // Nothing moved
    assert!(root.exists("f").await.unwrap());
    assert!(root.exists("outer").await.unwrap());
}

#[tokio::test]
async fn test_rename_folder_keeps_descendants() {
    let (fs, _) = create_test_fs().await;
    let root = fs.root().await.unwrap();
    let a = root.create_folder("a").await.unwrap();
    let deep = a.create_file("deep.txt").await.unwrap();

    fs.rename("/a", "/renamed").await.unwrap();
    let found = fs.at_path("/renamed/deep.txt").await.unwrap().unwrap();
    assert_eq!(found.id(), deep.id());
    assert_eq!(found.absolute_path(), "/renamed/deep.txt");
}
