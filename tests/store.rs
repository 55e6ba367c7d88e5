//! Cross-invocation persistence of the state store.
//!
//! Each CLI invocation builds a fresh `FileStore`; records written by one
//! invocation must be visible to the next one, and the commit-range record
//! must survive exactly one take.

use std::path::Path;

use gitpr::store::FileStore;
use gitpr::store::StateStore as _;

#[tokio::test]
async fn commit_range_survives_a_process_boundary() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let root = temp_dir.path().join("state");

    // First invocation: update records the range
    {
        let store = FileStore::new(root.clone());
        store.put_commit_range(42, "abc1234567..def7654321").await?;
    }

    // Second invocation: close consumes it
    let store = FileStore::new(root.clone());
    let range = store.take_commit_range(42).await?;
    assert_eq!(range.as_deref(), Some("abc1234567..def7654321"));

    // Third invocation: nothing left to consume
    let store = FileStore::new(root);
    assert_eq!(store.take_commit_range(42).await?, None);

    Ok(())
}

#[tokio::test]
async fn original_dir_survives_a_process_boundary() -> anyhow::Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let root = temp_dir.path().join("state");

    {
        let store = FileStore::new(root.clone());
        store
            .put_original_dir(Path::new("/home/dev/project"))
            .await?;
    }

    let store = FileStore::new(root);
    assert_eq!(
        store.get_original_dir().await?.as_deref(),
        Some(Path::new("/home/dev/project"))
    );

    Ok(())
}
