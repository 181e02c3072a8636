use mediagate_core::{MediaId, MediaItemUpdate, NewMediaItem};

use crate::error::RepositoryError;
use crate::repository::MediaRepository;

fn new_item(name: &str) -> NewMediaItem {
    NewMediaItem {
        path: format!("uploads/{name}.pdf"),
        disk: "local".into(),
        filename: name.into(),
        formatted_filename: format!("{name}.pdf"),
        extension: "pdf".into(),
        mime_type: Some("application/pdf".into()),
        size: 1024,
    }
}

/// Run the repository conformance test suite.
///
/// Call this from your backend's test module with a fresh repository.
///
/// # Errors
///
/// Returns an error if the backend fails an operation that should succeed.
pub async fn run_repository_conformance_tests(
    repo: &dyn MediaRepository,
) -> Result<(), RepositoryError> {
    test_find_missing(repo).await?;
    test_create_and_find(repo).await?;
    test_ids_are_unique(repo).await?;
    test_update(repo).await?;
    test_update_missing(repo).await?;
    test_delete(repo).await?;
    Ok(())
}

async fn test_find_missing(repo: &dyn MediaRepository) -> Result<(), RepositoryError> {
    let found = repo.find(&MediaId::from("definitely-missing")).await?;
    assert!(found.is_none(), "find on a missing id should return None");
    Ok(())
}

async fn test_create_and_find(repo: &dyn MediaRepository) -> Result<(), RepositoryError> {
    let created = repo.create(new_item("created")).await?;
    assert_eq!(created.filename, "created");
    assert_eq!(created.created_at, created.updated_at);

    let found = repo.find(&created.id).await?;
    assert_eq!(found.as_ref(), Some(&created));
    Ok(())
}

async fn test_ids_are_unique(repo: &dyn MediaRepository) -> Result<(), RepositoryError> {
    let a = repo.create(new_item("a")).await?;
    let b = repo.create(new_item("b")).await?;
    assert_ne!(a.id, b.id, "created records must get distinct ids");
    Ok(())
}

async fn test_update(repo: &dyn MediaRepository) -> Result<(), RepositoryError> {
    let created = repo.create(new_item("before")).await?;
    let updated = repo
        .update(&created.id, MediaItemUpdate::rename("after", "pdf"))
        .await?;
    assert!(updated);

    let found = repo.find(&created.id).await?.expect("record should exist");
    assert_eq!(found.filename, "after");
    assert_eq!(found.formatted_filename, "after.pdf");
    assert_eq!(found.path, created.path, "update must not touch other fields");
    assert!(found.updated_at >= created.updated_at);
    Ok(())
}

async fn test_update_missing(repo: &dyn MediaRepository) -> Result<(), RepositoryError> {
    let updated = repo
        .update(
            &MediaId::from("definitely-missing"),
            MediaItemUpdate::rename("x", "pdf"),
        )
        .await?;
    assert!(!updated, "update on a missing id should return false");
    Ok(())
}

async fn test_delete(repo: &dyn MediaRepository) -> Result<(), RepositoryError> {
    let created = repo.create(new_item("doomed")).await?;
    assert!(repo.delete(&created.id).await?);
    assert!(repo.find(&created.id).await?.is_none());
    assert!(
        !repo.delete(&created.id).await?,
        "deleting twice should return false"
    );
    Ok(())
}
