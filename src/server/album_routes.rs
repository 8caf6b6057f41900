use super::error::ApiError;
use super::state::GuardedAlbumStore;
use crate::album_store::{AlbumStore, AlbumStoreError, AlbumSummary, CategoryImages};
use crate::category::ALL_CATEGORIES;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Serialize)]
struct AlbumsResponse {
    status: &'static str,
    albums: Vec<AlbumSummary>,
}

#[derive(Serialize)]
struct CategoryImagesResponse {
    status: &'static str,
    album_id: String,
    category: String,
    images: Vec<String>,
}

#[derive(Serialize)]
struct AllImagesResponse {
    status: &'static str,
    album_id: String,
    images: CategoryImages,
}

/// Runs a store read on the blocking pool; the SQLite backend holds a mutex
/// around a synchronous connection.
async fn with_store<T, F>(store: GuardedAlbumStore, read: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn AlbumStore) -> Result<T, AlbumStoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || read(store.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(format!("Store task failed: {}", e)))?
        .map_err(ApiError::from)
}

pub(super) async fn list_albums(
    State(store): State<GuardedAlbumStore>,
) -> Result<Response, ApiError> {
    let albums = with_store(store, |s| s.list_albums()).await?;
    Ok(Json(AlbumsResponse {
        status: "success",
        albums,
    })
    .into_response())
}

pub(super) async fn list_images(
    State(store): State<GuardedAlbumStore>,
    Path((album_id, category)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    if category == ALL_CATEGORIES {
        let id = album_id.clone();
        let images = with_store(store, move |s| s.list_all_images(&id)).await?;
        return Ok(Json(AllImagesResponse {
            status: "success",
            album_id,
            images,
        })
        .into_response());
    }

    let (id, cat) = (album_id.clone(), category.clone());
    let images = with_store(store, move |s| s.list_images(&id, &cat)).await?;
    Ok(Json(CategoryImagesResponse {
        status: "success",
        album_id,
        category,
        images,
    })
    .into_response())
}
