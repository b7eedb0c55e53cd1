use super::archive::{self, ExtractedImage};
use super::models::{ActiveModel, Column, Entity, Model, PhotoOwner};
use crate::common::errors::{BusinessError, BusinessResult, DbErrorExt};
use crate::common::multipart::UploadedFile;
use crate::external::storage::MediaStore;
use crate::inspections::sections::SectionKind;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

/// Folder shared by every photo of one submission: `photos/<date>_<HH-MM-SS>`
pub fn photo_folder(inspection_date: NaiveDate, captured_at: DateTime<Utc>) -> String {
    format!(
        "photos/{}_{}",
        inspection_date.format("%Y-%m-%d"),
        captured_at.format("%H-%M-%S")
    )
}

/// Keeps file names safe as storage key segments
fn sanitize_file_name(file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "photo".to_string()
    } else {
        cleaned
    }
}

fn with_suffix(file_name: &str, suffix: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => format!("{stem}_{suffix}.{extension}"),
        _ => format!("{file_name}_{suffix}"),
    }
}

/// Stores the photos of one request under a shared folder and remembers what it wrote
pub struct PhotoBatch<'a> {
    media: &'a dyn MediaStore,
    folder: String,
    stored_keys: Vec<String>,
}

impl<'a> PhotoBatch<'a> {
    pub fn new(media: &'a dyn MediaStore, inspection_date: NaiveDate, captured_at: DateTime<Utc>) -> Self {
        Self {
            media,
            folder: photo_folder(inspection_date, captured_at),
            stored_keys: Vec::new(),
        }
    }

    /// Storage key for a photo; the photo id in the name keeps keys unique across batches
    pub fn storage_key(&self, section: SectionKind, photo_id: Uuid, file_name: &str) -> String {
        let file_name = sanitize_file_name(file_name);
        format!(
            "{}/{}/{}",
            self.folder,
            section.storage_dir(),
            with_suffix(&file_name, &photo_id.simple().to_string())
        )
    }

    /// Writes each image to the media store and inserts its photo row
    pub async fn store<C: ConnectionTrait>(
        &mut self,
        db: &C,
        inspection_id: Uuid,
        owner: PhotoOwner,
        images: Vec<ExtractedImage>,
    ) -> BusinessResult<Vec<Model>> {
        let mut created = Vec::with_capacity(images.len());
        for image in images {
            let id = Uuid::new_v4();
            let key = self.storage_key(owner.section(), id, &image.file_name);
            let size_bytes = i64::try_from(image.bytes.len()).unwrap_or(i64::MAX);
            self.media.put(&key, image.bytes).await?;
            self.stored_keys.push(key.clone());

            let mut photo = ActiveModel {
                id: Set(id),
                inspection_id: Set(inspection_id),
                original_filename: Set(image.file_name),
                storage_key: Set(key),
                size_bytes: Set(size_bytes),
                uploaded_at: Set(Utc::now()),
                ..Default::default()
            };
            owner.apply(&mut photo);
            created.push(
                photo
                    .insert(db)
                    .await
                    .map_err(|e| e.to_business_error("photo"))?,
            );
        }
        Ok(created)
    }

    pub fn stored_keys(&self) -> &[String] {
        &self.stored_keys
    }

    /// Removes everything this batch wrote; used when the enclosing transaction fails
    pub async fn discard(self) {
        for key in &self.stored_keys {
            if let Err(err) = self.media.delete(key).await {
                tracing::warn!(key, "Could not remove orphaned photo: {err}");
            }
        }
    }
}

/// Turns uploaded archives and loose image files into extracted images
pub async fn collect_images(files: Vec<UploadedFile>) -> BusinessResult<Vec<ExtractedImage>> {
    let mut images = Vec::new();
    for file in files {
        if archive::is_image_name(&file.file_name) {
            images.push(ExtractedImage {
                file_name: archive::base_name(&file.file_name).to_string(),
                bytes: file.bytes,
            });
        } else if file.file_name.to_lowercase().ends_with(".zip") || file.field == "zip_photos" {
            let extracted = archive::extract_images_blocking(file.file_name.clone(), file.bytes)
                .await
                .inspect_err(|err| tracing::error!("Rejected photo archive: {err}"))?;
            images.extend(extracted);
        } else {
            return Err(BusinessError::ValidationError {
                field: file.field,
                message: format!("'{}' is neither an image nor a ZIP archive", file.file_name),
            });
        }
    }
    Ok(images)
}

pub async fn list_photos(
    db: &DatabaseConnection,
    inspection_id: Uuid,
    section: Option<SectionKind>,
) -> BusinessResult<Vec<Model>> {
    let mut query = Entity::find().filter(Column::InspectionId.eq(inspection_id));
    if let Some(section) = section {
        query = query.filter(Column::Section.eq(section));
    }
    query
        .order_by_asc(Column::Section)
        .order_by_asc(Column::UploadedAt)
        .all(db)
        .await
        .map_err(|e| e.to_business_error("photo"))
}

pub async fn get_photo(db: &DatabaseConnection, id: Uuid) -> BusinessResult<Model> {
    Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| e.to_business_error("photo"))?
        .ok_or_else(|| crate::not_found!("photo", id))
}

/// Adds photos to an existing section instance
pub async fn add_photos(
    db: &DatabaseConnection,
    media: &dyn MediaStore,
    owner: PhotoOwner,
    files: Vec<UploadedFile>,
) -> BusinessResult<Vec<Model>> {
    let inspection_id = owner
        .inspection_id(db)
        .await
        .map_err(|e| e.to_business_error("photo"))?
        .ok_or_else(|| crate::not_found!(owner.section(), owner.owner_id()))?;
    let inspection = crate::inspections::models::Entity::find_by_id(inspection_id)
        .one(db)
        .await
        .map_err(|e| e.to_business_error("inspection"))?
        .ok_or_else(|| crate::not_found!("inspection", inspection_id))?;

    let images = collect_images(files).await?;
    if images.is_empty() {
        return Ok(Vec::new());
    }

    let mut batch = PhotoBatch::new(media, inspection.inspection_date, Utc::now());
    let txn = db.begin().await.map_err(|e| e.to_business_error("photo"))?;
    let result = batch.store(&txn, inspection_id, owner, images).await;

    match result {
        Ok(created) => {
            if let Err(err) = txn.commit().await {
                batch.discard().await;
                return Err(err.to_business_error("photo"));
            }
            tracing::info!(
                section = %owner.section(),
                owner = %owner.owner_id(),
                count = created.len(),
                "Added photos"
            );
            Ok(created)
        }
        Err(err) => {
            if let Err(rollback) = txn.rollback().await {
                tracing::warn!("Rollback of photo upload failed: {rollback}");
            }
            batch.discard().await;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::storage::LocalMediaStore;
    use chrono::TimeZone;

    #[test]
    fn test_photo_folder_format() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(photo_folder(date, at), "photos/2025-03-01_09-05-07");
    }

    #[test]
    fn test_keys_carry_the_photo_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf());
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 5, 7).unwrap();
        let batch = PhotoBatch::new(&store, date, at);
        let id = Uuid::parse_str("0f8fad5b-d9cb-469f-a165-70867728950e").unwrap();

        assert_eq!(
            batch.storage_key(SectionKind::Pallets, id, "IMG 1.jpg"),
            "photos/2025-03-01_09-05-07/pallets/IMG_1_0f8fad5bd9cb469fa16570867728950e.jpg"
        );
        assert_eq!(
            batch.storage_key(SectionKind::Loading, id, "README"),
            "photos/2025-03-01_09-05-07/loading/README_0f8fad5bd9cb469fa16570867728950e"
        );
        assert_ne!(
            batch.storage_key(SectionKind::Pallets, id, "IMG 1.jpg"),
            batch.storage_key(SectionKind::Pallets, Uuid::new_v4(), "IMG 1.jpg")
        );
    }

    #[tokio::test]
    async fn test_discard_only_removes_own_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf());
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 5, 7).unwrap();

        let mut kept = PhotoBatch::new(&store, date, at);
        let kept_key = kept.storage_key(SectionKind::Pallets, Uuid::new_v4(), "front.png");
        store.put(&kept_key, b"first".to_vec()).await.unwrap();
        kept.stored_keys.push(kept_key.clone());

        let mut failed = PhotoBatch::new(&store, date, at);
        let failed_key = failed.storage_key(SectionKind::Pallets, Uuid::new_v4(), "front.png");
        store.put(&failed_key, b"second".to_vec()).await.unwrap();
        failed.stored_keys.push(failed_key.clone());

        assert_ne!(kept_key, failed_key);
        failed.discard().await;
        assert_eq!(store.get(&kept_key).await.unwrap(), b"first");
        assert!(store.get(&failed_key).await.is_err());
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("фото 1.jpg"), "фото_1.jpg");
        assert_eq!(sanitize_file_name("a/b.png"), "a_b.png");
        assert_eq!(sanitize_file_name(".."), "photo");
    }
}
