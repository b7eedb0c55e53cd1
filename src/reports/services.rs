use super::builder::build_report;
use super::calculations::ReportFigures;
use super::data::{PhotoSelection, load_report_data};
use super::docx::render_docx_blocking;
use crate::common::errors::BusinessResult;
use crate::config::ReportSettings;
use crate::external::storage::MediaStore;
use crate::inspections::services::ensure_inspection_exists;
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

/// Reports are stored per inspection date, a later report for the same date replaces it
pub fn report_key(inspection_date: NaiveDate) -> String {
    format!("reports/{}.docx", inspection_date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeneratedReport {
    pub inspection_id: Uuid,
    pub storage_key: String,
    pub size_bytes: usize,
    pub photos: usize,
    pub url: String,
}

pub async fn generate_report(
    db: &DatabaseConnection,
    media: &dyn MediaStore,
    settings: &ReportSettings,
    inspection_id: Uuid,
    selection: &PhotoSelection,
) -> BusinessResult<GeneratedReport> {
    let data = load_report_data(db, inspection_id, selection).await?;
    let figures = ReportFigures::compute(&data)?;
    let document = build_report(&data, &figures, settings);

    let mut photos = HashMap::new();
    for photo in document.photos() {
        if !photos.contains_key(&photo.id) {
            photos.insert(photo.id, media.get(&photo.storage_key).await?);
        }
    }
    let photo_count = photos.len();

    let key = report_key(document.inspection_date);
    let bytes = render_docx_blocking(document, photos).await?;
    let size_bytes = bytes.len();
    media.put(&key, bytes).await?;

    tracing::info!(
        inspection = %inspection_id,
        key = %key,
        size_bytes,
        photos = photo_count,
        "Generated inspection report"
    );

    Ok(GeneratedReport {
        inspection_id,
        storage_key: key,
        size_bytes,
        photos: photo_count,
        url: format!("/api/inspections/{inspection_id}/report"),
    })
}

/// Stored report of an inspection as (file name, bytes)
pub async fn download_report(
    db: &DatabaseConnection,
    media: &dyn MediaStore,
    inspection_id: Uuid,
) -> BusinessResult<(String, Vec<u8>)> {
    let inspection = ensure_inspection_exists(db, inspection_id).await?;
    let key = report_key(inspection.inspection_date);
    let bytes = media.get(&key).await?;

    let file_name = key.rsplit('/').next().unwrap_or(&key).to_string();
    Ok((file_name, bytes))
}
