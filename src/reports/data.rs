use crate::common::errors::{BusinessResult, DbErrorExt};
use crate::inspections::loading::models as loading;
use crate::inspections::models as inspections;
use crate::inspections::quality::models as quality;
use crate::inspections::quantity::boxes::models as boxes;
use crate::inspections::quantity::models as quantity;
use crate::inspections::sections::SectionKind;
use crate::inspections::services::load_sections;
use crate::inspections::storage::models as storage;
use crate::instruments::scales::models as scales;
use crate::instruments::thermometers::models as thermometers;
use crate::photos::models as photos;
use sea_orm::{DatabaseConnection, EntityTrait, Iterable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use utoipa::ToSchema;
use uuid::Uuid;

use super::calculations::ReportError;

/// Photos chosen for each report section, embedded in the given order
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PhotoSelection {
    pub placement_photo_ids: Vec<Uuid>,
    pub marking_photo_ids: Vec<Uuid>,
    pub quantity_photo_ids: Vec<Uuid>,
    pub quality_photo_ids: Vec<Uuid>,
    pub diameter_photo_ids: Vec<Uuid>,
    pub pallet_photo_ids: Vec<Uuid>,
    pub loading_photo_ids: Vec<Uuid>,
}

impl PhotoSelection {
    pub fn ids(&self, section: SectionKind) -> &[Uuid] {
        match section {
            SectionKind::Placement => &self.placement_photo_ids,
            SectionKind::Marking => &self.marking_photo_ids,
            SectionKind::Quantity => &self.quantity_photo_ids,
            SectionKind::Quality => &self.quality_photo_ids,
            SectionKind::Diameter => &self.diameter_photo_ids,
            SectionKind::Pallets => &self.pallet_photo_ids,
            SectionKind::Loading => &self.loading_photo_ids,
        }
    }
}

/// Everything the report reads about one inspection
#[derive(Debug, Clone)]
pub struct ReportData {
    pub inspection: inspections::Model,
    pub storage: Option<storage::Model>,
    pub storage_thermometer: Option<thermometers::Model>,
    pub quantity: Option<quantity::Model>,
    pub scale: Option<scales::Model>,
    /// Weighed boxes of every quantity section, in section then box order
    pub boxes: Vec<boxes::Model>,
    pub quality: Option<quality::Model>,
    pub loading: Option<loading::Model>,
    pub loading_thermometer: Option<thermometers::Model>,
    pub photos: BTreeMap<SectionKind, Vec<photos::Model>>,
}

impl ReportData {
    pub fn photos(&self, section: SectionKind) -> &[photos::Model] {
        self.photos.get(&section).map_or(&[], Vec::as_slice)
    }
}

/// Keeps the selected ids that name a photo of `section`, in selection order
pub fn select_photos(
    available: &[photos::Model],
    section: SectionKind,
    ids: &[Uuid],
) -> Vec<photos::Model> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(**id))
        .filter_map(|id| {
            let photo = available
                .iter()
                .find(|photo| photo.id == *id && photo.section == section);
            if photo.is_none() {
                tracing::debug!(%id, %section, "Ignoring selected photo outside the section");
            }
            photo.cloned()
        })
        .collect()
}

async fn thermometer(
    db: &DatabaseConnection,
    id: Option<Uuid>,
) -> BusinessResult<Option<thermometers::Model>> {
    let Some(id) = id else { return Ok(None) };
    thermometers::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| e.to_business_error("thermometer"))
}

/// Boxes weighed in the quantity section the report is built from, in position order
fn boxes_of(quantity: Option<&quantity::Model>, boxes: Vec<boxes::Model>) -> Vec<boxes::Model> {
    let Some(quantity) = quantity else {
        return Vec::new();
    };
    boxes
        .into_iter()
        .filter(|weighed| weighed.quantity_inspection_id == quantity.id)
        .collect()
}

pub async fn load_report_data(
    db: &DatabaseConnection,
    inspection_id: Uuid,
    selection: &PhotoSelection,
) -> BusinessResult<ReportData> {
    let inspection = inspections::Entity::find_by_id(inspection_id)
        .one(db)
        .await
        .map_err(|e| e.to_business_error("inspection"))?
        .ok_or(ReportError::InspectionNotFound(inspection_id))?;

    let sections = load_sections(db, inspection_id)
        .await
        .map_err(|e| e.to_business_error("inspection"))?;

    let storage = sections.storage.into_iter().next();
    let quantity = sections.quantity.first().cloned();
    let quality = sections.quality.into_iter().next();
    let loading = sections.loading.into_iter().next();

    let boxes = boxes_of(quantity.as_ref(), sections.boxes);

    let scale = match quantity.as_ref().and_then(|q| q.scale_id) {
        Some(id) => scales::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(|e| e.to_business_error("scale"))?,
        None => None,
    };
    let storage_thermometer = thermometer(db, storage.as_ref().and_then(|s| s.thermometer_id)).await?;
    let loading_thermometer = thermometer(db, loading.as_ref().and_then(|l| l.thermometer_id)).await?;

    let photos = SectionKind::iter()
        .map(|section| {
            let selected = select_photos(&sections.photos, section, selection.ids(section));
            (section, selected)
        })
        .collect();

    Ok(ReportData {
        inspection,
        storage,
        storage_thermometer,
        quantity,
        scale,
        boxes,
        quality,
        loading,
        loading_thermometer,
        photos,
    })
}
