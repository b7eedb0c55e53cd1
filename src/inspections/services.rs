use super::diameter::models::{self as diameter, DiameterMeasurement};
use super::loading::models::{self as loading, ProductLoading};
use super::marking::models::{self as marking, ProductMarking};
use super::models::{self as inspections, Inspection, get_one_inspection};
use super::pallets::models::{self as pallets, Pallet};
use super::quality::models::{self as quality, QualityInspection};
use super::quantity::boxes::models::{self as boxes, BoxWeight};
use super::quantity::models::{self as quantity, QuantityInspection};
use super::sections::SectionKind;
use super::storage::models::{self as storage, MushroomStorage};
use super::submission::{ErrorSink, FullInspectionSubmission, ScaleChoice};
use crate::common::errors::{BusinessError, BusinessResult, DbErrorExt};
use crate::external::storage::MediaStore;
use crate::instruments::{scales, thermometers};
use crate::photos::archive::{self, ExtractedImage};
use crate::photos::models::{self as photos, Photo, PhotoOwner};
use crate::photos::services::PhotoBatch;
use crate::users::models as users;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;
use uuid::Uuid;

/// Extracted images waiting for their section row, keyed by section and item index
type PendingPhotos = HashMap<(SectionKind, usize), Vec<ExtractedImage>>;

/// Every section row of one inspection, each list ordered by position
#[derive(Debug, Default)]
pub struct InspectionSections {
    pub storage: Vec<storage::Model>,
    pub marking: Vec<marking::Model>,
    pub quantity: Vec<quantity::Model>,
    pub boxes: Vec<boxes::Model>,
    pub quality: Vec<quality::Model>,
    pub diameter: Vec<diameter::Model>,
    pub pallets: Vec<pallets::Model>,
    pub loading: Vec<loading::Model>,
    pub photos: Vec<photos::Model>,
}

pub async fn load_sections<C: ConnectionTrait>(
    db: &C,
    inspection_id: Uuid,
) -> Result<InspectionSections, DbErr> {
    let quantity = quantity::Entity::find()
        .filter(quantity::Column::InspectionId.eq(inspection_id))
        .order_by_asc(quantity::Column::Position)
        .all(db)
        .await?;
    let boxes = boxes::Entity::find()
        .filter(boxes::Column::QuantityInspectionId.is_in(quantity.iter().map(|q| q.id)))
        .order_by_asc(boxes::Column::Position)
        .all(db)
        .await?;

    Ok(InspectionSections {
        storage: storage::Entity::find()
            .filter(storage::Column::InspectionId.eq(inspection_id))
            .order_by_asc(storage::Column::Position)
            .all(db)
            .await?,
        marking: marking::Entity::find()
            .filter(marking::Column::InspectionId.eq(inspection_id))
            .order_by_asc(marking::Column::Position)
            .all(db)
            .await?,
        quality: quality::Entity::find()
            .filter(quality::Column::InspectionId.eq(inspection_id))
            .order_by_asc(quality::Column::Position)
            .all(db)
            .await?,
        diameter: diameter::Entity::find()
            .filter(diameter::Column::InspectionId.eq(inspection_id))
            .order_by_asc(diameter::Column::Position)
            .all(db)
            .await?,
        pallets: pallets::Entity::find()
            .filter(pallets::Column::InspectionId.eq(inspection_id))
            .order_by_asc(pallets::Column::Position)
            .all(db)
            .await?,
        loading: loading::Entity::find()
            .filter(loading::Column::InspectionId.eq(inspection_id))
            .order_by_asc(loading::Column::Position)
            .all(db)
            .await?,
        photos: photos::Entity::find()
            .filter(photos::Column::InspectionId.eq(inspection_id))
            .order_by_asc(photos::Column::UploadedAt)
            .all(db)
            .await?,
        quantity,
        boxes,
    })
}

/// A quantity section with its weighed boxes
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuantityDetail {
    #[serde(flatten)]
    pub quantity: QuantityInspection,
    pub boxes: Vec<BoxWeight>,
}

/// An inspection with every section, box and photo
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InspectionDetail {
    #[serde(flatten)]
    pub inspection: Inspection,
    pub mushroom_storage: Vec<MushroomStorage>,
    pub product_markings: Vec<ProductMarking>,
    pub quantity_inspections: Vec<QuantityDetail>,
    pub quality_inspections: Vec<QualityInspection>,
    pub diameter_measurements: Vec<DiameterMeasurement>,
    pub pallets: Vec<Pallet>,
    pub product_loadings: Vec<ProductLoading>,
    pub photos: Vec<Photo>,
}

pub async fn get_inspection_detail(
    db: &DatabaseConnection,
    inspection_id: Uuid,
) -> BusinessResult<InspectionDetail> {
    let inspection = get_one_inspection(db, inspection_id)
        .await
        .map_err(|e| e.to_business_error("inspection"))?;
    let sections = load_sections(db, inspection_id)
        .await
        .map_err(|e| e.to_business_error("inspection"))?;

    let mut boxes_by_quantity: HashMap<Uuid, Vec<BoxWeight>> = HashMap::new();
    for weighed in sections.boxes {
        boxes_by_quantity
            .entry(weighed.quantity_inspection_id)
            .or_default()
            .push(weighed.into());
    }

    Ok(InspectionDetail {
        inspection,
        mushroom_storage: sections.storage.into_iter().map(Into::into).collect(),
        product_markings: sections.marking.into_iter().map(Into::into).collect(),
        quantity_inspections: sections
            .quantity
            .into_iter()
            .map(|row| QuantityDetail {
                boxes: boxes_by_quantity.remove(&row.id).unwrap_or_default(),
                quantity: row.into(),
            })
            .collect(),
        quality_inspections: sections.quality.into_iter().map(Into::into).collect(),
        diameter_measurements: sections.diameter.into_iter().map(Into::into).collect(),
        pallets: sections.pallets.into_iter().map(Into::into).collect(),
        product_loadings: sections.loading.into_iter().map(Into::into).collect(),
        photos: sections.photos.into_iter().map(Photo::from).collect(),
    })
}

pub async fn ensure_inspection_exists(db: &DatabaseConnection, id: Uuid) -> BusinessResult<inspections::Model> {
    inspections::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| e.to_business_error("inspection"))?
        .ok_or_else(|| crate::not_found!("inspection", id))
}

/// Ids of `wanted` absent from `existing`
fn missing(wanted: &[Uuid], existing: &HashSet<Uuid>) -> HashSet<Uuid> {
    wanted
        .iter()
        .filter(|id| !existing.contains(id))
        .copied()
        .collect()
}

/// Checks that the inspector and every referenced instrument exist before anything is written
async fn check_references(
    db: &DatabaseConnection,
    submission: &FullInspectionSubmission,
) -> BusinessResult<()> {
    let mut errors = ErrorSink::default();
    let db_error = |e: DbErr| e.to_business_error("inspection");

    if users::Entity::find_by_id(submission.inspector)
        .one(db)
        .await
        .map_err(db_error)?
        .is_none()
    {
        errors.push("inspector", format!("user '{}' does not exist", submission.inspector));
    }

    let thermometer_refs: Vec<(String, Uuid)> = submission
        .mushroom_storage
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            item.thermometer
                .map(|id| (format!("{}[{i}].thermometer", SectionKind::Placement.form_name()), id))
        })
        .chain(submission.product_loading.iter().enumerate().filter_map(|(i, item)| {
            item.thermometer
                .map(|id| (format!("{}[{i}].thermometer", SectionKind::Loading.form_name()), id))
        }))
        .collect();
    let scale_refs: Vec<(String, Uuid)> = submission
        .quantity_inspections
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match item.scale_choice() {
            Some(ScaleChoice::Existing(id)) => {
                Some((format!("{}[{i}].scale", SectionKind::Quantity.form_name()), id))
            }
            _ => None,
        })
        .collect();

    if !thermometer_refs.is_empty() {
        let wanted: Vec<Uuid> = thermometer_refs.iter().map(|(_, id)| *id).collect();
        let existing: HashSet<Uuid> = thermometers::models::Entity::find()
            .filter(thermometers::models::Column::Id.is_in(wanted.clone()))
            .all(db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|row| row.id)
            .collect();
        let absent = missing(&wanted, &existing);
        for (key, id) in &thermometer_refs {
            if absent.contains(id) {
                errors.push(key.clone(), format!("thermometer '{id}' does not exist"));
            }
        }
    }

    if !scale_refs.is_empty() {
        let wanted: Vec<Uuid> = scale_refs.iter().map(|(_, id)| *id).collect();
        let existing: HashSet<Uuid> = scales::models::Entity::find()
            .filter(scales::models::Column::Id.is_in(wanted.clone()))
            .all(db)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|row| row.id)
            .collect();
        let absent = missing(&wanted, &existing);
        for (key, id) in &scale_refs {
            if absent.contains(id) {
                errors.push(key.clone(), format!("scale '{id}' does not exist"));
            }
        }
    }

    errors
        .into_result()
        .map_err(|fields| BusinessError::InvalidSubmission { fields })
}

/// Expands every attached archive up front so a broken one rejects the whole submission
async fn extract_archives(submission: &mut FullInspectionSubmission) -> BusinessResult<PendingPhotos> {
    let mut errors = ErrorSink::default();
    let mut pending = PendingPhotos::new();

    for (section, index, file) in submission.take_archives() {
        if archive::is_image_name(&file.file_name) {
            pending.entry((section, index)).or_default().push(ExtractedImage {
                file_name: archive::base_name(&file.file_name).to_string(),
                bytes: file.bytes,
            });
            continue;
        }

        match archive::extract_images_blocking(file.file_name.clone(), file.bytes).await {
            Ok(images) => pending.entry((section, index)).or_default().extend(images),
            Err(err) => {
                tracing::error!(field = %file.field, "Rejected photo archive: {err}");
                errors.push(file.field, err.to_string());
            }
        }
    }

    errors
        .into_result()
        .map_err(|fields| BusinessError::InvalidSubmission { fields })?;
    Ok(pending)
}

fn position(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

async fn attach_photos(
    txn: &DatabaseTransaction,
    batch: &mut PhotoBatch<'_>,
    pending: &mut PendingPhotos,
    inspection_id: Uuid,
    owner: PhotoOwner,
    index: usize,
) -> BusinessResult<()> {
    if let Some(images) = pending.remove(&(owner.section(), index)) {
        batch.store(txn, inspection_id, owner, images).await?;
    }
    Ok(())
}

/// Finds a scale matching the description or registers a new one
async fn resolve_scale(
    txn: &DatabaseTransaction,
    choice: Option<ScaleChoice>,
) -> Result<Option<Uuid>, DbErr> {
    use scales::models as scale;

    let (model, serial_number, calibration_date) = match choice {
        None => return Ok(None),
        Some(ScaleChoice::Existing(id)) => return Ok(Some(id)),
        Some(ScaleChoice::Described {
            model,
            serial_number,
            calibration_date,
        }) => (model, serial_number, calibration_date),
    };

    let mut query = scale::Entity::find().filter(scale::Column::Model.eq(model.as_str()));
    query = match &serial_number {
        Some(serial) => query.filter(scale::Column::SerialNumber.eq(serial.as_str())),
        None => query.filter(scale::Column::SerialNumber.is_null()),
    };
    query = match calibration_date {
        Some(date) => query.filter(scale::Column::CalibrationDate.eq(date)),
        None => query.filter(scale::Column::CalibrationDate.is_null()),
    };
    if let Some(existing) = query.one(txn).await? {
        return Ok(Some(existing.id));
    }

    let created = scale::ActiveModel {
        id: Set(Uuid::new_v4()),
        model: Set(model),
        serial_number: Set(serial_number),
        calibration_date: Set(calibration_date),
        created_at: Set(Utc::now()),
    }
    .insert(txn)
    .await?;
    tracing::info!(scale = %created.id, model = %created.model, "Registered scale from submission");
    Ok(Some(created.id))
}

/// Writes the inspection and all of its sections inside `txn`
async fn persist(
    txn: &DatabaseTransaction,
    batch: &mut PhotoBatch<'_>,
    submission: FullInspectionSubmission,
    mut pending: PendingPhotos,
) -> BusinessResult<Uuid> {
    let db_error = |e: DbErr| e.to_business_error("inspection");
    let now = Utc::now();
    let inspection_id = Uuid::new_v4();

    inspections::ActiveModel {
        id: Set(inspection_id),
        inspection_date: Set(submission.inspection_date),
        inspector_id: Set(submission.inspector),
        job_number: Set(submission.job_number),
        created_at: Set(now),
        last_updated: Set(now),
    }
    .insert(txn)
    .await
    .map_err(db_error)?;

    for (i, item) in submission.mushroom_storage.into_iter().enumerate() {
        let row = storage::ActiveModel {
            id: Set(Uuid::new_v4()),
            inspection_id: Set(inspection_id),
            position: Set(position(i)),
            quantity_of_boxes: Set(item.quantity_of_boxes),
            quantity_of_pallets: Set(item.quantity_of_pallets),
            temperature_in_fridge: Set(item.temperature_in_fridge),
            mushroom_temperature_min: Set(item.mushroom_temperature_min),
            mushroom_temperature_max: Set(item.mushroom_temperature_max),
            thermometer_id: Set(item.thermometer),
            invoice_number: Set(item.invoice_number),
            created_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(db_error)?;
        attach_photos(txn, batch, &mut pending, inspection_id, PhotoOwner::Placement(row.id), i).await?;
    }

    for i in 0..submission.marking_zips.len() {
        let row = marking::ActiveModel {
            id: Set(Uuid::new_v4()),
            inspection_id: Set(inspection_id),
            position: Set(position(i)),
            created_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(db_error)?;
        attach_photos(txn, batch, &mut pending, inspection_id, PhotoOwner::Marking(row.id), i).await?;
    }

    for (i, item) in submission.quantity_inspections.into_iter().enumerate() {
        let scale_id = resolve_scale(txn, item.scale_choice()).await.map_err(db_error)?;
        let row = quantity::ActiveModel {
            id: Set(Uuid::new_v4()),
            inspection_id: Set(inspection_id),
            position: Set(position(i)),
            scale_id: Set(scale_id),
            created_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(db_error)?;

        for (n, weighed) in item.boxes.into_iter().enumerate() {
            boxes::ActiveModel {
                id: Set(Uuid::new_v4()),
                quantity_inspection_id: Set(row.id),
                position: Set(position(n)),
                gross_weight: Set(weighed.gross_weight),
                pallet_weight: Set(weighed.pallet_weight),
                created_at: Set(now),
            }
            .insert(txn)
            .await
            .map_err(db_error)?;
        }
        attach_photos(txn, batch, &mut pending, inspection_id, PhotoOwner::Quantity(row.id), i).await?;
    }

    for (i, item) in submission.quality_inspections.into_iter().enumerate() {
        let row = quality::ActiveModel {
            id: Set(Uuid::new_v4()),
            inspection_id: Set(inspection_id),
            position: Set(position(i)),
            sample_mass_kg: Set(item.sample_mass_kg),
            conforms_to_declared_grade: Set(item.conforms_to_declared_grade),
            off_grade_mass_kg_50: Set(item.off_grade_mass_kg_50),
            off_grade_mass_kg_70: Set(item.off_grade_mass_kg_70),
            created_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(db_error)?;
        attach_photos(txn, batch, &mut pending, inspection_id, PhotoOwner::Quality(row.id), i).await?;
    }

    for (i, item) in submission.diameter_measurements.into_iter().enumerate() {
        let row = diameter::ActiveModel {
            id: Set(Uuid::new_v4()),
            inspection_id: Set(inspection_id),
            position: Set(position(i)),
            average_diameter: Set(item.average_diameter),
            notes: Set(item.notes),
            created_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(db_error)?;
        attach_photos(txn, batch, &mut pending, inspection_id, PhotoOwner::Diameter(row.id), i).await?;
    }

    for i in 0..submission.pallets.len() {
        let row = pallets::ActiveModel {
            id: Set(Uuid::new_v4()),
            inspection_id: Set(inspection_id),
            position: Set(position(i)),
            created_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(db_error)?;
        attach_photos(txn, batch, &mut pending, inspection_id, PhotoOwner::Pallets(row.id), i).await?;
    }

    for (i, item) in submission.product_loading.into_iter().enumerate() {
        let row = loading::ActiveModel {
            id: Set(Uuid::new_v4()),
            inspection_id: Set(inspection_id),
            position: Set(position(i)),
            mushroom_temperature: Set(item.mushroom_temperature),
            thermometer_id: Set(item.thermometer),
            car_number: Set(item.car_number),
            refrigerator_number: Set(item.refrigerator_number),
            seal_number: Set(item.seal_number),
            transport_temperature: Set(item.transport_temperature),
            created_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(db_error)?;
        attach_photos(txn, batch, &mut pending, inspection_id, PhotoOwner::Loading(row.id), i).await?;
    }

    Ok(inspection_id)
}

/// Validates, expands archives and stores a whole inspection in one transaction.
///
/// Photo files written before a failure are removed again, so either the
/// inspection exists with all of its sections and photos or nothing does.
pub async fn create_full_inspection(
    db: &DatabaseConnection,
    media: &dyn MediaStore,
    mut submission: FullInspectionSubmission,
) -> BusinessResult<Inspection> {
    submission
        .check()
        .map_err(|fields| BusinessError::InvalidSubmission { fields })?;
    check_references(db, &submission).await?;
    let pending = extract_archives(&mut submission).await?;

    let mut batch = PhotoBatch::new(media, submission.inspection_date, Utc::now());
    let txn = db
        .begin()
        .await
        .map_err(|e| e.to_business_error("inspection"))?;

    let inspection_id = match persist(&txn, &mut batch, submission, pending).await {
        Ok(id) => id,
        Err(err) => {
            if let Err(rollback) = txn.rollback().await {
                tracing::warn!("Rollback of failed submission failed: {rollback}");
            }
            batch.discard().await;
            return Err(err);
        }
    };
    if let Err(err) = txn.commit().await {
        batch.discard().await;
        return Err(err.to_business_error("inspection"));
    }

    tracing::info!(
        inspection = %inspection_id,
        photos = batch.stored_keys().len(),
        "Created inspection from submission"
    );
    get_one_inspection(db, inspection_id)
        .await
        .map_err(|e| e.to_business_error("inspection"))
}
