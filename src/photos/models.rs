use crate::inspections::sections::SectionKind;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "photos")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub section: SectionKind,
    pub storage_id: Option<Uuid>,
    pub marking_id: Option<Uuid>,
    pub quantity_inspection_id: Option<Uuid>,
    pub quality_inspection_id: Option<Uuid>,
    pub diameter_measurement_id: Option<Uuid>,
    pub pallet_id: Option<Uuid>,
    pub loading_id: Option<Uuid>,
    pub original_filename: String,
    pub storage_key: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::inspections::models::Entity",
        from = "Column::InspectionId",
        to = "crate::inspections::models::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Inspections,
    #[sea_orm(
        belongs_to = "crate::inspections::storage::models::Entity",
        from = "Column::StorageId",
        to = "crate::inspections::storage::models::Column::Id",
        on_delete = "Cascade"
    )]
    MushroomStorage,
    #[sea_orm(
        belongs_to = "crate::inspections::marking::models::Entity",
        from = "Column::MarkingId",
        to = "crate::inspections::marking::models::Column::Id",
        on_delete = "Cascade"
    )]
    ProductMarkings,
    #[sea_orm(
        belongs_to = "crate::inspections::quantity::models::Entity",
        from = "Column::QuantityInspectionId",
        to = "crate::inspections::quantity::models::Column::Id",
        on_delete = "Cascade"
    )]
    QuantityInspections,
    #[sea_orm(
        belongs_to = "crate::inspections::quality::models::Entity",
        from = "Column::QualityInspectionId",
        to = "crate::inspections::quality::models::Column::Id",
        on_delete = "Cascade"
    )]
    QualityInspections,
    #[sea_orm(
        belongs_to = "crate::inspections::diameter::models::Entity",
        from = "Column::DiameterMeasurementId",
        to = "crate::inspections::diameter::models::Column::Id",
        on_delete = "Cascade"
    )]
    DiameterMeasurements,
    #[sea_orm(
        belongs_to = "crate::inspections::pallets::models::Entity",
        from = "Column::PalletId",
        to = "crate::inspections::pallets::models::Column::Id",
        on_delete = "Cascade"
    )]
    Pallets,
    #[sea_orm(
        belongs_to = "crate::inspections::loading::models::Entity",
        from = "Column::LoadingId",
        to = "crate::inspections::loading::models::Column::Id",
        on_delete = "Cascade"
    )]
    ProductLoadings,
}

impl Related<crate::inspections::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inspections.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// The section instance a photo belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "section", content = "owner_id", rename_all = "snake_case")]
pub enum PhotoOwner {
    Placement(Uuid),
    Marking(Uuid),
    Quantity(Uuid),
    Quality(Uuid),
    Diameter(Uuid),
    Pallets(Uuid),
    Loading(Uuid),
}

impl PhotoOwner {
    pub fn new(section: SectionKind, owner_id: Uuid) -> Self {
        match section {
            SectionKind::Placement => PhotoOwner::Placement(owner_id),
            SectionKind::Marking => PhotoOwner::Marking(owner_id),
            SectionKind::Quantity => PhotoOwner::Quantity(owner_id),
            SectionKind::Quality => PhotoOwner::Quality(owner_id),
            SectionKind::Diameter => PhotoOwner::Diameter(owner_id),
            SectionKind::Pallets => PhotoOwner::Pallets(owner_id),
            SectionKind::Loading => PhotoOwner::Loading(owner_id),
        }
    }

    pub fn section(self) -> SectionKind {
        match self {
            PhotoOwner::Placement(_) => SectionKind::Placement,
            PhotoOwner::Marking(_) => SectionKind::Marking,
            PhotoOwner::Quantity(_) => SectionKind::Quantity,
            PhotoOwner::Quality(_) => SectionKind::Quality,
            PhotoOwner::Diameter(_) => SectionKind::Diameter,
            PhotoOwner::Pallets(_) => SectionKind::Pallets,
            PhotoOwner::Loading(_) => SectionKind::Loading,
        }
    }

    pub fn owner_id(self) -> Uuid {
        match self {
            PhotoOwner::Placement(id)
            | PhotoOwner::Marking(id)
            | PhotoOwner::Quantity(id)
            | PhotoOwner::Quality(id)
            | PhotoOwner::Diameter(id)
            | PhotoOwner::Pallets(id)
            | PhotoOwner::Loading(id) => id,
        }
    }

    /// Foreign key column holding the owner for a section kind
    pub fn column(section: SectionKind) -> Column {
        match section {
            SectionKind::Placement => Column::StorageId,
            SectionKind::Marking => Column::MarkingId,
            SectionKind::Quantity => Column::QuantityInspectionId,
            SectionKind::Quality => Column::QualityInspectionId,
            SectionKind::Diameter => Column::DiameterMeasurementId,
            SectionKind::Pallets => Column::PalletId,
            SectionKind::Loading => Column::LoadingId,
        }
    }

    /// Reads the owner back from the column selected by `section`
    pub fn from_model(model: &Model) -> Option<Self> {
        let owner_id = match model.section {
            SectionKind::Placement => model.storage_id,
            SectionKind::Marking => model.marking_id,
            SectionKind::Quantity => model.quantity_inspection_id,
            SectionKind::Quality => model.quality_inspection_id,
            SectionKind::Diameter => model.diameter_measurement_id,
            SectionKind::Pallets => model.pallet_id,
            SectionKind::Loading => model.loading_id,
        }?;
        Some(Self::new(model.section, owner_id))
    }

    /// Sets the section column and exactly one owner foreign key
    pub fn apply(self, photo: &mut ActiveModel) {
        photo.section = Set(self.section());
        photo.storage_id = Set(None);
        photo.marking_id = Set(None);
        photo.quantity_inspection_id = Set(None);
        photo.quality_inspection_id = Set(None);
        photo.diameter_measurement_id = Set(None);
        photo.pallet_id = Set(None);
        photo.loading_id = Set(None);

        let owner = Some(self.owner_id());
        match self {
            PhotoOwner::Placement(_) => photo.storage_id = Set(owner),
            PhotoOwner::Marking(_) => photo.marking_id = Set(owner),
            PhotoOwner::Quantity(_) => photo.quantity_inspection_id = Set(owner),
            PhotoOwner::Quality(_) => photo.quality_inspection_id = Set(owner),
            PhotoOwner::Diameter(_) => photo.diameter_measurement_id = Set(owner),
            PhotoOwner::Pallets(_) => photo.pallet_id = Set(owner),
            PhotoOwner::Loading(_) => photo.loading_id = Set(owner),
        }
    }

    /// Inspection owning the section instance, `None` when the instance does not exist
    pub async fn inspection_id<C: ConnectionTrait>(self, db: &C) -> Result<Option<Uuid>, DbErr> {
        use crate::inspections::{diameter, loading, marking, pallets, quality, quantity, storage};

        Ok(match self {
            PhotoOwner::Placement(id) => storage::models::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(|row| row.inspection_id),
            PhotoOwner::Marking(id) => marking::models::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(|row| row.inspection_id),
            PhotoOwner::Quantity(id) => quantity::models::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(|row| row.inspection_id),
            PhotoOwner::Quality(id) => quality::models::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(|row| row.inspection_id),
            PhotoOwner::Diameter(id) => diameter::models::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(|row| row.inspection_id),
            PhotoOwner::Pallets(id) => pallets::models::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(|row| row.inspection_id),
            PhotoOwner::Loading(id) => loading::models::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(|row| row.inspection_id),
        })
    }
}

/// Photo metadata returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Photo {
    pub id: Uuid,
    pub inspection_id: Uuid,
    pub section: SectionKind,
    pub owner_id: Option<Uuid>,
    pub original_filename: String,
    pub storage_key: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
    pub url: String,
}

impl From<Model> for Photo {
    fn from(model: Model) -> Self {
        let owner_id = PhotoOwner::from_model(&model).map(PhotoOwner::owner_id);
        Self {
            url: format!("/api/photos/{}/view", model.id),
            id: model.id,
            inspection_id: model.inspection_id,
            section: model.section,
            owner_id,
            original_filename: model.original_filename,
            storage_key: model.storage_key,
            size_bytes: model.size_bytes,
            uploaded_at: model.uploaded_at,
        }
    }
}
