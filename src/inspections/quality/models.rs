use chrono::{DateTime, Utc};
use crudcrate::{CRUDResource, EntityToModels};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, EntityToModels)]
#[sea_orm(table_name = "quality_inspections")]
#[crudcrate(
    generate_router,
    api_struct = "QualityInspection",
    name_singular = "quality_inspection",
    name_plural = "quality_inspections",
    description = "Section 4 (quality): the combined sample and how much of it conforms to the declared grade and caliber, in kg."
)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[crudcrate(primary_key, update_model = false, create_model = false, on_create = Uuid::new_v4())]
    pub id: Uuid,
    #[crudcrate(sortable, filterable)]
    pub inspection_id: Uuid,
    #[crudcrate(sortable, create_model = false, on_create = 0)]
    pub position: i32,
    #[sea_orm(column_type = "Decimal(Some((8, 3)))", nullable)]
    pub sample_mass_kg: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((8, 3)))", nullable)]
    pub conforms_to_declared_grade: Option<Decimal>,
    /// Off-grade mass below the 50 mm caliber
    #[sea_orm(column_type = "Decimal(Some((8, 3)))", nullable)]
    pub off_grade_mass_kg_50: Option<Decimal>,
    /// Off-grade mass above the 70 mm caliber
    #[sea_orm(column_type = "Decimal(Some((8, 3)))", nullable)]
    pub off_grade_mass_kg_70: Option<Decimal>,
    #[crudcrate(update_model = false, create_model = false, on_create = chrono::Utc::now(), sortable)]
    pub created_at: DateTime<Utc>,
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
}

impl Related<crate::inspections::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inspections.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
