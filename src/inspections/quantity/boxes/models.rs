use chrono::{DateTime, Utc};
use crudcrate::{CRUDResource, EntityToModels};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, EntityToModels)]
#[sea_orm(table_name = "boxes")]
#[crudcrate(
    generate_router,
    api_struct = "BoxWeight",
    name_singular = "box",
    name_plural = "boxes",
    description = "One weighed pallet of boxes: gross weight including the pallet, and the pallet weight, both in kg."
)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[crudcrate(primary_key, update_model = false, create_model = false, on_create = Uuid::new_v4())]
    pub id: Uuid,
    #[crudcrate(sortable, filterable)]
    pub quantity_inspection_id: Uuid,
    #[crudcrate(sortable, create_model = false, on_create = 0)]
    pub position: i32,
    #[sea_orm(column_type = "Decimal(Some((10, 3)))")]
    #[crudcrate(sortable)]
    pub gross_weight: Decimal,
    #[sea_orm(column_type = "Decimal(Some((10, 3)))")]
    #[crudcrate(sortable)]
    pub pallet_weight: Decimal,
    #[crudcrate(update_model = false, create_model = false, on_create = chrono::Utc::now(), sortable)]
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::inspections::quantity::models::Entity",
        from = "Column::QuantityInspectionId",
        to = "crate::inspections::quantity::models::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    QuantityInspections,
}

impl Related<crate::inspections::quantity::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuantityInspections.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
