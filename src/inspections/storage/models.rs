use chrono::{DateTime, Utc};
use crudcrate::{CRUDResource, EntityToModels};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, EntityToModels)]
#[sea_orm(table_name = "mushroom_storage")]
#[crudcrate(
    generate_router,
    api_struct = "MushroomStorage",
    name_singular = "mushroom_storage",
    name_plural = "mushroom_storage",
    description = "Section 1 (placement): how the product was stored when the inspector arrived, with box and pallet counts and fridge and product temperatures."
)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[crudcrate(primary_key, update_model = false, create_model = false, on_create = Uuid::new_v4())]
    pub id: Uuid,
    #[crudcrate(sortable, filterable)]
    pub inspection_id: Uuid,
    #[crudcrate(sortable, create_model = false, on_create = 0)]
    pub position: i32,
    #[crudcrate(sortable, filterable)]
    pub quantity_of_boxes: i32,
    #[crudcrate(sortable, filterable)]
    pub quantity_of_pallets: i32,
    #[sea_orm(column_type = "Decimal(Some((6, 2)))")]
    pub temperature_in_fridge: Decimal,
    #[sea_orm(column_type = "Decimal(Some((6, 2)))")]
    pub mushroom_temperature_min: Decimal,
    #[sea_orm(column_type = "Decimal(Some((6, 2)))")]
    pub mushroom_temperature_max: Decimal,
    #[crudcrate(filterable)]
    pub thermometer_id: Option<Uuid>,
    #[crudcrate(sortable, filterable, fulltext)]
    pub invoice_number: Option<String>,
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
    #[sea_orm(
        belongs_to = "crate::instruments::thermometers::models::Entity",
        from = "Column::ThermometerId",
        to = "crate::instruments::thermometers::models::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Thermometers,
}

impl Related<crate::inspections::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inspections.def()
    }
}

impl Related<crate::instruments::thermometers::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Thermometers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
