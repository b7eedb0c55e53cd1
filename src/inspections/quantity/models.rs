use chrono::{DateTime, Utc};
use crudcrate::{CRUDResource, EntityToModels};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, EntityToModels)]
#[sea_orm(table_name = "quantity_inspections")]
#[crudcrate(
    generate_router,
    api_struct = "QuantityInspection",
    name_singular = "quantity_inspection",
    name_plural = "quantity_inspections",
    description = "Section 3 (quantity): the weighing session, with the scale used and one box row per weighed pallet."
)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[crudcrate(primary_key, update_model = false, create_model = false, on_create = Uuid::new_v4())]
    pub id: Uuid,
    #[crudcrate(sortable, filterable)]
    pub inspection_id: Uuid,
    #[crudcrate(sortable, create_model = false, on_create = 0)]
    pub position: i32,
    #[crudcrate(filterable)]
    pub scale_id: Option<Uuid>,
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
        belongs_to = "crate::instruments::scales::models::Entity",
        from = "Column::ScaleId",
        to = "crate::instruments::scales::models::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Scales,
    #[sea_orm(has_many = "super::boxes::models::Entity")]
    Boxes,
}

impl Related<crate::inspections::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inspections.def()
    }
}

impl Related<crate::instruments::scales::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Scales.def()
    }
}

impl Related<super::boxes::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Boxes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
