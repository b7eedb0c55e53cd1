use chrono::{DateTime, NaiveDate, Utc};
use crudcrate::{CRUDResource, EntityToModels};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, EntityToModels)]
#[sea_orm(table_name = "scales")]
#[crudcrate(
    generate_router,
    api_struct = "Scale",
    name_singular = "scale",
    name_plural = "scales",
    description = "Weighing scales used during the quantity check. Submissions may reference a scale by id or describe one by model, serial number and calibration date."
)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[crudcrate(primary_key, update_model = false, create_model = false, on_create = Uuid::new_v4())]
    pub id: Uuid,
    #[crudcrate(sortable, filterable, fulltext)]
    pub model: String,
    #[crudcrate(sortable, filterable, fulltext)]
    pub serial_number: Option<String>,
    #[crudcrate(sortable)]
    pub calibration_date: Option<NaiveDate>,
    #[crudcrate(update_model = false, create_model = false, on_create = chrono::Utc::now(), sortable)]
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::inspections::quantity::models::Entity")]
    QuantityInspections,
}

impl Related<crate::inspections::quantity::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuantityInspections.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
