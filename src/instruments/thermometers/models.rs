use chrono::{DateTime, NaiveDate, Utc};
use crudcrate::{CRUDResource, EntityToModels};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, EntityToModels)]
#[sea_orm(table_name = "thermometers")]
#[crudcrate(
    generate_router,
    api_struct = "Thermometer",
    name_singular = "thermometer",
    name_plural = "thermometers",
    description = "Reference thermometers used to measure fridge, product and transport temperatures. A thermometer cannot be deleted while an inspection section refers to it."
)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[crudcrate(primary_key, update_model = false, create_model = false, on_create = Uuid::new_v4())]
    pub id: Uuid,
    #[crudcrate(sortable, filterable, fulltext)]
    pub info: String,
    #[crudcrate(sortable, filterable, fulltext)]
    pub serial: Option<String>,
    #[crudcrate(sortable)]
    pub calibration_date: Option<NaiveDate>,
    #[crudcrate(update_model = false, create_model = false, on_create = chrono::Utc::now(), sortable)]
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// Calibration date as printed on reports
    pub fn calibration_label(&self) -> String {
        self.calibration_date
            .map_or_else(|| "-".to_string(), |d| d.format("%d.%m.%Y").to_string())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "crate::inspections::storage::models::Entity")]
    MushroomStorage,
    #[sea_orm(has_many = "crate::inspections::loading::models::Entity")]
    ProductLoadings,
}

impl Related<crate::inspections::storage::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MushroomStorage.def()
    }
}

impl Related<crate::inspections::loading::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductLoadings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
