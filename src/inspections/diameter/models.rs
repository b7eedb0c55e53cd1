use chrono::{DateTime, Utc};
use crudcrate::{CRUDResource, EntityToModels};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, EntityToModels)]
#[sea_orm(table_name = "diameter_measurements")]
#[crudcrate(
    generate_router,
    api_struct = "DiameterMeasurement",
    name_singular = "diameter_measurement",
    name_plural = "diameter_measurements",
    description = "Section 5 (diameter): cap diameter measurements with free-form notes."
)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[crudcrate(primary_key, update_model = false, create_model = false, on_create = Uuid::new_v4())]
    pub id: Uuid,
    #[crudcrate(sortable, filterable)]
    pub inspection_id: Uuid,
    #[crudcrate(sortable, create_model = false, on_create = 0)]
    pub position: i32,
    #[sea_orm(column_type = "Decimal(Some((8, 2)))", nullable)]
    #[crudcrate(sortable)]
    pub average_diameter: Option<Decimal>,
    #[sea_orm(column_type = "Text", nullable)]
    #[crudcrate(filterable, fulltext)]
    pub notes: Option<String>,
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
