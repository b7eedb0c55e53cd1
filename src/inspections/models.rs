use chrono::{DateTime, NaiveDate, Utc};
use crudcrate::{CRUDResource, EntityToModels};
use sea_orm::entity::prelude::*;
use sea_orm::{QueryOrder, QuerySelect};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, EntityToModels)]
#[sea_orm(table_name = "inspections")]
#[crudcrate(
    generate_router,
    api_struct = "Inspection",
    name_singular = "inspection",
    name_plural = "inspections",
    description = "An inspection of one mushroom shipment. It owns the seven inspection sections (placement, marking, quantity, quality, diameter, pallets, loading) together with their photos; deleting an inspection removes all of them.",
    fn_get_one = get_one_inspection,
    fn_get_all = get_all_inspections,
)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[crudcrate(primary_key, update_model = false, create_model = false, on_create = Uuid::new_v4())]
    pub id: Uuid,
    #[crudcrate(sortable, filterable)]
    pub inspection_date: NaiveDate,
    #[crudcrate(sortable, filterable)]
    pub inspector_id: Uuid,
    #[crudcrate(sortable, filterable, fulltext)]
    pub job_number: Option<String>,
    #[crudcrate(update_model = false, create_model = false, on_create = chrono::Utc::now(), sortable)]
    pub created_at: DateTime<Utc>,
    #[crudcrate(update_model = false, create_model = false, on_update = chrono::Utc::now(), on_create = chrono::Utc::now(), sortable)]
    pub last_updated: DateTime<Utc>,
    #[sea_orm(ignore)]
    #[crudcrate(non_db_attr = true, default = None, create_model = false, update_model = false)]
    pub inspector_name: Option<String>,
    #[sea_orm(ignore)]
    #[crudcrate(non_db_attr = true, default = None, create_model = false, update_model = false)]
    pub car_number: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::users::models::Entity",
        from = "Column::InspectorId",
        to = "crate::users::models::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Inspector,
    #[sea_orm(has_many = "super::storage::models::Entity")]
    MushroomStorage,
    #[sea_orm(has_many = "super::marking::models::Entity")]
    ProductMarkings,
    #[sea_orm(has_many = "super::quantity::models::Entity")]
    QuantityInspections,
    #[sea_orm(has_many = "super::quality::models::Entity")]
    QualityInspections,
    #[sea_orm(has_many = "super::diameter::models::Entity")]
    DiameterMeasurements,
    #[sea_orm(has_many = "super::pallets::models::Entity")]
    Pallets,
    #[sea_orm(has_many = "super::loading::models::Entity")]
    ProductLoadings,
    #[sea_orm(has_many = "crate::photos::models::Entity")]
    Photos,
}

impl Related<crate::users::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inspector.def()
    }
}

impl Related<super::storage::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MushroomStorage.def()
    }
}

impl Related<super::marking::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductMarkings.def()
    }
}

impl Related<super::quantity::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuantityInspections.def()
    }
}

impl Related<super::quality::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QualityInspections.def()
    }
}

impl Related<super::diameter::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DiameterMeasurements.def()
    }
}

impl Related<super::pallets::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pallets.def()
    }
}

impl Related<super::loading::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductLoadings.def()
    }
}

impl Related<crate::photos::models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Photos.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Inspector display names keyed by user id
async fn inspector_names(
    db: &DatabaseConnection,
    inspector_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, String>, DbErr> {
    let users = crate::users::models::Entity::find()
        .filter(crate::users::models::Column::Id.is_in(inspector_ids))
        .all(db)
        .await?;
    Ok(users
        .into_iter()
        .map(|user| (user.id, user.display_name()))
        .collect())
}

/// Car number of the first loading section of each inspection
async fn car_numbers(
    db: &DatabaseConnection,
    inspection_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, String>, DbErr> {
    use super::loading::models as loading;

    let loadings = loading::Entity::find()
        .filter(loading::Column::InspectionId.is_in(inspection_ids))
        .order_by_asc(loading::Column::Position)
        .all(db)
        .await?;

    let mut numbers = HashMap::new();
    for row in loadings {
        if let Some(car_number) = row.car_number {
            numbers.entry(row.inspection_id).or_insert(car_number);
        }
    }
    Ok(numbers)
}

pub(crate) async fn get_one_inspection(db: &DatabaseConnection, id: Uuid) -> Result<Inspection, DbErr> {
    let model = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("Inspection with id '{id}' not found")))?;

    let mut names = inspector_names(db, vec![model.inspector_id]).await?;
    let mut cars = car_numbers(db, vec![model.id]).await?;

    let inspector_id = model.inspector_id;
    let mut inspection: Inspection = model.into();
    inspection.inspector_name = names.remove(&inspector_id);
    inspection.car_number = cars.remove(&id);
    Ok(inspection)
}

async fn get_all_inspections(
    db: &DatabaseConnection,
    condition: &sea_orm::Condition,
    order_column: Column,
    order_direction: sea_orm::Order,
    offset: u64,
    limit: u64,
) -> Result<Vec<InspectionList>, DbErr> {
    let models = Entity::find()
        .filter(condition.clone())
        .order_by(order_column, order_direction)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await?;

    let names = inspector_names(db, models.iter().map(|m| m.inspector_id).collect()).await?;
    let cars = car_numbers(db, models.iter().map(|m| m.id).collect()).await?;

    Ok(models
        .into_iter()
        .map(|model| {
            let inspector_name = names.get(&model.inspector_id).cloned();
            let car_number = cars.get(&model.id).cloned();
            let mut item = InspectionList::from(model);
            item.inspector_name = inspector_name;
            item.car_number = car_number;
            item
        })
        .collect())
}
