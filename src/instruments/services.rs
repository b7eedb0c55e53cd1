use crate::common::errors::{BusinessError, BusinessResult, DbErrorExt};
use crate::inspections::{loading::models as loading, quantity::models as quantity, storage::models as storage};
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

/// Instruments that sections refer to and that must outlive those references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instrument {
    Thermometer,
    Scale,
}

impl Instrument {
    pub fn resource(self) -> &'static str {
        match self {
            Instrument::Thermometer => "thermometer",
            Instrument::Scale => "scale",
        }
    }
}

/// Number of section rows pointing at the instrument
pub async fn count_references(
    db: &DatabaseConnection,
    instrument: Instrument,
    id: Uuid,
) -> BusinessResult<u64> {
    let db_error = |e: DbErr| e.to_business_error(instrument.resource());
    match instrument {
        Instrument::Thermometer => {
            let placements = storage::Entity::find()
                .filter(storage::Column::ThermometerId.eq(id))
                .count(db)
                .await
                .map_err(db_error)?;
            let loadings = loading::Entity::find()
                .filter(loading::Column::ThermometerId.eq(id))
                .count(db)
                .await
                .map_err(db_error)?;
            Ok(placements + loadings)
        }
        Instrument::Scale => quantity::Entity::find()
            .filter(quantity::Column::ScaleId.eq(id))
            .count(db)
            .await
            .map_err(db_error),
    }
}

/// Fails with a conflict while any section still uses the instrument
pub async fn ensure_unreferenced(
    db: &DatabaseConnection,
    instrument: Instrument,
    id: Uuid,
) -> BusinessResult<()> {
    let references = count_references(db, instrument, id).await?;
    if references > 0 {
        tracing::warn!(
            instrument = instrument.resource(),
            id = %id,
            references,
            "Refused to delete referenced instrument"
        );
        return Err(BusinessError::Conflict {
            resource: instrument.resource().to_string(),
            message: format!("used by {references} inspection section(s)"),
        });
    }
    Ok(())
}
