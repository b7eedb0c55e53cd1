use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// (table, column) pairs that are filtered or joined on by the API
const INDEXED_COLUMNS: &[(&str, &str)] = &[
    ("inspections", "inspection_date"),
    ("inspections", "inspector_id"),
    ("inspections", "job_number"),
    ("mushroom_storage", "inspection_id"),
    ("mushroom_storage", "thermometer_id"),
    ("product_markings", "inspection_id"),
    ("quantity_inspections", "inspection_id"),
    ("quantity_inspections", "scale_id"),
    ("boxes", "quantity_inspection_id"),
    ("quality_inspections", "inspection_id"),
    ("diameter_measurements", "inspection_id"),
    ("pallets", "inspection_id"),
    ("product_loadings", "inspection_id"),
    ("product_loadings", "thermometer_id"),
    ("photos", "inspection_id"),
    ("photos", "section"),
];

fn index_name(table: &str, column: &str) -> String {
    format!("idx_{table}_{column}")
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (table, column) in INDEXED_COLUMNS {
            manager
                .create_index(
                    Index::create()
                        .name(index_name(table, column))
                        .table(Alias::new(*table))
                        .col(Alias::new(*column))
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }

        // Section rows are always read back in submission order
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Postgres {
            manager
                .get_connection()
                .execute_unprepared(
                    "CREATE INDEX IF NOT EXISTS idx_boxes_order ON boxes (quantity_inspection_id, position)",
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Postgres {
            manager
                .get_connection()
                .execute_unprepared("DROP INDEX IF EXISTS idx_boxes_order")
                .await?;
        }

        for (table, column) in INDEXED_COLUMNS {
            manager
                .drop_index(
                    Index::drop()
                        .name(index_name(table, column))
                        .table(Alias::new(*table))
                        .if_exists()
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }
}
