use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Columns shared by every inspection section table
fn section_table<T>(table: T, name: &str) -> TableCreateStatement
where
    T: Iden + Copy + 'static,
{
    Table::create()
        .table(table)
        .if_not_exists()
        .col(ColumnDef::new(Section::Id).uuid().not_null().primary_key())
        .col(ColumnDef::new(Section::InspectionId).uuid().not_null())
        .col(
            ColumnDef::new(Section::Position)
                .integer()
                .not_null()
                .default(0),
        )
        .col(
            ColumnDef::new(Section::CreatedAt)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{name}_inspection_id"))
                .from(table, Section::InspectionId)
                .to(Inspections::Table, Inspections::Id)
                .on_delete(ForeignKeyAction::Cascade)
                .on_update(ForeignKeyAction::NoAction),
        )
        .to_owned()
}

fn restricted_reference<T, R>(
    name: &str,
    table: T,
    column: Section,
    reference: R,
) -> ForeignKeyCreateStatement
where
    T: Iden + Copy + 'static,
    R: Iden + Copy + 'static,
{
    ForeignKey::create()
        .name(name)
        .from(table, column)
        .to(reference, Section::Id)
        .on_delete(ForeignKeyAction::Restrict)
        .on_update(ForeignKeyAction::NoAction)
        .to_owned()
}

fn photo_owner<R>(name: &str, column: Photos, owner: R) -> ForeignKeyCreateStatement
where
    R: Iden + Copy + 'static,
{
    ForeignKey::create()
        .name(format!("fk_photos_{name}_id"))
        .from(Photos::Table, column)
        .to(owner, Section::Id)
        .on_delete(ForeignKeyAction::Cascade)
        .on_update(ForeignKeyAction::NoAction)
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    #[allow(clippy::too_many_lines)]
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Users (inspectors, managers, administrators)
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Users::Username)
                            .string_len(150)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(
                        ColumnDef::new(Users::FirstName)
                            .string_len(150)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Users::LastName)
                            .string_len(150)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Users::Role).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Reference instruments
        manager
            .create_table(
                Table::create()
                    .table(Thermometers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Thermometers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Thermometers::Info).string_len(255).not_null())
                    .col(ColumnDef::new(Thermometers::Serial).string_len(100))
                    .col(ColumnDef::new(Thermometers::CalibrationDate).date())
                    .col(
                        ColumnDef::new(Thermometers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Scales::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Scales::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Scales::Model).string_len(100).not_null())
                    .col(ColumnDef::new(Scales::SerialNumber).string_len(100))
                    .col(ColumnDef::new(Scales::CalibrationDate).date())
                    .col(
                        ColumnDef::new(Scales::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Inspections
        manager
            .create_table(
                Table::create()
                    .table(Inspections::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Inspections::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Inspections::InspectionDate).date().not_null())
                    .col(ColumnDef::new(Inspections::InspectorId).uuid().not_null())
                    .col(ColumnDef::new(Inspections::JobNumber).string_len(30))
                    .col(
                        ColumnDef::new(Inspections::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Inspections::LastUpdated)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inspections_inspector_id")
                            .from(Inspections::Table, Inspections::InspectorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        // 1. Placement
        let mut storage = section_table(MushroomStorage::Table, "mushroom_storage");
        storage
            .col(
                ColumnDef::new(MushroomStorage::QuantityOfBoxes)
                    .integer()
                    .not_null(),
            )
            .col(
                ColumnDef::new(MushroomStorage::QuantityOfPallets)
                    .integer()
                    .not_null(),
            )
            .col(
                ColumnDef::new(MushroomStorage::TemperatureInFridge)
                    .decimal_len(6, 2)
                    .not_null(),
            )
            .col(
                ColumnDef::new(MushroomStorage::MushroomTemperatureMin)
                    .decimal_len(6, 2)
                    .not_null(),
            )
            .col(
                ColumnDef::new(MushroomStorage::MushroomTemperatureMax)
                    .decimal_len(6, 2)
                    .not_null(),
            )
            .col(ColumnDef::new(Section::ThermometerId).uuid())
            .col(ColumnDef::new(MushroomStorage::InvoiceNumber).string_len(100))
            .foreign_key(&mut restricted_reference(
                "fk_mushroom_storage_thermometer_id",
                MushroomStorage::Table,
                Section::ThermometerId,
                Thermometers::Table,
            ));
        manager.create_table(storage).await?;

        // 2. Marking
        manager
            .create_table(section_table(ProductMarkings::Table, "product_markings"))
            .await?;

        // 3. Quantity
        let mut quantity = section_table(QuantityInspections::Table, "quantity_inspections");
        quantity
            .col(ColumnDef::new(Section::ScaleId).uuid())
            .foreign_key(&mut restricted_reference(
                "fk_quantity_inspections_scale_id",
                QuantityInspections::Table,
                Section::ScaleId,
                Scales::Table,
            ));
        manager.create_table(quantity).await?;

        manager
            .create_table(
                Table::create()
                    .table(Boxes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Boxes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Boxes::QuantityInspectionId).uuid().not_null())
                    .col(ColumnDef::new(Boxes::Position).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Boxes::GrossWeight)
                            .decimal_len(10, 3)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Boxes::PalletWeight)
                            .decimal_len(10, 3)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Boxes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_boxes_quantity_inspection_id")
                            .from(Boxes::Table, Boxes::QuantityInspectionId)
                            .to(QuantityInspections::Table, Section::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        // 4. Quality
        let mut quality = section_table(QualityInspections::Table, "quality_inspections");
        quality
            .col(ColumnDef::new(QualityInspections::SampleMassKg).decimal_len(8, 3))
            .col(ColumnDef::new(QualityInspections::ConformsToDeclaredGrade).decimal_len(8, 3))
            .col(ColumnDef::new(QualityInspections::OffGradeMassKg50).decimal_len(8, 3))
            .col(ColumnDef::new(QualityInspections::OffGradeMassKg70).decimal_len(8, 3));
        manager.create_table(quality).await?;

        // 5. Diameter
        let mut diameter = section_table(DiameterMeasurements::Table, "diameter_measurements");
        diameter
            .col(ColumnDef::new(DiameterMeasurements::AverageDiameter).decimal_len(8, 2))
            .col(ColumnDef::new(DiameterMeasurements::Notes).text());
        manager.create_table(diameter).await?;

        // 6. Pallets
        manager
            .create_table(section_table(Pallets::Table, "pallets"))
            .await?;

        // 7. Loading
        let mut loading = section_table(ProductLoadings::Table, "product_loadings");
        loading
            .col(ColumnDef::new(ProductLoadings::MushroomTemperature).decimal_len(6, 2))
            .col(ColumnDef::new(Section::ThermometerId).uuid())
            .col(ColumnDef::new(ProductLoadings::CarNumber).string_len(20))
            .col(ColumnDef::new(ProductLoadings::RefrigeratorNumber).string_len(20))
            .col(ColumnDef::new(ProductLoadings::SealNumber).string_len(50))
            .col(ColumnDef::new(ProductLoadings::TransportTemperature).decimal_len(6, 2))
            .foreign_key(&mut restricted_reference(
                "fk_product_loadings_thermometer_id",
                ProductLoadings::Table,
                Section::ThermometerId,
                Thermometers::Table,
            ));
        manager.create_table(loading).await?;

        // Photos: exactly one owner column is set, matching `section`
        let mut photos = Table::create()
            .table(Photos::Table)
            .if_not_exists()
            .col(ColumnDef::new(Photos::Id).uuid().not_null().primary_key())
            .col(ColumnDef::new(Photos::InspectionId).uuid().not_null())
            .col(ColumnDef::new(Photos::Section).string_len(32).not_null())
            .col(ColumnDef::new(Photos::StorageId).uuid())
            .col(ColumnDef::new(Photos::MarkingId).uuid())
            .col(ColumnDef::new(Photos::QuantityInspectionId).uuid())
            .col(ColumnDef::new(Photos::QualityInspectionId).uuid())
            .col(ColumnDef::new(Photos::DiameterMeasurementId).uuid())
            .col(ColumnDef::new(Photos::PalletId).uuid())
            .col(ColumnDef::new(Photos::LoadingId).uuid())
            .col(ColumnDef::new(Photos::OriginalFilename).string().not_null())
            .col(ColumnDef::new(Photos::StorageKey).string().not_null())
            .col(ColumnDef::new(Photos::SizeBytes).big_integer().not_null())
            .col(
                ColumnDef::new(Photos::UploadedAt)
                    .timestamp_with_time_zone()
                    .not_null()
                    .default(Expr::current_timestamp()),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_photos_inspection_id")
                    .from(Photos::Table, Photos::InspectionId)
                    .to(Inspections::Table, Inspections::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .on_update(ForeignKeyAction::NoAction),
            )
            .to_owned();

        photos
            .foreign_key(&mut photo_owner("storage", Photos::StorageId, MushroomStorage::Table))
            .foreign_key(&mut photo_owner("marking", Photos::MarkingId, ProductMarkings::Table))
            .foreign_key(&mut photo_owner(
                "quantity_inspection",
                Photos::QuantityInspectionId,
                QuantityInspections::Table,
            ))
            .foreign_key(&mut photo_owner(
                "quality_inspection",
                Photos::QualityInspectionId,
                QualityInspections::Table,
            ))
            .foreign_key(&mut photo_owner(
                "diameter_measurement",
                Photos::DiameterMeasurementId,
                DiameterMeasurements::Table,
            ))
            .foreign_key(&mut photo_owner("pallet", Photos::PalletId, Pallets::Table))
            .foreign_key(&mut photo_owner("loading", Photos::LoadingId, ProductLoadings::Table));
        manager.create_table(photos).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            "photos",
            "product_loadings",
            "pallets",
            "diameter_measurements",
            "quality_inspections",
            "boxes",
            "quantity_inspections",
            "product_markings",
            "mushroom_storage",
            "inspections",
            "scales",
            "thermometers",
            "users",
        ] {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum Section {
    Id,
    InspectionId,
    Position,
    CreatedAt,
    ThermometerId,
    ScaleId,
}

#[derive(DeriveIden, Clone, Copy)]
enum Users {
    Table,
    Id,
    Username,
    PasswordHash,
    FirstName,
    LastName,
    Role,
    CreatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum Thermometers {
    Table,
    Id,
    Info,
    Serial,
    CalibrationDate,
    CreatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum Scales {
    Table,
    Id,
    Model,
    SerialNumber,
    CalibrationDate,
    CreatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum Inspections {
    Table,
    Id,
    InspectionDate,
    InspectorId,
    JobNumber,
    CreatedAt,
    LastUpdated,
}

#[derive(DeriveIden, Clone, Copy)]
enum MushroomStorage {
    #[sea_orm(iden = "mushroom_storage")]
    Table,
    QuantityOfBoxes,
    QuantityOfPallets,
    TemperatureInFridge,
    MushroomTemperatureMin,
    MushroomTemperatureMax,
    InvoiceNumber,
}

#[derive(DeriveIden, Clone, Copy)]
enum ProductMarkings {
    Table,
}

#[derive(DeriveIden, Clone, Copy)]
enum QuantityInspections {
    Table,
}

#[derive(DeriveIden, Clone, Copy)]
enum Boxes {
    Table,
    Id,
    QuantityInspectionId,
    Position,
    GrossWeight,
    PalletWeight,
    CreatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum QualityInspections {
    Table,
    SampleMassKg,
    ConformsToDeclaredGrade,
    #[sea_orm(iden = "off_grade_mass_kg_50")]
    OffGradeMassKg50,
    #[sea_orm(iden = "off_grade_mass_kg_70")]
    OffGradeMassKg70,
}

#[derive(DeriveIden, Clone, Copy)]
enum DiameterMeasurements {
    Table,
    AverageDiameter,
    Notes,
}

#[derive(DeriveIden, Clone, Copy)]
enum Pallets {
    Table,
}

#[derive(DeriveIden, Clone, Copy)]
enum ProductLoadings {
    Table,
    MushroomTemperature,
    CarNumber,
    RefrigeratorNumber,
    SealNumber,
    TransportTemperature,
}

#[derive(DeriveIden, Clone, Copy)]
enum Photos {
    Table,
    Id,
    InspectionId,
    Section,
    StorageId,
    MarkingId,
    QuantityInspectionId,
    QualityInspectionId,
    DiameterMeasurementId,
    PalletId,
    LoadingId,
    OriginalFilename,
    StorageKey,
    SizeBytes,
    UploadedAt,
}
