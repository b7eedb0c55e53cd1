use sea_orm::Iterable;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The seven inspection stages, in report order
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    #[sea_orm(string_value = "placement")]
    Placement,
    #[sea_orm(string_value = "marking")]
    Marking,
    #[sea_orm(string_value = "quantity")]
    Quantity,
    #[sea_orm(string_value = "quality")]
    Quality,
    #[sea_orm(string_value = "diameter")]
    Diameter,
    #[sea_orm(string_value = "pallets")]
    Pallets,
    #[sea_orm(string_value = "loading")]
    Loading,
}

impl SectionKind {
    /// Prefix used by the flattened multipart keys, e.g. `mushroom_storage[0].quantity_of_boxes`
    pub fn form_name(self) -> &'static str {
        match self {
            SectionKind::Placement => "mushroom_storage",
            SectionKind::Marking => "marking_zips",
            SectionKind::Quantity => "quantity_inspections",
            SectionKind::Quality => "quality_inspections",
            SectionKind::Diameter => "diameter_measurements",
            SectionKind::Pallets => "pallets",
            SectionKind::Loading => "product_loading",
        }
    }

    pub fn from_form_name(name: &str) -> Option<Self> {
        Self::iter().find(|kind| kind.form_name() == name)
    }

    /// Directory under a submission's photo folder
    pub fn storage_dir(self) -> &'static str {
        match self {
            SectionKind::Placement => "placement",
            SectionKind::Marking => "marking",
            SectionKind::Quantity => "quantity_inspection",
            SectionKind::Quality => "quality_inspection",
            SectionKind::Diameter => "diameter",
            SectionKind::Pallets => "pallets",
            SectionKind::Loading => "loading",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::Placement => "placement",
            SectionKind::Marking => "marking",
            SectionKind::Quantity => "quantity",
            SectionKind::Quality => "quality",
            SectionKind::Diameter => "diameter",
            SectionKind::Pallets => "pallets",
            SectionKind::Loading => "loading",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
