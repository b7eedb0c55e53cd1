use super::data::ReportData;
use crate::common::errors::BusinessError;
use crate::inspections::sections::SectionKind;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

/// Empty boxes and cardboard packaging on one pallet, kg
pub const PACKAGING_WEIGHT_KG: Decimal = Decimal::from_parts(366, 0, 0, false, 1);

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Inspection '{0}' not found")]
    InspectionNotFound(Uuid),
    #[error("The report needs a {section} section")]
    MissingSection { section: SectionKind },
    #[error("The report needs '{field}' of the {section} section: {reason}")]
    MissingField {
        section: SectionKind,
        field: &'static str,
        reason: &'static str,
    },
    #[error("Photo '{photo}' cannot be embedded: {message}")]
    InvalidImage { photo: String, message: String },
    #[error("Could not render the report: {0}")]
    Render(String),
}

impl From<ReportError> for BusinessError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::InspectionNotFound(id) => BusinessError::NotFound {
                resource: "inspection".to_string(),
                id: id.to_string(),
            },
            ReportError::MissingSection { .. } | ReportError::MissingField { .. } => {
                BusinessError::BusinessRuleViolation {
                    rule: "report_required_data".to_string(),
                    message: err.to_string(),
                }
            }
            ReportError::InvalidImage { .. } => BusinessError::BusinessRuleViolation {
                rule: "report_photo".to_string(),
                message: err.to_string(),
            },
            ReportError::Render(message) => BusinessError::InternalError { message },
        }
    }
}

/// Mass of the combined sample and its share of the whole sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Share {
    pub mass: Decimal,
    pub percent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalletRow {
    pub gross: Decimal,
    pub pallet: Decimal,
    pub boxes: i32,
    pub net: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PalletTotals {
    pub gross: Decimal,
    pub pallet: Decimal,
    pub boxes: i64,
    pub net: Decimal,
}

/// Derived numbers printed in the report
#[derive(Debug, Clone)]
pub struct ReportFigures {
    pub boxes: i32,
    pub pallets: i32,
    pub boxes_per_pallet: Decimal,
    pub sample_mass: Decimal,
    pub conforming: Share,
    pub nonconforming: Share,
    pub under_50: Option<Share>,
    pub over_70: Option<Share>,
    pub rows: Vec<PalletRow>,
    pub totals: PalletTotals,
}

pub fn net_weight(gross: Decimal, pallet: Decimal) -> Decimal {
    gross - pallet - PACKAGING_WEIGHT_KG
}

/// `part / whole * 100`, rounded half away from zero to 2 places
pub fn percent(part: Decimal, whole: Decimal) -> Decimal {
    (part / whole * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn share(mass: Decimal, sample: Decimal) -> Share {
    Share {
        mass,
        percent: percent(mass, sample),
    }
}

/// Off-grade share, only when a non-zero mass was recorded
fn off_grade(mass: Option<Decimal>, sample: Decimal) -> Option<Share> {
    mass.filter(|mass| !mass.is_zero())
        .map(|mass| share(mass, sample))
}

impl ReportFigures {
    pub fn compute(data: &ReportData) -> Result<Self, ReportError> {
        let storage = data.storage.as_ref().ok_or(ReportError::MissingSection {
            section: SectionKind::Placement,
        })?;
        if storage.quantity_of_pallets <= 0 {
            return Err(ReportError::MissingField {
                section: SectionKind::Placement,
                field: "quantity_of_pallets",
                reason: "must be greater than zero",
            });
        }
        if data.quantity.is_none() {
            return Err(ReportError::MissingSection {
                section: SectionKind::Quantity,
            });
        }
        let quality = data.quality.as_ref().ok_or(ReportError::MissingSection {
            section: SectionKind::Quality,
        })?;
        let sample_mass = quality
            .sample_mass_kg
            .filter(|mass| mass.is_sign_positive() && !mass.is_zero())
            .ok_or(ReportError::MissingField {
                section: SectionKind::Quality,
                field: "sample_mass_kg",
                reason: "must be recorded and greater than zero",
            })?;
        let conforms = quality
            .conforms_to_declared_grade
            .ok_or(ReportError::MissingField {
                section: SectionKind::Quality,
                field: "conforms_to_declared_grade",
                reason: "must be recorded",
            })?;

        let boxes = storage.quantity_of_boxes;
        let pallets = storage.quantity_of_pallets;
        let boxes_per_pallet = Decimal::from(boxes) / Decimal::from(pallets);
        let whole_boxes = boxes / pallets;

        let rows: Vec<PalletRow> = data
            .boxes
            .iter()
            .map(|weighed| PalletRow {
                gross: weighed.gross_weight,
                pallet: weighed.pallet_weight,
                boxes: whole_boxes,
                net: net_weight(weighed.gross_weight, weighed.pallet_weight),
            })
            .collect();

        let totals = rows.iter().fold(PalletTotals::default(), |mut totals, row| {
            totals.gross += row.gross;
            totals.pallet += row.pallet;
            totals.boxes += i64::from(row.boxes);
            totals.net += row.net;
            totals
        });

        Ok(Self {
            boxes,
            pallets,
            boxes_per_pallet: boxes_per_pallet.round_dp(2).normalize(),
            sample_mass,
            conforming: share(conforms, sample_mass),
            nonconforming: share(sample_mass - conforms, sample_mass),
            under_50: off_grade(quality.off_grade_mass_kg_50, sample_mass),
            over_70: off_grade(quality.off_grade_mass_kg_70, sample_mass),
            rows,
            totals,
        })
    }
}
