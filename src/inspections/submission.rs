//! Decoding of the composite inspection submission.
//!
//! Multipart clients flatten the nested inspection into keys such as
//! `mushroom_storage[0].quantity_of_boxes` or
//! `quantity_inspections[1].boxes[3].gross_weight`, with archives sent as file
//! parts under `<section>[<index>].zip_photos`. Every key is parsed once into a
//! [`FormKey`], grouped by section and index, and then converted into the typed
//! [`FullInspectionSubmission`]. Problems are collected per flattened key so the
//! caller receives every field error at once.

use super::sections::SectionKind;
use crate::common::errors::FieldErrors;
use crate::common::multipart::{MultipartForm, UploadedFile};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

const ARCHIVE_FIELD: &str = "zip_photos";
const ROOT_FIELDS: [&str; 4] = ["inspection_date", "inspector", "job_number", "quantity_inspections"];
const JOB_NUMBER_MAX: usize = 30;

/// Where a flattened key points inside the nested submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormKey {
    Root(String),
    Section {
        section: SectionKind,
        index: usize,
        field: String,
    },
    Box {
        item: usize,
        index: usize,
        field: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("unknown section '{0}'")]
    UnknownSection(String),
    #[error("malformed key, expected section[index].field")]
    Malformed,
    #[error("index '{0}' is not a non-negative integer")]
    BadIndex(String),
}

/// Splits `name[index]` into its parts
fn indexed(segment: &str) -> Result<Option<(&str, usize)>, KeyError> {
    let Some(open) = segment.find('[') else {
        return Ok(None);
    };
    let raw = segment[open + 1..]
        .strip_suffix(']')
        .ok_or(KeyError::Malformed)?;
    let index = raw
        .parse::<usize>()
        .map_err(|_| KeyError::BadIndex(raw.to_string()))?;
    Ok(Some((&segment[..open], index)))
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FormKey {
    /// Parses `field`, `section[i].field` or `quantity_inspections[i].boxes[n].field`
    pub fn parse(key: &str) -> Result<Self, KeyError> {
        let mut segments = key.split('.');
        let head = segments.next().unwrap_or_default();

        let Some((name, index)) = indexed(head)? else {
            if key.contains('.') || !is_field_name(key) {
                return Err(KeyError::Malformed);
            }
            return Ok(FormKey::Root(key.to_string()));
        };
        let section =
            SectionKind::from_form_name(name).ok_or_else(|| KeyError::UnknownSection(name.to_string()))?;

        match (segments.next(), segments.next(), segments.next()) {
            (Some(field), None, None) if is_field_name(field) => Ok(FormKey::Section {
                section,
                index,
                field: field.to_string(),
            }),
            (Some(nested), Some(field), None) if section == SectionKind::Quantity => {
                match indexed(nested)? {
                    Some(("boxes", box_index)) if is_field_name(field) => Ok(FormKey::Box {
                        item: index,
                        index: box_index,
                        field: field.to_string(),
                    }),
                    _ => Err(KeyError::Malformed),
                }
            }
            _ => Err(KeyError::Malformed),
        }
    }
}

/// Collects field errors keyed by their flattened form key
#[derive(Debug, Default)]
pub struct ErrorSink(FieldErrors);

impl ErrorSink {
    pub fn push(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(message.into());
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.0.is_empty() { Ok(()) } else { Err(self.0) }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageItem {
    pub quantity_of_boxes: i32,
    pub quantity_of_pallets: i32,
    pub temperature_in_fridge: Decimal,
    pub mushroom_temperature_min: Decimal,
    pub mushroom_temperature_max: Decimal,
    #[serde(default)]
    pub thermometer: Option<Uuid>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(skip)]
    pub archive: Option<UploadedFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkingItem {
    #[serde(skip)]
    pub archive: Option<UploadedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BoxItem {
    #[serde(alias = "net_weight")]
    pub gross_weight: Decimal,
    #[serde(alias = "defect_weight")]
    pub pallet_weight: Decimal,
}

/// How a quantity item names its scale
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaleChoice {
    Existing(Uuid),
    Described {
        model: String,
        serial_number: Option<String>,
        calibration_date: Option<NaiveDate>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuantityItem {
    #[serde(default)]
    pub scale: Option<Uuid>,
    #[serde(default)]
    pub scale_model: Option<String>,
    #[serde(default)]
    pub scale_serial_number: Option<String>,
    #[serde(default)]
    pub scale_calibration_date: Option<NaiveDate>,
    #[serde(default)]
    pub boxes: Vec<BoxItem>,
    #[serde(skip)]
    pub archive: Option<UploadedFile>,
}

impl QuantityItem {
    fn is_scale_described(&self) -> bool {
        self.scale_model.is_some()
            || self.scale_serial_number.is_some()
            || self.scale_calibration_date.is_some()
    }

    pub fn scale_choice(&self) -> Option<ScaleChoice> {
        if let Some(id) = self.scale {
            return Some(ScaleChoice::Existing(id));
        }
        self.is_scale_described().then(|| ScaleChoice::Described {
            model: self.scale_model.clone().unwrap_or_default(),
            serial_number: self.scale_serial_number.clone(),
            calibration_date: self.scale_calibration_date,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QualityItem {
    #[serde(default)]
    pub sample_mass_kg: Option<Decimal>,
    #[serde(default)]
    pub conforms_to_declared_grade: Option<Decimal>,
    #[serde(default)]
    pub off_grade_mass_kg_50: Option<Decimal>,
    #[serde(default)]
    pub off_grade_mass_kg_70: Option<Decimal>,
    #[serde(skip)]
    pub archive: Option<UploadedFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiameterItem {
    #[serde(default)]
    pub average_diameter: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(skip)]
    pub archive: Option<UploadedFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PalletItem {
    #[serde(skip)]
    pub archive: Option<UploadedFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadingItem {
    #[serde(default)]
    pub mushroom_temperature: Option<Decimal>,
    #[serde(default)]
    pub car_number: Option<String>,
    #[serde(default)]
    pub refrigerator_number: Option<String>,
    #[serde(default)]
    pub seal_number: Option<String>,
    #[serde(default)]
    pub transport_temperature: Option<Decimal>,
    #[serde(default)]
    pub thermometer: Option<Uuid>,
    #[serde(skip)]
    pub archive: Option<UploadedFile>,
}

/// A complete inspection with all of its sections, ready to persist
#[derive(Debug, Clone, Deserialize)]
pub struct FullInspectionSubmission {
    pub inspection_date: NaiveDate,
    pub inspector: Uuid,
    #[serde(default)]
    pub job_number: Option<String>,
    #[serde(default)]
    pub mushroom_storage: Vec<StorageItem>,
    #[serde(default)]
    pub marking_zips: Vec<MarkingItem>,
    #[serde(default)]
    pub quantity_inspections: Vec<QuantityItem>,
    #[serde(default)]
    pub quality_inspections: Vec<QualityItem>,
    #[serde(default)]
    pub diameter_measurements: Vec<DiameterItem>,
    #[serde(default)]
    pub pallets: Vec<PalletItem>,
    #[serde(default)]
    pub product_loading: Vec<LoadingItem>,
}

fn item_key(section: SectionKind, index: usize, field: &str) -> String {
    format!("{}[{index}].{field}", section.form_name())
}

fn non_negative(errors: &mut ErrorSink, key: String, value: Decimal) {
    if value.is_sign_negative() && !value.is_zero() {
        errors.push(key, "must not be negative");
    }
}

impl FullInspectionSubmission {
    /// Rules that hold for both multipart and JSON submissions
    pub fn check(&self) -> Result<(), FieldErrors> {
        let mut errors = ErrorSink::default();

        if let Some(job_number) = &self.job_number {
            if job_number.chars().count() > JOB_NUMBER_MAX {
                errors.push(
                    "job_number",
                    format!("must be at most {JOB_NUMBER_MAX} characters"),
                );
            }
        }

        if self.mushroom_storage.is_empty() {
            errors.push(
                SectionKind::Placement.form_name(),
                "at least one placement item is required",
            );
        }
        for (i, item) in self.mushroom_storage.iter().enumerate() {
            for (field, value) in [
                ("quantity_of_boxes", item.quantity_of_boxes),
                ("quantity_of_pallets", item.quantity_of_pallets),
            ] {
                if value < 0 {
                    errors.push(item_key(SectionKind::Placement, i, field), "must not be negative");
                }
            }
            if item.mushroom_temperature_min > item.mushroom_temperature_max {
                errors.push(
                    item_key(SectionKind::Placement, i, "mushroom_temperature_min"),
                    "must not exceed mushroom_temperature_max",
                );
            }
        }

        for (i, item) in self.quantity_inspections.iter().enumerate() {
            if item.scale.is_some() && item.is_scale_described() {
                errors.push(
                    item_key(SectionKind::Quantity, i, "scale"),
                    "give either a scale id or scale_model/scale_serial_number/scale_calibration_date",
                );
            }
            for (n, weighed) in item.boxes.iter().enumerate() {
                let prefix = format!("{}[{i}].boxes[{n}]", SectionKind::Quantity.form_name());
                non_negative(&mut errors, format!("{prefix}.gross_weight"), weighed.gross_weight);
                non_negative(&mut errors, format!("{prefix}.pallet_weight"), weighed.pallet_weight);
                if weighed.pallet_weight > weighed.gross_weight {
                    errors.push(
                        format!("{prefix}.pallet_weight"),
                        "must not exceed gross_weight",
                    );
                }
            }
        }

        for (i, item) in self.quality_inspections.iter().enumerate() {
            for (field, value) in [
                ("sample_mass_kg", item.sample_mass_kg),
                ("conforms_to_declared_grade", item.conforms_to_declared_grade),
                ("off_grade_mass_kg_50", item.off_grade_mass_kg_50),
                ("off_grade_mass_kg_70", item.off_grade_mass_kg_70),
            ] {
                if let Some(value) = value {
                    non_negative(&mut errors, item_key(SectionKind::Quality, i, field), value);
                }
            }
            if let (Some(sample), Some(conforms)) =
                (item.sample_mass_kg, item.conforms_to_declared_grade)
            {
                if conforms > sample {
                    errors.push(
                        item_key(SectionKind::Quality, i, "conforms_to_declared_grade"),
                        "must not exceed sample_mass_kg",
                    );
                }
            }
        }

        errors.into_result()
    }

    /// Moves the attached archives out, with the section and item they belong to
    pub fn take_archives(&mut self) -> Vec<(SectionKind, usize, UploadedFile)> {
        fn collect<T>(
            out: &mut Vec<(SectionKind, usize, UploadedFile)>,
            section: SectionKind,
            items: &mut [T],
            archive: impl Fn(&mut T) -> &mut Option<UploadedFile>,
        ) {
            for (i, item) in items.iter_mut().enumerate() {
                if let Some(file) = archive(item).take() {
                    out.push((section, i, file));
                }
            }
        }

        let mut archives = Vec::new();
        collect(&mut archives, SectionKind::Placement, &mut self.mushroom_storage, |i| &mut i.archive);
        collect(&mut archives, SectionKind::Marking, &mut self.marking_zips, |i| &mut i.archive);
        collect(&mut archives, SectionKind::Quantity, &mut self.quantity_inspections, |i| &mut i.archive);
        collect(&mut archives, SectionKind::Quality, &mut self.quality_inspections, |i| &mut i.archive);
        collect(&mut archives, SectionKind::Diameter, &mut self.diameter_measurements, |i| &mut i.archive);
        collect(&mut archives, SectionKind::Pallets, &mut self.pallets, |i| &mut i.archive);
        collect(&mut archives, SectionKind::Loading, &mut self.product_loading, |i| &mut i.archive);
        archives
    }
}

/// Scalar fields and archive of one `section[index]` group
#[derive(Debug, Default)]
struct RawItem {
    fields: BTreeMap<String, String>,
    boxes: BTreeMap<usize, BTreeMap<String, String>>,
    archive: Option<UploadedFile>,
}

/// Reads typed values out of one raw item, recording problems under flattened keys
struct ItemReader<'a> {
    prefix: String,
    item: &'a mut RawItem,
    errors: &'a mut ErrorSink,
}

impl ItemReader<'_> {
    fn key(&self, field: &str) -> String {
        format!("{}.{field}", self.prefix)
    }

    /// Takes a value, treating blank input as absent
    fn take(&mut self, field: &str) -> Option<String> {
        self.item
            .fields
            .remove(field)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parsed<T>(&mut self, field: &str, expected: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let raw = self.take(field)?;
        let value = parse(&raw);
        if value.is_none() {
            let key = self.key(field);
            self.errors.push(key, format!("must be {expected}, got '{raw}'"));
        }
        value
    }

    fn required<T>(&mut self, field: &str, value: Option<T>) -> T
    where
        T: Default,
    {
        let key = self.key(field);
        match value {
            Some(value) => value,
            None => {
                if !self.errors.0.contains_key(&key) {
                    self.errors.push(key, "this field is required");
                }
                T::default()
            }
        }
    }

    fn decimal(&mut self, field: &str) -> Option<Decimal> {
        self.parsed(field, "a decimal number", parse_decimal)
    }

    fn required_decimal(&mut self, field: &str) -> Decimal {
        let value = self.decimal(field);
        self.required(field, value)
    }

    fn required_count(&mut self, field: &str) -> i32 {
        let value = self.parsed(field, "a non-negative integer", |raw| {
            raw.parse::<i32>().ok().filter(|count| *count >= 0)
        });
        self.required(field, value)
    }

    fn uuid(&mut self, field: &str) -> Option<Uuid> {
        self.parsed(field, "a UUID", |raw| Uuid::parse_str(raw).ok())
    }

    fn date(&mut self, field: &str) -> Option<NaiveDate> {
        self.parsed(field, "a date in YYYY-MM-DD format", parse_date)
    }

    fn text(&mut self, field: &str) -> Option<String> {
        self.take(field)
    }

    fn archive(&mut self, required: bool) -> Option<UploadedFile> {
        let archive = self.item.archive.take();
        if required && archive.is_none() {
            let key = self.key(ARCHIVE_FIELD);
            self.errors.push(key, "an archive of photos is required");
        }
        archive
    }

    /// Anything left over is not part of the section's field set
    fn finish(self) {
        for field in self.item.fields.keys() {
            self.errors.push(format!("{}.{field}", self.prefix), "unknown field");
        }
        for (index, fields) in &self.item.boxes {
            for field in fields.keys() {
                self.errors.push(
                    format!("{}.boxes[{index}].{field}", self.prefix),
                    "unknown field",
                );
            }
        }
    }
}

/// Accepts both `12.5` and `12,5`
fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.replace(',', ".")).ok()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Indices of a group must run 0, 1, 2, ... without gaps
fn check_contiguous<T>(errors: &mut ErrorSink, prefix: &str, groups: &BTreeMap<usize, T>) {
    for (expected, index) in groups.keys().enumerate() {
        if *index != expected {
            errors.push(
                format!("{prefix}[{index}]"),
                format!("index {index} given but index {expected} is missing"),
            );
            break;
        }
    }
}

fn read_storage(reader: &mut ItemReader<'_>) -> StorageItem {
    StorageItem {
        quantity_of_boxes: reader.required_count("quantity_of_boxes"),
        quantity_of_pallets: reader.required_count("quantity_of_pallets"),
        temperature_in_fridge: reader.required_decimal("temperature_in_fridge"),
        mushroom_temperature_min: reader.required_decimal("mushroom_temperature_min"),
        mushroom_temperature_max: reader.required_decimal("mushroom_temperature_max"),
        thermometer: reader.uuid("thermometer"),
        invoice_number: reader.text("invoice_number"),
        archive: reader.archive(false),
    }
}

fn read_quantity(reader: &mut ItemReader<'_>) -> QuantityItem {
    let scale = reader.uuid("scale");
    let scale_model = reader.text("scale_model");
    let scale_serial_number = reader.text("scale_serial_number");
    let scale_calibration_date = reader.date("scale_calibration_date");

    let box_groups = std::mem::take(&mut reader.item.boxes);
    check_contiguous(reader.errors, &format!("{}.boxes", reader.prefix), &box_groups);

    let mut boxes = Vec::with_capacity(box_groups.len());
    for (index, mut fields) in box_groups {
        let prefix = format!("{}.boxes[{index}]", reader.prefix);
        let mut weight = |errors: &mut ErrorSink, field: &str, alias: &str| {
            let raw = fields
                .remove(field)
                .or_else(|| fields.remove(alias))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty());
            match raw {
                None => {
                    errors.push(format!("{prefix}.{field}"), "this field is required");
                    Decimal::ZERO
                }
                Some(raw) => parse_decimal(&raw).unwrap_or_else(|| {
                    errors.push(
                        format!("{prefix}.{field}"),
                        format!("must be a decimal number, got '{raw}'"),
                    );
                    Decimal::ZERO
                }),
            }
        };
        let gross_weight = weight(reader.errors, "gross_weight", "net_weight");
        let pallet_weight = weight(reader.errors, "pallet_weight", "defect_weight");
        for field in fields.keys() {
            reader.errors.push(format!("{prefix}.{field}"), "unknown field");
        }
        boxes.push(BoxItem {
            gross_weight,
            pallet_weight,
        });
    }

    QuantityItem {
        scale,
        scale_model,
        scale_serial_number,
        scale_calibration_date,
        boxes,
        archive: reader.archive(false),
    }
}

fn read_quality(reader: &mut ItemReader<'_>) -> QualityItem {
    QualityItem {
        sample_mass_kg: reader.decimal("sample_mass_kg"),
        conforms_to_declared_grade: reader.decimal("conforms_to_declared_grade"),
        off_grade_mass_kg_50: reader.decimal("off_grade_mass_kg_50"),
        off_grade_mass_kg_70: reader.decimal("off_grade_mass_kg_70"),
        archive: reader.archive(false),
    }
}

fn read_diameter(reader: &mut ItemReader<'_>) -> DiameterItem {
    DiameterItem {
        average_diameter: reader.decimal("average_diameter"),
        notes: reader.text("notes"),
        archive: reader.archive(false),
    }
}

fn read_loading(reader: &mut ItemReader<'_>) -> LoadingItem {
    LoadingItem {
        mushroom_temperature: reader.decimal("mushroom_temperature"),
        car_number: reader.text("car_number"),
        refrigerator_number: reader.text("refrigerator_number"),
        seal_number: reader.text("seal_number"),
        transport_temperature: reader.decimal("transport_temperature"),
        thermometer: reader.uuid("thermometer"),
        archive: reader.archive(false),
    }
}

/// Runs `read` over every group of a section in index order
fn read_section<T>(
    groups: &mut BTreeMap<SectionKind, BTreeMap<usize, RawItem>>,
    errors: &mut ErrorSink,
    section: SectionKind,
    read: impl Fn(&mut ItemReader<'_>) -> T,
) -> Vec<T> {
    let Some(items) = groups.remove(&section) else {
        return Vec::new();
    };
    check_contiguous(errors, section.form_name(), &items);

    let mut decoded = Vec::with_capacity(items.len());
    for (index, mut item) in items {
        let mut reader = ItemReader {
            prefix: format!("{}[{index}]", section.form_name()),
            item: &mut item,
            errors: &mut *errors,
        };
        decoded.push(read(&mut reader));
        reader.finish();
    }
    decoded
}

/// Rewrites a combined quantity index from [`FullInspectionSubmission::check`]
/// into the key the client actually sent
fn client_quantity_key(key: String, json_items: usize) -> (String, Option<String>) {
    let prefix = format!("{}[", SectionKind::Quantity.form_name());
    let parsed = key
        .strip_prefix(&prefix)
        .and_then(|rest| rest.split_once(']'))
        .and_then(|(index, rest)| Some((index.parse::<usize>().ok()?, rest.to_string())));

    match parsed {
        Some((index, rest)) if index < json_items => (
            SectionKind::Quantity.form_name().to_string(),
            Some(format!("item {index}{rest}")),
        ),
        Some((index, rest)) => (format!("{prefix}{}]{rest}", index - json_items), None),
        None => (key, None),
    }
}

/// Builds the typed submission out of a flattened multipart form
pub fn decode_form(form: MultipartForm) -> Result<FullInspectionSubmission, FieldErrors> {
    let mut errors = ErrorSink::default();
    let mut root: BTreeMap<String, String> = BTreeMap::new();
    let mut groups: BTreeMap<SectionKind, BTreeMap<usize, RawItem>> = BTreeMap::new();

    for (key, value) in form.fields {
        match FormKey::parse(&key) {
            Ok(FormKey::Root(field)) => {
                if !ROOT_FIELDS.contains(&field.as_str()) {
                    errors.push(key, "unknown field");
                } else if root.insert(field, value).is_some() {
                    errors.push(key, "given more than once");
                }
            }
            Ok(FormKey::Section {
                section,
                index,
                field,
            }) => {
                let item = groups.entry(section).or_default().entry(index).or_default();
                if item.fields.insert(field, value).is_some() {
                    errors.push(key, "given more than once");
                }
            }
            Ok(FormKey::Box { item, index, field }) => {
                let fields = groups
                    .entry(SectionKind::Quantity)
                    .or_default()
                    .entry(item)
                    .or_default()
                    .boxes
                    .entry(index)
                    .or_default();
                if fields.insert(field, value).is_some() {
                    errors.push(key, "given more than once");
                }
            }
            Err(err) => errors.push(key, err.to_string()),
        }
    }

    for file in form.files {
        match FormKey::parse(&file.field) {
            Ok(FormKey::Section {
                section,
                index,
                field,
            }) if field == ARCHIVE_FIELD => {
                let item = groups.entry(section).or_default().entry(index).or_default();
                if item.archive.is_some() {
                    errors.push(file.field.clone(), "given more than once");
                }
                item.archive = Some(file);
            }
            Ok(_) => errors.push(file.field, "files are only accepted as section[index].zip_photos"),
            Err(err) => errors.push(file.field, err.to_string()),
        }
    }

    let inspection_date = match root.remove("inspection_date") {
        Some(raw) => parse_date(raw.trim()).unwrap_or_else(|| {
            errors.push("inspection_date", format!("must be a date in YYYY-MM-DD format, got '{raw}'"));
            NaiveDate::default()
        }),
        None => {
            errors.push("inspection_date", "this field is required");
            NaiveDate::default()
        }
    };
    let inspector = match root.remove("inspector") {
        Some(raw) => Uuid::parse_str(raw.trim()).unwrap_or_else(|_| {
            errors.push("inspector", format!("must be a UUID, got '{raw}'"));
            Uuid::nil()
        }),
        None => {
            errors.push("inspector", "this field is required");
            Uuid::nil()
        }
    };
    let job_number = root
        .remove("job_number")
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    // Quantity items sent as a JSON array come before the flattened ones
    let mut quantity_inspections: Vec<QuantityItem> = match root.remove("quantity_inspections") {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw).unwrap_or_else(|e| {
            errors.push("quantity_inspections", format!("invalid JSON: {e}"));
            Vec::new()
        }),
        _ => Vec::new(),
    };
    let json_quantity_count = quantity_inspections.len();

    let mushroom_storage = read_section(&mut groups, &mut errors, SectionKind::Placement, read_storage);
    let marking_zips = read_section(&mut groups, &mut errors, SectionKind::Marking, |reader| {
        MarkingItem {
            archive: reader.archive(true),
        }
    });
    quantity_inspections.extend(read_section(
        &mut groups,
        &mut errors,
        SectionKind::Quantity,
        read_quantity,
    ));
    let quality_inspections = read_section(&mut groups, &mut errors, SectionKind::Quality, read_quality);
    let diameter_measurements =
        read_section(&mut groups, &mut errors, SectionKind::Diameter, read_diameter);
    let pallets = read_section(&mut groups, &mut errors, SectionKind::Pallets, |reader| {
        PalletItem {
            archive: reader.archive(false),
        }
    });
    let product_loading = read_section(&mut groups, &mut errors, SectionKind::Loading, read_loading);

    let submission = FullInspectionSubmission {
        inspection_date,
        inspector,
        job_number,
        mushroom_storage,
        marking_zips,
        quantity_inspections,
        quality_inspections,
        diameter_measurements,
        pallets,
        product_loading,
    };

    if let Err(fields) = submission.check() {
        for (key, messages) in fields {
            let (key, location) = client_quantity_key(key, json_quantity_count);
            for message in messages {
                match &location {
                    Some(location) => errors.push(key.clone(), format!("{location}: {message}")),
                    None => errors.push(key.clone(), message),
                }
            }
        }
    }

    errors.into_result()?;
    Ok(submission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn form(fields: &[(&str, &str)]) -> MultipartForm {
        MultipartForm {
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            files: Vec::new(),
        }
    }

    fn archive(field: &str) -> UploadedFile {
        UploadedFile {
            field: field.to_string(),
            file_name: "photos.zip".to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    fn header_fields() -> Vec<(&'static str, &'static str)> {
        vec![
            ("inspection_date", "2025-03-01"),
            ("inspector", "7a3c7e8e-1f2b-4c1d-9e4f-0a1b2c3d4e5f"),
            ("job_number", "JN-42"),
        ]
    }

    /// Header plus the one placement item every submission needs
    fn root_fields() -> Vec<(&'static str, &'static str)> {
        let mut fields = header_fields();
        fields.extend([
            ("mushroom_storage[0].quantity_of_boxes", "10"),
            ("mushroom_storage[0].quantity_of_pallets", "1"),
            ("mushroom_storage[0].temperature_in_fridge", "2"),
            ("mushroom_storage[0].mushroom_temperature_min", "1"),
            ("mushroom_storage[0].mushroom_temperature_max", "3"),
        ]);
        fields
    }

    #[rstest]
    #[case("job_number", FormKey::Root("job_number".into()))]
    #[case(
        "mushroom_storage[2].quantity_of_boxes",
        FormKey::Section { section: SectionKind::Placement, index: 2, field: "quantity_of_boxes".into() }
    )]
    #[case(
        "quantity_inspections[1].boxes[3].gross_weight",
        FormKey::Box { item: 1, index: 3, field: "gross_weight".into() }
    )]
    #[case(
        "pallets[0].zip_photos",
        FormKey::Section { section: SectionKind::Pallets, index: 0, field: "zip_photos".into() }
    )]
    fn test_key_grammar(#[case] key: &str, #[case] expected: FormKey) {
        assert_eq!(FormKey::parse(key).unwrap(), expected);
    }

    #[rstest]
    #[case("unknown[0].field", KeyError::UnknownSection("unknown".into()))]
    #[case("pallets[x].zip_photos", KeyError::BadIndex("x".into()))]
    #[case("pallets[-1].zip_photos", KeyError::BadIndex("-1".into()))]
    #[case("pallets[0", KeyError::Malformed)]
    #[case("pallets[0]", KeyError::Malformed)]
    #[case("pallets[0].boxes[0].gross_weight", KeyError::Malformed)]
    #[case("quantity_inspections[0].crates[0].gross_weight", KeyError::Malformed)]
    #[case("a.b", KeyError::Malformed)]
    fn test_key_grammar_rejects(#[case] key: &str, #[case] expected: KeyError) {
        assert_eq!(FormKey::parse(key).unwrap_err(), expected);
    }

    #[test]
    fn test_decodes_every_item_of_a_section() {
        let mut fields = header_fields();
        for (key, value) in [
            ("mushroom_storage[0].quantity_of_boxes", "120"),
            ("mushroom_storage[0].quantity_of_pallets", "4"),
            ("mushroom_storage[0].temperature_in_fridge", "2,5"),
            ("mushroom_storage[0].mushroom_temperature_min", "1.0"),
            ("mushroom_storage[0].mushroom_temperature_max", "3.0"),
            ("mushroom_storage[0].invoice_number", "INV-1"),
            ("mushroom_storage[1].quantity_of_boxes", "60"),
            ("mushroom_storage[1].quantity_of_pallets", "2"),
            ("mushroom_storage[1].temperature_in_fridge", "3"),
            ("mushroom_storage[1].mushroom_temperature_min", "2"),
            ("mushroom_storage[1].mushroom_temperature_max", "4"),
            ("mushroom_storage[1].thermometer", ""),
        ] {
            fields.push((key, value));
        }

        let submission = decode_form(form(&fields)).unwrap();
        assert_eq!(submission.job_number.as_deref(), Some("JN-42"));
        assert_eq!(submission.mushroom_storage.len(), 2);
        assert_eq!(submission.mushroom_storage[0].quantity_of_boxes, 120);
        assert_eq!(submission.mushroom_storage[0].temperature_in_fridge, dec("2.5"));
        assert_eq!(submission.mushroom_storage[0].invoice_number.as_deref(), Some("INV-1"));
        assert_eq!(submission.mushroom_storage[1].quantity_of_pallets, 2);
        assert_eq!(submission.mushroom_storage[1].thermometer, None);
    }

    #[test]
    fn test_off_grade_fields_read_their_own_keys() {
        let mut fields = root_fields();
        fields.extend([
            ("quality_inspections[0].sample_mass_kg", "10"),
            ("quality_inspections[0].conforms_to_declared_grade", "9"),
            ("quality_inspections[0].off_grade_mass_kg_50", "0.4"),
            ("quality_inspections[0].off_grade_mass_kg_70", "0.6"),
        ]);

        let submission = decode_form(form(&fields)).unwrap();
        let quality = &submission.quality_inspections[0];
        assert_eq!(quality.off_grade_mass_kg_50, Some(dec("0.4")));
        assert_eq!(quality.off_grade_mass_kg_70, Some(dec("0.6")));
    }

    #[test]
    fn test_boxes_and_legacy_weight_names() {
        let mut fields = root_fields();
        fields.extend([
            ("quantity_inspections[0].boxes[0].gross_weight", "120"),
            ("quantity_inspections[0].boxes[0].pallet_weight", "10"),
            ("quantity_inspections[0].boxes[1].net_weight", "130.5"),
            ("quantity_inspections[0].boxes[1].defect_weight", "12"),
            ("quantity_inspections[0].scale_model", "ВР-150"),
            ("quantity_inspections[0].scale_calibration_date", "2024-12-01"),
        ]);

        let submission = decode_form(form(&fields)).unwrap();
        let quantity = &submission.quantity_inspections[0];
        assert_eq!(quantity.boxes.len(), 2);
        assert_eq!(quantity.boxes[1].gross_weight, dec("130.5"));
        assert_eq!(quantity.boxes[1].pallet_weight, dec("12"));
        assert_eq!(
            quantity.scale_choice(),
            Some(ScaleChoice::Described {
                model: "ВР-150".to_string(),
                serial_number: None,
                calibration_date: NaiveDate::from_ymd_opt(2024, 12, 1),
            })
        );
    }

    #[test]
    fn test_json_quantity_items_come_first() {
        let mut fields = root_fields();
        fields.extend([
            (
                "quantity_inspections",
                r#"[{"boxes": [{"gross_weight": "50", "pallet_weight": "5"}]}]"#,
            ),
            ("quantity_inspections[0].boxes[0].gross_weight", "70"),
            ("quantity_inspections[0].boxes[0].pallet_weight", "7"),
        ]);

        let submission = decode_form(form(&fields)).unwrap();
        assert_eq!(submission.quantity_inspections.len(), 2);
        assert_eq!(submission.quantity_inspections[0].boxes[0].gross_weight, dec("50"));
        assert_eq!(submission.quantity_inspections[1].boxes[0].gross_weight, dec("70"));
    }

    #[test]
    fn test_weight_errors_point_at_the_sent_key() {
        let mut fields = root_fields();
        fields.extend([
            (
                "quantity_inspections",
                r#"[{"boxes": [{"gross_weight": "5", "pallet_weight": "10"}]}]"#,
            ),
            ("quantity_inspections[0].boxes[0].gross_weight", "7"),
            ("quantity_inspections[0].boxes[0].pallet_weight", "8"),
        ]);

        let errors = decode_form(form(&fields)).unwrap_err();
        assert_eq!(
            errors["quantity_inspections"],
            ["item 0.boxes[0].pallet_weight: must not exceed gross_weight"]
        );
        assert_eq!(
            errors["quantity_inspections[0].boxes[0].pallet_weight"],
            ["must not exceed gross_weight"]
        );
    }

    #[test]
    fn test_archives_attach_to_their_items() {
        let mut input = form(&root_fields());
        input.files = vec![
            archive("pallets[0].zip_photos"),
            archive("pallets[1].zip_photos"),
            archive("marking_zips[0].zip_photos"),
        ];

        let mut submission = decode_form(input).unwrap();
        assert_eq!(submission.pallets.len(), 2);
        assert_eq!(submission.marking_zips.len(), 1);

        let archives = submission.take_archives();
        assert_eq!(archives.len(), 3);
        assert_eq!(archives[0].0, SectionKind::Marking);
        assert_eq!(archives[2].1, 1);
        assert_eq!(archives[2].2.field, "pallets[1].zip_photos");
        assert!(submission.pallets[1].archive.is_none());
    }

    #[test]
    fn test_errors_are_keyed_by_flattened_key() {
        let fields = vec![
            ("inspection_date", "01.03.2025"),
            ("mushroom_storage[0].quantity_of_boxes", "many"),
            ("quality_inspections[0].sample_mass_kg", "ten"),
            ("quality_inspections[0].colour", "white"),
            ("diameter_measurements[1].average_diameter", "45"),
        ];

        let errors = decode_form(form(&fields)).unwrap_err();
        assert!(errors.contains_key("inspection_date"));
        assert!(errors.contains_key("inspector"));
        assert!(errors.contains_key("mushroom_storage[0].quantity_of_boxes"));
        assert_eq!(
            errors["mushroom_storage[0].quantity_of_pallets"],
            ["this field is required"]
        );
        assert!(errors["quality_inspections[0].sample_mass_kg"][0].contains("decimal"));
        assert_eq!(errors["quality_inspections[0].colour"], ["unknown field"]);
        assert!(errors.contains_key("diameter_measurements[1]"));
    }

    #[test]
    fn test_box_indices_must_be_contiguous() {
        let mut fields = root_fields();
        fields.extend([
            ("quantity_inspections[0].boxes[0].gross_weight", "10"),
            ("quantity_inspections[0].boxes[0].pallet_weight", "1"),
            ("quantity_inspections[0].boxes[2].gross_weight", "10"),
            ("quantity_inspections[0].boxes[2].pallet_weight", "1"),
        ]);

        let errors = decode_form(form(&fields)).unwrap_err();
        assert!(errors.contains_key("quantity_inspections[0].boxes[2]"));
    }

    #[test]
    fn test_marking_requires_an_archive() {
        let mut fields = root_fields();
        fields.push(("marking_zips[0].note", "x"));

        let errors = decode_form(form(&fields)).unwrap_err();
        assert!(errors.contains_key("marking_zips[0].zip_photos"));
        assert!(errors.contains_key("marking_zips[0].note"));
    }

    #[test]
    fn test_conformance_cannot_exceed_sample() {
        let mut fields = root_fields();
        fields.extend([
            ("quality_inspections[0].sample_mass_kg", "10"),
            ("quality_inspections[0].conforms_to_declared_grade", "11"),
        ]);

        let errors = decode_form(form(&fields)).unwrap_err();
        assert!(errors.contains_key("quality_inspections[0].conforms_to_declared_grade"));
    }

    #[test]
    fn test_json_body_shape() {
        let body = serde_json::json!({
            "inspection_date": "2025-03-01",
            "inspector": "7a3c7e8e-1f2b-4c1d-9e4f-0a1b2c3d4e5f",
            "mushroom_storage": [{
                "quantity_of_boxes": 10,
                "quantity_of_pallets": 2,
                "temperature_in_fridge": 2.5,
                "mushroom_temperature_min": "1",
                "mushroom_temperature_max": "3"
            }],
            "quantity_inspections": [{
                "boxes": [{"net_weight": 120, "defect_weight": 10}]
            }]
        });

        let submission: FullInspectionSubmission = serde_json::from_value(body).unwrap();
        assert!(submission.check().is_ok());
        assert_eq!(submission.mushroom_storage[0].temperature_in_fridge, dec("2.5"));
        assert_eq!(submission.quantity_inspections[0].boxes[0].gross_weight, dec("120"));
        assert!(submission.pallets.is_empty());
    }

    #[test]
    fn test_placement_section_is_required() {
        let errors = decode_form(form(&header_fields())).unwrap_err();
        assert_eq!(
            errors["mushroom_storage"],
            ["at least one placement item is required"]
        );

        let body = serde_json::json!({
            "inspection_date": "2025-03-01",
            "inspector": "7a3c7e8e-1f2b-4c1d-9e4f-0a1b2c3d4e5f",
            "mushroom_storage": []
        });
        let submission: FullInspectionSubmission = serde_json::from_value(body).unwrap();
        let errors = submission.check().unwrap_err();
        assert!(errors.contains_key("mushroom_storage"));
    }
}
