use super::calculations::{ReportFigures, Share};
use super::data::ReportData;
use super::document::{
    Block, Cell, FOOTNOTE_SIZE, Paragraph, PhotoRef, ReportDocument, SIGNATURE_SIZE, Table, TextRun,
};
use super::text;
use crate::config::ReportSettings;
use crate::inspections::sections::SectionKind;
use crate::instruments::thermometers::models as thermometers;
use rust_decimal::Decimal;

fn number(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Temperatures above zero carry an explicit plus sign
fn signed(value: Decimal) -> String {
    if value.is_sign_negative() && !value.is_zero() {
        number(value)
    } else {
        format!("+{}", number(value))
    }
}

fn or_missing(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(text::MISSING)
}

/// (model, serial, calibration date) of an optional thermometer
fn thermometer_labels(thermometer: Option<&thermometers::Model>) -> (String, String, String) {
    match thermometer {
        Some(t) => (
            t.info.clone(),
            or_missing(t.serial.as_deref()).to_string(),
            t.calibration_label(),
        ),
        None => (
            text::MISSING.to_string(),
            text::MISSING.to_string(),
            text::MISSING.to_string(),
        ),
    }
}

struct ReportBuilder<'a> {
    data: &'a ReportData,
    figures: &'a ReportFigures,
    settings: &'a ReportSettings,
    document: ReportDocument,
}

impl ReportBuilder<'_> {
    fn paragraph(&mut self, paragraph: Paragraph) {
        self.document.paragraph(paragraph);
    }

    fn text(&mut self, body: impl Into<String>) {
        self.paragraph(Paragraph::text(body));
    }

    /// Selected photos of `section` as a grid, or `placeholder` when none were chosen
    fn photos(&mut self, section: SectionKind, placeholder: &str) {
        let photos: Vec<PhotoRef> = self
            .data
            .photos(section)
            .iter()
            .map(|photo| PhotoRef {
                id: photo.id,
                storage_key: photo.storage_key.clone(),
                file_name: photo.original_filename.clone(),
            })
            .collect();

        if photos.is_empty() {
            self.text(placeholder);
        } else {
            self.document.push(Block::Photos(photos));
        }
    }

    fn title_page(&mut self) {
        let data = self.data;
        let inspection = &data.inspection;
        let invoice = data
            .storage
            .as_ref()
            .and_then(|s| s.invoice_number.as_deref());

        self.paragraph(Paragraph::heading(format!(
            "{}{}",
            text::JOB_NUMBER,
            or_missing(inspection.job_number.as_deref())
        )));
        self.text(text::REQUEST_FROM_CUSTOMER);
        self.paragraph(Paragraph::heading(self.settings.customer.clone()).centered());
        self.text(text::ACCORDING_TO);
        self.paragraph(Paragraph::heading(text::INSTRUCTION).centered());

        self.document.push(Block::Table(Table::borderless(vec![
            vec![
                Cell::bold(text::GOODS_DECLARED),
                Cell::new(format!(
                    "ШАМПИНЬОНЫ СВЕЖИЕ КУЛЬТИВИРУЕМЫЕ\nВЫСШИЙ СОРТ, {} ЯЩИКОВ",
                    self.figures.boxes
                )),
            ],
            vec![
                Cell::bold(text::INVOICE_NUMBER),
                Cell::new(or_missing(invoice)),
            ],
        ])));

        self.paragraph(Paragraph::heading(text::WE_INSPECTED));
        self.document.push(Block::Table(Table::borderless(vec![
            vec![
                Cell::bold(text::INSPECTION_SITE),
                Cell::new(self.settings.inspection_site.clone()),
            ],
            vec![
                Cell::bold(text::INSPECTION_DATE),
                Cell::new(text::short_date(inspection.inspection_date)),
            ],
        ])));
        self.document.push(Block::PageBreak);
    }

    fn placement(&mut self) {
        let figures = self.figures;
        let (info, serial, calibration) =
            thermometer_labels(self.data.storage_thermometer.as_ref());
        let temperatures = self.data.storage.as_ref().map(|s| {
            (
                signed(s.temperature_in_fridge),
                number(s.mushroom_temperature_min),
                signed(s.mushroom_temperature_max),
            )
        });
        let (fridge, min, max) = temperatures.unwrap_or_else(|| {
            (
                text::MISSING.to_string(),
                text::MISSING.to_string(),
                text::MISSING.to_string(),
            )
        });

        self.paragraph(Paragraph::heading(text::PLACEMENT_HEADING));
        self.text(format!(
            "На момент проведения инспекции шампиньоны свежие, культивируемые высший сорт \
             (далее — «грибы») находились на хранении в промышленном холодильнике по {} ящиков. \
             {} поддона шампиньоны свежие, культивируемые высший сорт с калибром 50-70 мм.\n\
             Температура в холодильнике {fridge}°C по Цельсию. Температура гриба в переделах \
             от {min}°C до {max}°C по Цельсию. Измерение грибов производилось термометром \
             электронным {info}, идентификационный {serial} (дата проверки - {calibration})",
            figures.boxes_per_pallet, figures.pallets,
        ));
        self.document.push(Block::PageBreak);
        self.photos(SectionKind::Placement, text::NO_PLACEMENT_PHOTOS);
    }

    fn marking(&mut self) {
        self.paragraph(Paragraph::heading(text::MARKING_HEADING));
        self.text(text::MARKING_TEXT);
        self.photos(SectionKind::Marking, text::NO_MARKING_PHOTOS);
    }

    fn quantity(&mut self) {
        let figures = self.figures;
        let (model, serial, calibration) = match self.data.scale.as_ref() {
            Some(scale) => (
                scale.model.clone(),
                or_missing(scale.serial_number.as_deref()).to_string(),
                scale.calibration_date.map_or_else(
                    || text::MISSING.to_string(),
                    text::short_date,
                ),
            ),
            None => (
                text::MISSING.to_string(),
                text::MISSING.to_string(),
                text::MISSING.to_string(),
            ),
        };

        self.paragraph(Paragraph::heading(text::QUANTITY_HEADING));
        self.text(format!(
            "К инспекции было предоставлено {pallets} деревянных поддона по {per_pallet} ящиков \
             на каждом поддоне. Итого {boxes} ящиков с грибами. Для проверки качества грибов на \
             соответствие, заявленного производителем была произведена случайным образом выборка \
             (заранее согласованная с клиентом) по одному случайно выбранному ящику с каждого \
             поддона. Выборка составила {pallets} ящика. Вес каждого ящика с грибами в среднем \
             не менее 3 кг. Взвешивание проводилось на весах электронных марки {model} дата \
             поверки {calibration}, заводской номер {serial}.",
            pallets = figures.pallets,
            per_pallet = figures.boxes_per_pallet,
            boxes = figures.boxes,
        ));
        self.photos(SectionKind::Quantity, text::NO_QUANTITY_PHOTOS);
    }

    fn quality(&mut self) {
        let figures = self.figures;
        let sample = number(figures.sample_mass);

        self.paragraph(Paragraph::heading(text::QUALITY_HEADING));
        self.text(format!(
            "Объём выборки для визуальной инспекции качества товара (высший сорт, калибр 50–70 мм) \
             был произведен согласно инструкциям клиента и составил {} ящика.\n\n\
             Было проверено {sample} (объединённая проба) грибов по различным параметрам:\n\
             - внешний вид (цвет, загрязненность, целостность и т. п.);\n\
             - запах;\n\
             - калибр\n\n\
             Детали выборки следующие",
            figures.pallets,
        ));

        let headers = text::SAMPLE_TABLE_HEADERS.iter().map(|h| Cell::bold(*h)).collect();
        self.document.push(Block::Table(Table::grid(vec![
            headers,
            vec![
                Cell::new(figures.boxes.to_string()),
                Cell::new(figures.pallets.to_string()),
                Cell::new(sample),
            ],
        ])));

        let Share { mass, percent } = figures.conforming;
        let rest = figures.nonconforming;
        self.paragraph(
            Paragraph::text(format!(
                "Определение соответствия грибов из выборки высшему сорту (внешний вид, запах):\n\
                 Соответствие заявленному сорту – {mass:.3} кг или {percent:.2}%\n\
                 Несоответствие заявленному сорту*- {:.3} кг или {:.2}%\n",
                rest.mass, rest.percent,
            ))
            .with_run(TextRun::plain(text::NONCONFORMITY_FOOTNOTE).sized(FOOTNOTE_SIZE)),
        );

        let mut caliber = Vec::new();
        if let Some(under) = figures.under_50 {
            caliber.push(format!(
                "-{:.3} кг - калибром менее 50мм.В процентном соотношении от объединенной пробы  {:.2}%",
                under.mass, under.percent
            ));
        }
        if let Some(over) = figures.over_70 {
            caliber.push(format!(
                "-{:.3} кг - калибром более 70мм.В процентном соотношении от объединенной пробы  {:.2}%",
                over.mass, over.percent
            ));
        }
        if !caliber.is_empty() {
            self.text(format!("{}\n{}", text::CALIBER_FOUND, caliber.join("\n")));
        }

        self.photos(SectionKind::Quality, text::NO_QUALITY_PHOTOS);
        self.photos(SectionKind::Diameter, text::NO_DIAMETER_PHOTOS);
    }

    fn pallets(&mut self) {
        let figures = self.figures;

        self.text(format!(
            "Было взвешено {} поддона с товаром. Взвешивание проводилось на стационарных весах \
             склада «А» (дата поверки апрель 2024г.) КФХ «Грибная страна»\
             Данные по взвешиванию поддонов с товаром приведены в таблице:",
            figures.pallets
        ));

        let mut rows = vec![
            text::PALLET_TABLE_HEADERS
                .iter()
                .map(|h| Cell::bold(*h))
                .collect::<Vec<_>>(),
        ];
        for (index, row) in figures.rows.iter().enumerate() {
            rows.push(vec![
                Cell::new((index + 1).to_string()),
                Cell::new(number(row.gross)),
                Cell::new(number(row.pallet)),
                Cell::new(row.boxes.to_string()),
                Cell::new(number(row.net)),
                Cell::new(text::PALLET_KIND),
            ]);
        }
        let totals = &figures.totals;
        rows.push(vec![
            Cell::bold(text::TOTAL),
            Cell::bold(number(totals.gross)),
            Cell::bold(number(totals.pallet)),
            Cell::bold(totals.boxes.to_string()),
            Cell::bold(number(totals.net)),
            Cell::new(""),
        ]);
        self.document.push(Block::Table(Table::grid(rows)));

        self.text(format!(
            "Вес одного пустого ящика в среднем 210г.Вес пустых ящиков на одном поддоне плюс \
             упаковка (в виде картонных упаковок 3 кг) в среднем 36,60 кг.В результате взвешивания \
             получили. Вес брутто – {} кг. Вес нетто – {} кг.",
            number(totals.gross),
            number(totals.net)
        ));
        self.photos(SectionKind::Pallets, text::NO_PALLET_PHOTOS);
    }

    fn loading(&mut self) {
        let data = self.data;
        let loading = data.loading.as_ref();
        let (model, serial, calibration) = thermometer_labels(data.loading_thermometer.as_ref());
        let temperature = loading
            .and_then(|l| l.mushroom_temperature)
            .map_or_else(|| text::MISSING.to_string(), signed);

        self.text(format!(
            "Во время инспекции и после отгрузки случайным образом были выбраны паллеты с грибами \
             и измерена температура гриба. Температура гриба при загрузке в авторефрижератор \
             составила {temperature} градуса по Цельсию.Измерения грибов производились термометром \
             электронным {model}, идентификационный номер №{serial} (дата поверки – {calibration})."
        ));

        if let Some(loading) = loading.filter(|l| l.car_number.is_some()) {
            let mut vehicle = format!(
                "К инспекции была представлена машина (гос. номер {}) с авторефрижератором \
                 (гос. номер {}). На момент инспекции он находился в удовлетворительном состоянии, \
                 без видимых повреждений, сквозных отверстий, чистый, сухой, без посторонних запахов. \
                 После погрузки всех поддонов с грибами авторефрижератор был опломбирован инспектором \
                 СЖС пломбой SGS {}.",
                or_missing(loading.car_number.as_deref()),
                or_missing(loading.refrigerator_number.as_deref()),
                or_missing(loading.seal_number.as_deref()),
            );
            if let Some(transport) = loading.transport_temperature {
                let transport = format!("{transport:.1}");
                let transport = if transport.starts_with('-') {
                    transport
                } else {
                    format!("+{transport}")
                };
                vehicle.push_str(&format!(
                    " Водителем была выставлена температура для транспортировки {transport} \
                     градуса по Цельсию."
                ));
            }
            self.text(vehicle);
        }

        self.photos(SectionKind::Loading, text::NO_LOADING_PHOTOS);
    }

    fn closing(&mut self) {
        let settings = self.settings;
        self.paragraph(Paragraph::heading(text::REMARKS_HEADING));
        self.text(text::remarks(&settings.issuer));

        let mut signature = Table::borderless(vec![
            vec![
                Cell::bold(format!("{} {}", text::SIGNED_AND_ISSUED_IN, settings.issued_in)),
                Cell::bold(text::ON_BEHALF_OF),
            ],
            vec![
                Cell::bold(text::long_date(self.data.inspection.inspection_date)),
                Cell::bold(settings.issuer.clone()),
            ],
        ]);
        signature.size = SIGNATURE_SIZE;
        self.document.push(Block::Table(signature));
    }
}

/// Lays out the whole report in its fixed section order
pub fn build_report(
    data: &ReportData,
    figures: &ReportFigures,
    settings: &ReportSettings,
) -> ReportDocument {
    let mut builder = ReportBuilder {
        data,
        figures,
        settings,
        document: ReportDocument::new(data.inspection.inspection_date),
    };

    builder.title_page();
    builder.placement();
    builder.marking();
    builder.quantity();
    builder.quality();
    builder.pallets();
    builder.loading();
    builder.closing();
    builder.document
}
