//! Fixed wording of the inspection report. Report documents are issued in Russian.

use chrono::{Datelike, NaiveDate};

pub const JOB_NUMBER: &str = "Номер работы: ";
pub const REQUEST_FROM_CUSTOMER: &str = "В соответствии с заявкой, полученной от нашего Заказчика";
pub const ACCORDING_TO: &str = "и согласно следующей инструкции:";
pub const INSTRUCTION: &str = "ИНСПЕКЦИЯ КОЛИЧЕСТВА И ВИЗУАЛЬНАЯ ИНСПЕКЦИЯ КАЧЕСТВА ТОВАРА\n\
                               СОГЛАСНО ИНСТРУКЦИЯМ КЛИЕНТА";
pub const GOODS_DECLARED: &str = "ТОВАР И КОЛИЧЕСТВО ЗАЯВЛЕНО КАК:";
pub const INVOICE_NUMBER: &str = "НОМЕР СЧЕТ-ФАКТУРЫ:";
pub const WE_INSPECTED: &str = "МЫ ПРОВЕЛИ ИНСПЕКЦИЮ И НАСТОЯЩИМ СООБЩАЕМ СЛЕДУЮЩЕЕ:";
pub const INSPECTION_SITE: &str = "МЕСТО ИНСПЕКЦИИ:";
pub const INSPECTION_DATE: &str = "ДАТА ИНСПЕЦИИ:";

pub const PLACEMENT_HEADING: &str = "1. РАЗМЕЩЕНИЕ ТОВАРА";
pub const MARKING_HEADING: &str = "2. МАРКИРОВКА";
pub const QUANTITY_HEADING: &str = "3. ИНСПЕКЦИЯ КОЛИЧЕСТВА ТОВАРА";
pub const QUALITY_HEADING: &str = "4. ИНСПЕКЦИЯ КАЧЕСТВА ТОВАРА";

pub const MARKING_TEXT: &str = "Грибы были упакованы в полипропиленовые ящики. \
    На ящиках с грибами имелись бумажные этикетки со следующей маркировкой: \
    на первой этикетке информация содержит информационный характер продукта \
    (наименование товара, производитель, импортер, срок хранения дата упаковки и т. д.), \
    на второй этикетке информация для внутреннего контроля и идентификации товара \
    и персонала (упаковщика, контролера и т. п.).";

pub const SAMPLE_TABLE_HEADERS: [&str; 3] = [
    "Фактическое количество товара,\nпредставленного к инспекции",
    "Объём выборки\n(количество случайным\nобразом отобранных ящиков)",
    "Масса объединённой пробы, кг",
];

pub const NONCONFORMITY_FOOTNOTE: &str = "* несоответствие грибов: механические повреждения \
    в виде надломов шляпки гриба,в виде трещин и пустот ножки, потемневшие ножки, \
    раскрытие шляпки и т. п.";

pub const CALIBER_FOUND: &str = "При проверке также было обнаружено не соответствующие по калибру грибы:";

pub const PALLET_TABLE_HEADERS: [&str; 6] = [
    "№ п/п",
    "Вес брутто с поддоном, кг",
    "Вес поддона, кг",
    "Количество ящиков, кг",
    "Вес нетто, кг",
    "Вид и калибр, кг",
];
pub const PALLET_KIND: &str = "Обычный белый 50-70мм";
pub const TOTAL: &str = "Итого";

pub const REMARKS_HEADING: &str = "ЗАМЕЧАНИЯ:";
pub const SIGNED_AND_ISSUED_IN: &str = "ПОДПИСАН И ВЫПУЩЕН В";
pub const ON_BEHALF_OF: &str = "ОТ ИМЕНИ И ПО ПОРУЧЕНИЮ";

pub const NO_PLACEMENT_PHOTOS: &str = "Пользователь не выбрал ни одного фото для отчёта.";
pub const NO_MARKING_PHOTOS: &str = "Пользователь не выбрал ни одного фото маркировки.";
pub const NO_QUANTITY_PHOTOS: &str = "Пользователь не выбрал фото для раздела 3.";
pub const NO_QUALITY_PHOTOS: &str = "Пользователь не выбрал ни одного фото для раздела 4.";
pub const NO_DIAMETER_PHOTOS: &str = "Пользователь не выбрал ни одного фото измерения диаметра.";
pub const NO_PALLET_PHOTOS: &str = "Пользователь не выбрал ни одной фотографии палет.";
pub const NO_LOADING_PHOTOS: &str = "Пользователь не выбрал ни одной фотографии погрузки.";

/// Printed in place of optional values that were not recorded
pub const MISSING: &str = "-";

const GENITIVE_MONTHS: [&str; 12] = [
    "ЯНВАРЯ", "ФЕВРАЛЯ", "МАРТА", "АПРЕЛЯ", "МАЯ", "ИЮНЯ", "ИЮЛЯ", "АВГУСТА", "СЕНТЯБРЯ",
    "ОКТЯБРЯ", "НОЯБРЯ", "ДЕКАБРЯ",
];

/// `01.03.2025`
pub fn short_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// `01 МАРТА 2025 ГОДА`, as printed in the signature block
pub fn long_date(date: NaiveDate) -> String {
    format!(
        "{:02} {} {} ГОДА",
        date.day(),
        GENITIVE_MONTHS[date.month0() as usize],
        date.year()
    )
}

pub fn remarks(issuer: &str) -> String {
    format!(
        "1. Данный отчет касается указанного места и времени проведения инспекции.\n\
         2. {issuer} не подтверждает точность, аккуратность и достоверность документов, \
         предоставленных третьими сторонами.\n\
         3. Данный отчет выпущен в соответствии с Общими условиями по оказанию инспекционных услуг."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(), "01 МАРТА 2025 ГОДА")]
    #[case(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(), "31 ДЕКАБРЯ 2024 ГОДА")]
    #[case(NaiveDate::from_ymd_opt(2025, 1, 9).unwrap(), "09 ЯНВАРЯ 2025 ГОДА")]
    fn test_long_date_uses_genitive_month(#[case] date: NaiveDate, #[case] expected: &str) {
        assert_eq!(long_date(date), expected);
    }

    #[test]
    fn test_short_date() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(short_date(date), "01.03.2025");
    }

    #[test]
    fn test_remarks_name_the_issuer() {
        assert!(remarks("ООО «Тест»").contains("2. ООО «Тест» не подтверждает"));
    }
}
