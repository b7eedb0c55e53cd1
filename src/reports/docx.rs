use super::calculations::ReportError;
use super::document::{Align, Block, Paragraph, PhotoRef, ReportDocument, Table};
use docx_rs::{
    AlignmentType, BreakType, Docx, PageMargin, Pic, Run, RunFonts, TableCell, TableRow, WidthType,
};
use std::collections::HashMap;
use std::io::Cursor;
use uuid::Uuid;

const FONT: &str = "Times New Roman";
/// Half an inch, in twentieths of a point
const MARGIN_TWIPS: i32 = 720;
/// A4 width minus both margins
const CONTENT_WIDTH_TWIPS: usize = 11906 - 2 * 720;
const EMU_PER_INCH: u64 = 914_400;
/// Photos are scaled to 3.5 inches wide so two fit side by side
const PHOTO_WIDTH_EMU: u64 = EMU_PER_INCH * 7 / 2;
/// Longest edge kept when embedding, larger photos are downscaled
const MAX_PHOTO_PIXELS: u32 = 1600;
const PHOTO_COLUMNS: usize = 2;

/// A photo decoded, bounded in size and re-encoded as PNG
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub fn prepare_image(photo: &PhotoRef, bytes: &[u8]) -> Result<EmbeddedImage, ReportError> {
    let invalid = |message: String| ReportError::InvalidImage {
        photo: photo.file_name.clone(),
        message,
    };

    let mut decoded = image::load_from_memory(bytes).map_err(|e| invalid(e.to_string()))?;
    if decoded.width() > MAX_PHOTO_PIXELS || decoded.height() > MAX_PHOTO_PIXELS {
        decoded = decoded.thumbnail(MAX_PHOTO_PIXELS, MAX_PHOTO_PIXELS);
    }

    let mut png = Cursor::new(Vec::new());
    decoded
        .write_to(&mut png, image::ImageFormat::Png)
        .map_err(|e| invalid(e.to_string()))?;

    Ok(EmbeddedImage {
        png: png.into_inner(),
        width: decoded.width(),
        height: decoded.height(),
    })
}

fn alignment(align: Align) -> AlignmentType {
    match align {
        Align::Left => AlignmentType::Left,
        Align::Center => AlignmentType::Center,
        Align::Justify => AlignmentType::Both,
    }
}

/// A run per line, joined by line breaks
fn text_run(text: &str, bold: bool, size: usize) -> Run {
    let mut run = Run::new().size(size);
    if bold {
        run = run.bold();
    }
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(line);
    }
    run
}

fn paragraph(paragraph: &Paragraph) -> docx_rs::Paragraph {
    paragraph.runs.iter().fold(
        docx_rs::Paragraph::new().align(alignment(paragraph.align)),
        |out, run| out.add_run(text_run(&run.text, run.bold, run.size)),
    )
}

fn table(table: &Table) -> docx_rs::Table {
    let columns = table.columns().max(1);
    let width = CONTENT_WIDTH_TWIPS / columns;

    let rows = table
        .rows
        .iter()
        .map(|cells| {
            TableRow::new(
                cells
                    .iter()
                    .map(|cell| {
                        TableCell::new()
                            .width(width, WidthType::Dxa)
                            .add_paragraph(
                                docx_rs::Paragraph::new()
                                    .add_run(text_run(&cell.text, cell.bold, table.size)),
                            )
                    })
                    .collect(),
            )
        })
        .collect();

    let out = if table.bordered {
        docx_rs::Table::new(rows)
    } else {
        docx_rs::Table::without_borders(rows)
    };
    out.set_grid(vec![width; columns])
}

fn photo_grid(
    photos: &[PhotoRef],
    images: &HashMap<Uuid, EmbeddedImage>,
) -> Result<docx_rs::Table, ReportError> {
    let width = CONTENT_WIDTH_TWIPS / PHOTO_COLUMNS;
    let mut rows = Vec::new();

    for chunk in photos.chunks(PHOTO_COLUMNS) {
        let mut cells = Vec::with_capacity(PHOTO_COLUMNS);
        for photo in chunk {
            let image = images.get(&photo.id).ok_or_else(|| ReportError::InvalidImage {
                photo: photo.file_name.clone(),
                message: "photo bytes were not loaded".to_string(),
            })?;
            let height_emu = PHOTO_WIDTH_EMU * u64::from(image.height) / u64::from(image.width.max(1));
            let pic = Pic::new_with_dimensions(image.png.clone(), image.width, image.height)
                .size(
                    u32::try_from(PHOTO_WIDTH_EMU).unwrap_or(u32::MAX),
                    u32::try_from(height_emu).unwrap_or(u32::MAX),
                );
            cells.push(
                TableCell::new().width(width, WidthType::Dxa).add_paragraph(
                    docx_rs::Paragraph::new()
                        .align(AlignmentType::Center)
                        .add_run(Run::new().add_image(pic)),
                ),
            );
        }
        // Keep the grid rectangular on an odd photo count
        while cells.len() < PHOTO_COLUMNS {
            cells.push(
                TableCell::new()
                    .width(width, WidthType::Dxa)
                    .add_paragraph(docx_rs::Paragraph::new()),
            );
        }
        rows.push(TableRow::new(cells));
    }

    Ok(docx_rs::Table::without_borders(rows).set_grid(vec![width; PHOTO_COLUMNS]))
}

/// Renders the document to DOCX bytes; `photos` holds the stored bytes of every embedded photo
pub fn render_docx(
    document: &ReportDocument,
    photos: &HashMap<Uuid, Vec<u8>>,
) -> Result<Vec<u8>, ReportError> {
    let mut images = HashMap::new();
    for photo in document.photos() {
        if images.contains_key(&photo.id) {
            continue;
        }
        let bytes = photos.get(&photo.id).ok_or_else(|| ReportError::InvalidImage {
            photo: photo.file_name.clone(),
            message: "photo bytes were not loaded".to_string(),
        })?;
        images.insert(photo.id, prepare_image(photo, bytes)?);
    }

    let fonts = RunFonts::new()
        .ascii(FONT)
        .hi_ansi(FONT)
        .east_asia(FONT)
        .cs(FONT);
    let mut docx = Docx::new()
        .default_fonts(fonts)
        .default_size(super::document::BODY_SIZE)
        .page_margin(
            PageMargin::new()
                .top(MARGIN_TWIPS)
                .bottom(MARGIN_TWIPS)
                .left(MARGIN_TWIPS)
                .right(MARGIN_TWIPS),
        );

    for block in &document.blocks {
        docx = match block {
            Block::Paragraph(p) => docx.add_paragraph(paragraph(p)),
            Block::Table(t) => docx.add_table(table(t)),
            Block::Photos(photos) => docx.add_table(photo_grid(photos, &images)?),
            Block::PageBreak => docx.add_paragraph(
                docx_rs::Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
            ),
        };
    }

    let mut out = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut out)
        .map_err(|e| ReportError::Render(e.to_string()))?;

    tracing::debug!(
        blocks = document.blocks.len(),
        photos = images.len(),
        "Rendered report document"
    );
    Ok(out.into_inner())
}

/// Runs [`render_docx`] on the blocking pool
pub async fn render_docx_blocking(
    document: ReportDocument,
    photos: HashMap<Uuid, Vec<u8>>,
) -> Result<Vec<u8>, ReportError> {
    tokio::task::spawn_blocking(move || render_docx(&document, &photos))
        .await
        .map_err(|e| ReportError::Render(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_helpers::png_bytes;
    use crate::reports::document::{Cell, TextRun};
    use chrono::NaiveDate;
    use std::io::Read;

    fn photo_ref(name: &str) -> PhotoRef {
        PhotoRef {
            id: Uuid::new_v4(),
            storage_key: format!("photos/2025-03-01_10-00-00/quality_inspection/{name}"),
            file_name: name.to_string(),
        }
    }

    fn document_xml(bytes: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    fn sample_document(photos: Vec<PhotoRef>) -> ReportDocument {
        let mut document = ReportDocument::new(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        document.paragraph(Paragraph::heading("2. МАРКИРОВКА"));
        document.paragraph(
            Paragraph::text("первая строка\nвторая строка").with_run(TextRun::plain("сноска").sized(16)),
        );
        document.push(Block::Table(Table::grid(vec![vec![
            Cell::bold("Итого"),
            Cell::new("73.4"),
        ]])));
        document.push(Block::PageBreak);
        if !photos.is_empty() {
            document.push(Block::Photos(photos));
        }
        document
    }

    #[test]
    fn test_renders_text_and_tables() {
        let bytes = render_docx(&sample_document(vec![]), &HashMap::new()).unwrap();
        assert_eq!(&bytes[..2], b"PK");

        let xml = document_xml(&bytes);
        assert!(xml.contains("2. МАРКИРОВКА"));
        assert!(xml.contains("вторая строка"));
        assert!(xml.contains("73.4"));
    }

    #[test]
    fn test_embeds_photos() {
        let first = photo_ref("a.png");
        let second = photo_ref("b.png");
        let third = photo_ref("c.png");
        let photos = HashMap::from([
            (first.id, png_bytes(40, 30)),
            (second.id, png_bytes(30, 40)),
            (third.id, png_bytes(10, 10)),
        ]);

        let bytes = render_docx(&sample_document(vec![first, second, third]), &photos).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let media = archive
            .file_names()
            .filter(|name| name.starts_with("word/media/") && !name.ends_with('/'))
            .count();
        assert_eq!(media, 3);
    }

    #[test]
    fn test_unreadable_photo_is_rejected() {
        let broken = photo_ref("broken.jpg");
        let photos = HashMap::from([(broken.id, b"not an image".to_vec())]);

        let err = render_docx(&sample_document(vec![broken]), &photos).unwrap_err();
        assert!(matches!(err, ReportError::InvalidImage { ref photo, .. } if photo == "broken.jpg"));
    }

    #[test]
    fn test_large_photos_are_downscaled() {
        let photo = photo_ref("large.png");
        let image = prepare_image(&photo, &png_bytes(3200, 1600)).unwrap();
        assert_eq!((image.width, image.height), (1600, 800));
    }
}
