//! Format-neutral layout of a report, rendered to DOCX by [`super::docx`]

use chrono::NaiveDate;
use uuid::Uuid;

/// Font sizes in half-points
pub const BODY_SIZE: usize = 24;
pub const SIGNATURE_SIZE: usize = 22;
pub const FOOTNOTE_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Justify,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
    pub size: usize,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            size: BODY_SIZE,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            bold: true,
            ..Self::plain(text)
        }
    }

    pub fn sized(mut self, size: usize) -> Self {
        self.size = size;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Paragraph {
    pub runs: Vec<TextRun>,
    pub align: Align,
}

impl Paragraph {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            runs: vec![TextRun::plain(text)],
            align: Align::Justify,
        }
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Self {
            runs: vec![TextRun::bold(text)],
            align: Align::Left,
        }
    }

    pub fn centered(mut self) -> Self {
        self.align = Align::Center;
        self
    }

    pub fn with_run(mut self, run: TextRun) -> Self {
        self.runs.push(run);
        self
    }

    /// Concatenated text of every run
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub bold: bool,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<Vec<Cell>>,
    pub bordered: bool,
    pub size: usize,
}

impl Table {
    pub fn grid(rows: Vec<Vec<Cell>>) -> Self {
        Self {
            rows,
            bordered: true,
            size: BODY_SIZE,
        }
    }

    pub fn borderless(rows: Vec<Vec<Cell>>) -> Self {
        Self {
            bordered: false,
            ..Self::grid(rows)
        }
    }

    pub fn columns(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// A stored photo to embed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRef {
    pub id: Uuid,
    pub storage_key: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    /// Never empty; sections without photos get a placeholder paragraph
    Photos(Vec<PhotoRef>),
    PageBreak,
}

#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub inspection_date: NaiveDate,
    pub blocks: Vec<Block>,
}

impl ReportDocument {
    pub fn new(inspection_date: NaiveDate) -> Self {
        Self {
            inspection_date,
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn paragraph(&mut self, paragraph: Paragraph) {
        self.push(Block::Paragraph(paragraph));
    }

    /// Every embedded photo, in document order
    pub fn photos(&self) -> impl Iterator<Item = &PhotoRef> {
        self.blocks.iter().flat_map(|block| match block {
            Block::Photos(photos) => photos.as_slice(),
            _ => &[],
        })
    }

    /// Paragraph texts, in document order
    pub fn paragraphs(&self) -> impl Iterator<Item = String> + '_ {
        self.blocks.iter().filter_map(|block| match block {
            Block::Paragraph(paragraph) => Some(paragraph.plain_text()),
            _ => None,
        })
    }
}
