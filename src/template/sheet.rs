//! Worksheet access
//!
//! The parser only needs three things from a cell: the text a human sees,
//! a numeric reading, and the hyperlink target. `Sheet` exposes exactly
//! that so the scan can run over a real workbook or an in-memory grid.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use super::error::{ImportError, Result};

/// Raw value stored in a cell
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

/// One worksheet cell: raw value, rendered text and link target
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    /// Text as rendered with the cell's number format
    pub formatted: Option<String>,
    pub hyperlink: Option<String>,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self { value: CellValue::Text(value.into()), ..Self::default() }
    }

    pub fn number(value: f64) -> Self {
        Self { value: CellValue::Number(value), ..Self::default() }
    }

    pub fn with_formatted(mut self, formatted: impl Into<String>) -> Self {
        self.formatted = Some(formatted.into());
        self
    }

    pub fn with_link(mut self, target: impl Into<String>) -> Self {
        self.hyperlink = Some(target.into());
        self
    }

    /// Displayed text, preferring the formatted rendering over the raw value.
    /// Rep ranges such as "8-10" are often stored as dates and only make
    /// sense in their formatted form.
    pub fn display(&self) -> String {
        if let Some(formatted) = self.formatted.as_deref()
            && !formatted.trim().is_empty()
        {
            return collapse_whitespace(formatted);
        }
        match &self.value {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => collapse_whitespace(s),
            CellValue::Number(n) => n.to_string(),
        }
    }

    /// Numeric reading: the raw number if there is one, else the parsed display text
    pub fn as_number(&self) -> Option<f64> {
        if let CellValue::Number(n) = self.value {
            return Some(n);
        }
        let text = self.display();
        if text.is_empty() {
            return None;
        }
        text.parse::<f64>().ok().filter(|n| n.is_finite())
    }

    pub fn link(&self) -> Option<String> {
        self.hyperlink
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Read access to a worksheet. Columns and rows are 1-based.
pub trait Sheet {
    fn name(&self) -> &str;

    /// Last used row, 0 when the sheet is empty
    fn max_row(&self) -> u32;

    fn cell(&self, col: u32, row: u32) -> Option<Cell>;

    fn display(&self, col: u32, row: u32) -> String {
        self.cell(col, row).map(|c| c.display()).unwrap_or_default()
    }

    fn number(&self, col: u32, row: u32) -> Option<f64> {
        self.cell(col, row).and_then(|c| c.as_number())
    }

    fn hyperlink(&self, col: u32, row: u32) -> Option<String> {
        self.cell(col, row).and_then(|c| c.link())
    }
}

/// In-memory sheet, handy for building layouts by hand
#[derive(Debug, Clone, Default)]
pub struct GridSheet {
    name: String,
    cells: HashMap<(u32, u32), Cell>,
    max_row: u32,
}

impl GridSheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn set(&mut self, col: u32, row: u32, cell: Cell) -> &mut Self {
        self.max_row = self.max_row.max(row);
        self.cells.insert((col, row), cell);
        self
    }

    /// Set a row from its values starting at column A; empty strings leave gaps
    pub fn set_row(&mut self, row: u32, values: &[&str]) -> &mut Self {
        for (i, value) in values.iter().enumerate() {
            if !value.is_empty() {
                self.set(i as u32 + 1, row, Cell::text(*value));
            }
        }
        self.max_row = self.max_row.max(row);
        self
    }
}

impl Sheet for GridSheet {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_row(&self) -> u32 {
        self.max_row
    }

    fn cell(&self, col: u32, row: u32) -> Option<Cell> {
        self.cells.get(&(col, row)).cloned()
    }
}

/// An `.xlsx` workbook loaded from disk
pub struct XlsxWorkbook {
    book: umya_spreadsheet::Spreadsheet,
}

impl XlsxWorkbook {
    pub fn open(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "reading workbook");
        let book = umya_spreadsheet::reader::xlsx::read(path).map_err(|e| ImportError::Workbook {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self { book })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(|ws| ws.get_name().to_string())
            .collect()
    }

    pub fn sheet(&self, name: &str) -> Result<XlsxSheet<'_>> {
        self.book
            .get_sheet_by_name(name)
            .map(|ws| XlsxSheet { ws })
            .ok_or_else(|| ImportError::SheetNotFound {
                name: name.to_string(),
                available: self.sheet_names(),
            })
    }
}

pub struct XlsxSheet<'a> {
    ws: &'a umya_spreadsheet::Worksheet,
}

impl Sheet for XlsxSheet<'_> {
    fn name(&self) -> &str {
        self.ws.get_name()
    }

    fn max_row(&self) -> u32 {
        self.ws.get_highest_row()
    }

    fn cell(&self, col: u32, row: u32) -> Option<Cell> {
        let c = self.ws.get_cell((col, row))?;
        let value = match c.get_value_number() {
            Some(n) => CellValue::Number(n),
            None => {
                let text = c.get_value();
                if text.is_empty() { CellValue::Empty } else { CellValue::Text(text.to_string()) }
            }
        };
        Some(Cell {
            value,
            formatted: Some(c.get_formatted_value()),
            hyperlink: c.get_hyperlink().map(|h| h.get_url().to_string()),
        })
    }
}
