//! Tabular input as loosely typed cells.
//!
//! A [`Workbook`] is a list of named sheets, each a grid of [`Cell`]s. It is
//! loaded either from a spreadsheet file (xlsx, xlsm, xlsb, xls, ods) or from a
//! directory holding one `<Sheet Name>.csv` file per sheet.

use std::borrow::Cow;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Reader, open_workbook_auto};

/// A spreadsheet cell after conversion at the input boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// A finite number, from a numeric cell or numeric text.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Cell::Empty => return None,
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }

    /// Trimmed text. Numbers are rendered without a trailing `.0`.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.trim().to_string(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Int(n) => {
                #[allow(clippy::cast_precision_loss)]
                let n = *n as f64;
                Cell::Number(n)
            }
            Data::Float(f) => Cell::Number(*f),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Bool(_) | Data::Error(_) | Data::Empty => Cell::Empty,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Read a sheet from CSV text. The first record is kept as the header row.
    /// Fields that are not valid UTF-8 are decoded lossily so one bad byte
    /// does not cost the rest of the sheet.
    pub fn from_csv<R: Read>(name: &str, reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for (line_num, result) in rdr.byte_records().enumerate() {
            let record = result
                .with_context(|| format!("Failed to parse CSV row {} of '{name}'", line_num + 1))?;
            let mut lossy = false;
            let row = record
                .iter()
                .map(|field| {
                    let text = String::from_utf8_lossy(field);
                    lossy |= matches!(text, Cow::Owned(_));
                    if text.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(text.into_owned())
                    }
                })
                .collect();
            if lossy {
                tracing::debug!(sheet = name, row = line_num + 1, "replaced invalid UTF-8 in CSV row");
            }
            rows.push(row);
        }

        Ok(Sheet {
            name: name.to_string(),
            rows,
        })
    }

    #[must_use]
    pub fn header(&self) -> &[Cell] {
        self.rows.first().map(Vec::as_slice).unwrap_or_default()
    }

    /// Data rows with their 1-based spreadsheet row number.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[Cell])> {
        self.rows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, row)| (i + 1, row.as_slice()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Open a spreadsheet file, or a directory of per-sheet CSV files.
    pub fn open(path: &Path) -> Result<Self> {
        if path.is_dir() {
            Self::open_csv_dir(path)
        } else {
            Self::open_spreadsheet(path)
        }
    }

    pub fn open_spreadsheet(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| anyhow!("Failed to open spreadsheet {}: {e}", path.display()))?;

        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| anyhow!("Failed to read sheet '{name}': {e}"))?;
            let rows = range
                .rows()
                .map(|row| row.iter().map(Cell::from).collect())
                .collect();
            sheets.push(Sheet { name, rows });
        }

        Ok(Workbook { sheets })
    }

    /// Every `*.csv` file in `dir` becomes a sheet named after the file stem.
    pub fn open_csv_dir(dir: &Path) -> Result<Self> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .collect();
        paths.sort();

        let mut sheets = Vec::new();
        for path in paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let file = std::fs::File::open(&path)
                .with_context(|| format!("Failed to open file: {}", path.display()))?;
            sheets.push(Sheet::from_csv(name, file)?);
        }

        Ok(Workbook { sheets })
    }

    #[must_use]
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Case-insensitive sheet lookup, ignoring surrounding whitespace.
    #[must_use]
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name.trim().eq_ignore_ascii_case(name.trim()))
    }
}
