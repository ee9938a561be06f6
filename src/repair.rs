//! Repairs the raw JSON exports into the tables the report reads.
//!
//! The exports carry two kinds of damage: `a` and `o` were replaced by `æ` and `ø` in the name
//! columns, and vehicle sales counts were sometimes written as strings. Each repaired table is
//! written back as pretty JSON and as CSV, and can be listed record by record in its own PDF.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde_json::{Map, Number, Value};

use crate::error::{BoxedCause, ReportError};
use crate::fonts::FontSource;
use crate::model::{FieldList, Page, RecordsPage, ReportDocument};
use crate::records::columns::{BRAND_NAME, UNITS_SOLD, VEHICLE_NAME};
use crate::records::repair_text;
use crate::report;

/// The two exported tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableKind {
    Vehicles,
    Brands,
}

impl TableKind {
    fn name(self) -> &'static str {
        match self {
            Self::Vehicles => "vehicle",
            Self::Brands => "brand",
        }
    }

    /// Heading of the record listing PDF.
    pub fn records_title(self) -> &'static str {
        match self {
            Self::Vehicles => "Vehicle Records",
            Self::Brands => "Brand Records",
        }
    }

    fn text_column(self) -> &'static str {
        match self {
            Self::Vehicles => VEHICLE_NAME,
            Self::Brands => BRAND_NAME,
        }
    }
}

/// Where one table is read from and where its repaired forms are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepairTarget {
    pub source: PathBuf,
    pub json: PathBuf,
    pub csv: PathBuf,
    pub records: PathBuf,
}

/// Repair targets for both tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepairConfig {
    pub vehicles: RepairTarget,
    pub brands: RepairTarget,
}

impl RepairConfig {
    pub fn targets(&self) -> [(TableKind, &RepairTarget); 2] {
        [
            (TableKind::Vehicles, &self.vehicles),
            (TableKind::Brands, &self.brands),
        ]
    }
}

/// A repaired table with its rows in export order and columns in export order.
#[derive(Clone, Debug, PartialEq)]
pub struct RepairedTable {
    pub kind: TableKind,
    pub rows: Vec<Map<String, Value>>,
}

impl RepairedTable {
    /// Column names, taken from the first row.
    pub fn header(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|row| row.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Lists every row as `field: value` pairs under the table's heading.
    pub fn records_document(&self) -> ReportDocument {
        let page = self.rows.iter().fold(
            RecordsPage::new(self.kind.records_title()),
            |page, row| {
                let fields: FieldList = row
                    .iter()
                    .map(|(name, value)| (name.clone(), cell_text(value)))
                    .collect();
                page.with_record(fields)
            },
        );
        ReportDocument::new(self.kind.records_title()).with_page(Page::Records(page))
    }
}

/// Reads and repairs one raw export.
pub fn repair_table(kind: TableKind, source: impl AsRef<Path>) -> Result<RepairedTable, ReportError> {
    let source = source.as_ref();
    let bytes = fs::read(source).map_err(|err| ReportError::input_io(source, err))?;
    let values: Vec<Value> =
        serde_json::from_slice(&bytes).map_err(|err| ReportError::InputUnparsable {
            table: kind.name(),
            path: source.to_path_buf(),
            source: Box::new(err),
        })?;

    let malformed = |row: usize, cause: BoxedCause| ReportError::InputMalformed {
        table: kind.name(),
        path: source.to_path_buf(),
        row,
        source: cause,
    };

    let mut rows = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        let Value::Object(mut row) = value else {
            return Err(malformed(index + 1, "record is not a JSON object".into()));
        };

        if let Some(Value::String(text)) = row.get_mut(kind.text_column()) {
            *text = repair_text(text);
        }
        if kind == TableKind::Vehicles {
            if let Some(units) = row.get_mut(UNITS_SOLD) {
                if let Some(text) = units.as_str() {
                    let number = parse_number(text).map_err(|cause| malformed(index + 1, cause))?;
                    *units = number;
                }
            }
        }
        rows.push(row);
    }

    debug!("Repaired {} {} rows from {}", rows.len(), kind.name(), source.display());
    Ok(RepairedTable { kind, rows })
}

fn parse_number(text: &str) -> Result<Value, BoxedCause> {
    let text = text.trim();
    if let Ok(integer) = text.parse::<i64>() {
        return Ok(Value::from(integer));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| format!("'{}' is not a number", text).into())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Writes the table as pretty-printed JSON with two-space indentation.
pub fn write_json(table: &RepairedTable, path: impl AsRef<Path>) -> Result<(), ReportError> {
    let path = path.as_ref();
    let bytes = serde_json::to_vec_pretty(&table.rows)
        .map_err(|err| ReportError::output_io(path, err.into()))?;
    fs::write(path, bytes).map_err(|err| ReportError::output_io(path, err))
}

/// Writes the table as CSV with the first row's keys as header.
///
/// Cells missing from a later row are left empty; extra keys are not written.
pub fn write_csv(table: &RepairedTable, path: impl AsRef<Path>) -> Result<(), ReportError> {
    let path = path.as_ref();
    let to_output = |err: csv::Error| ReportError::output_io(path, err.into());

    let mut writer = csv::Writer::from_path(path).map_err(to_output)?;
    let header = table.header();
    writer.write_record(&header).map_err(to_output)?;
    for row in &table.rows {
        let cells = header
            .iter()
            .map(|column| row.get(*column).map(cell_text).unwrap_or_default());
        writer.write_record(cells).map_err(to_output)?;
    }
    writer
        .flush()
        .map_err(|err| ReportError::output_io(path, err))
}

/// Repairs every table whose raw export exists and writes its JSON and CSV forms.
///
/// A missing export is skipped, so runs that start from already repaired CSV files still work.
pub fn repair_exports(config: &RepairConfig) -> Result<Vec<RepairedTable>, ReportError> {
    let mut repaired = Vec::new();
    for (kind, target) in config.targets() {
        if !target.source.is_file() {
            info!(
                "No raw {} export at {}; using existing tables",
                kind.name(),
                target.source.display()
            );
            continue;
        }

        let table = repair_table(kind, &target.source)?;
        write_json(&table, &target.json)?;
        write_csv(&table, &target.csv)?;
        info!(
            "Repaired {} table: {} and {}",
            kind.name(),
            target.json.display(),
            target.csv.display()
        );
        repaired.push(table);
    }
    Ok(repaired)
}

/// Writes the record listing PDF of each repaired table.
pub fn write_record_reports(
    tables: &[RepairedTable],
    config: &RepairConfig,
    fonts: &FontSource,
) -> Result<(), ReportError> {
    for table in tables {
        let target = match table.kind {
            TableKind::Vehicles => &config.vehicles,
            TableKind::Brands => &config.brands,
        };
        report::write_report(&table.records_document(), fonts, &target.records)?;
    }
    Ok(())
}
