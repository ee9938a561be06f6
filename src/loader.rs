//! Reads the vehicle and brand tables from disk.
//!
//! Tables are CSV unless the file has a `.json` extension, in which case it must hold an array of
//! objects. In both formats the misspelled `id_marca_` header is renamed to `id_marca` before the
//! required columns are checked.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::InputPaths;
use crate::error::ReportError;
use crate::records::{columns, BrandRecord, VehicleRecord};

/// Header renames applied to every table.
const COLUMN_RENAMES: &[(&str, &str)] = &[(columns::LEGACY_BRAND_ID, columns::BRAND_ID)];

/// Expected layout of one input table.
struct TableSchema {
    name: &'static str,
    required: &'static [&'static str],
}

const VEHICLE_SCHEMA: TableSchema = TableSchema {
    name: "vehicle",
    required: &[
        columns::VEHICLE_NAME,
        columns::BRAND_ID,
        columns::UNITS_SOLD,
        columns::UNIT_PRICE,
    ],
};

const BRAND_SCHEMA: TableSchema = TableSchema {
    name: "brand",
    required: &[columns::BRAND_ID, columns::BRAND_NAME],
};

impl TableSchema {
    fn check<'a>(
        &self,
        path: &Path,
        headers: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ReportError> {
        let present: HashSet<&str> = headers.into_iter().collect();
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|column| !present.contains(*column))
            .map(|column| column.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ReportError::InputSchemaMismatch {
                table: self.name,
                path: path.to_path_buf(),
                missing,
            })
        }
    }
}

/// Maps a raw header to the name used by the record types.
fn canonical_column(header: &str) -> &str {
    let header = header.trim();
    COLUMN_RENAMES
        .iter()
        .find(|(from, _)| *from == header)
        .map(|(_, to)| *to)
        .unwrap_or(header)
}

/// Both input tables.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tables {
    pub vehicles: Vec<VehicleRecord>,
    pub brands: Vec<BrandRecord>,
}

/// Loads both input tables.
pub fn load_tables(inputs: &InputPaths) -> Result<Tables, ReportError> {
    let vehicles = load_vehicles(&inputs.vehicles)?;
    let brands = load_brands(&inputs.brands)?;
    info!(
        "Loaded {} vehicle rows from {} and {} brand rows from {}",
        vehicles.len(),
        inputs.vehicles.display(),
        brands.len(),
        inputs.brands.display()
    );
    Ok(Tables { vehicles, brands })
}

/// Loads the vehicle table, repairing corrupted names.
pub fn load_vehicles(path: impl AsRef<Path>) -> Result<Vec<VehicleRecord>, ReportError> {
    let rows: Vec<VehicleRecord> = read_table(path.as_ref(), &VEHICLE_SCHEMA)?;
    Ok(rows.into_iter().map(VehicleRecord::repaired).collect())
}

/// Loads the brand table, repairing corrupted names.
pub fn load_brands(path: impl AsRef<Path>) -> Result<Vec<BrandRecord>, ReportError> {
    let rows: Vec<BrandRecord> = read_table(path.as_ref(), &BRAND_SCHEMA)?;
    Ok(rows.into_iter().map(BrandRecord::repaired).collect())
}

fn read_table<T: DeserializeOwned>(
    path: &Path,
    schema: &TableSchema,
) -> Result<Vec<T>, ReportError> {
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let file = File::open(path).map_err(|err| ReportError::input_io(path, err))?;
    debug!(
        "Reading {} table from {} as {}",
        schema.name,
        path.display(),
        if is_json { "JSON" } else { "CSV" }
    );

    if is_json {
        read_json_table(path, file, schema)
    } else {
        read_csv_table(path, file, schema)
    }
}

fn read_csv_table<T: DeserializeOwned>(
    path: &Path,
    file: File,
    schema: &TableSchema,
) -> Result<Vec<T>, ReportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: csv::StringRecord = reader
        .headers()
        .map_err(|err| malformed(path, schema, 1, err))?
        .iter()
        .map(canonical_column)
        .collect();
    schema.check(path, headers.iter())?;
    reader.set_headers(headers);

    let mut rows = Vec::new();
    for (index, result) in reader.deserialize::<T>().enumerate() {
        // +2: one-based numbering plus the header line
        let row = result.map_err(|err| malformed(path, schema, index + 2, err))?;
        rows.push(row);
    }
    Ok(rows)
}

fn read_json_table<T: DeserializeOwned>(
    path: &Path,
    file: File,
    schema: &TableSchema,
) -> Result<Vec<T>, ReportError> {
    let objects: Vec<Map<String, Value>> =
        serde_json::from_reader(BufReader::new(file)).map_err(|err| {
            ReportError::InputUnparsable {
                table: schema.name,
                path: path.to_path_buf(),
                source: Box::new(err),
            }
        })?;

    let mut rows = Vec::with_capacity(objects.len());
    for (index, object) in objects.into_iter().enumerate() {
        let object: Map<String, Value> = object
            .into_iter()
            .map(|(key, value)| (canonical_column(&key).to_string(), value))
            .collect();
        schema.check(path, object.keys().map(String::as_str))?;

        let row = serde_json::from_value(Value::Object(object))
            .map_err(|err| malformed(path, schema, index + 1, err))?;
        rows.push(row);
    }
    Ok(rows)
}

fn malformed(
    path: &Path,
    schema: &TableSchema,
    row: usize,
    source: impl std::error::Error + Send + Sync + 'static,
) -> ReportError {
    ReportError::InputMalformed {
        table: schema.name,
        path: path.to_path_buf(),
        row,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn renames_legacy_brand_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "vehicles.csv",
            "id_carro,nome,id_marca_,vendas,valor_do_veiculo\n1,Gøl,1,10,15000\n",
        );

        let vehicles = load_vehicles(&path).unwrap();
        assert_eq!(vehicles, vec![VehicleRecord::new("Gol", 1, 10, 15_000.0)]);
    }

    #[test]
    fn missing_columns_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "brands.csv", "id_marca,nome_marca\n1,X\n");

        match load_brands(&path) {
            Err(ReportError::InputSchemaMismatch { table, missing, .. }) => {
                assert_eq!(table, "brand");
                assert_eq!(missing, vec!["marca".to_string()]);
            }
            other => panic!("expected schema mismatch, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_input_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_brands(dir.path().join("absent.csv"));
        assert!(matches!(result, Err(ReportError::InputNotFound { .. })));
    }

    #[test]
    fn malformed_row_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "vehicles.csv",
            "nome,id_marca,vendas,valor_do_veiculo\nA,1,10,15000\nB,1,many,25000\n",
        );

        match load_vehicles(&path) {
            Err(ReportError::InputMalformed { row, .. }) => assert_eq!(row, 3),
            other => panic!("expected malformed row, got {other:?}"),
        }
    }

    #[test]
    fn json_tables_are_supported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "vehicles.json",
            r#"[{"nome":"A","id_marca_":1,"vendas":"10","valor_do_veiculo":15000}]"#,
        );

        let vehicles = load_vehicles(&path).unwrap();
        assert_eq!(vehicles, vec![VehicleRecord::new("A", 1, 10, 15_000.0)]);
    }

    #[test]
    fn unparsable_json_is_a_file_level_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "brands.json", r#"[{"id_marca":1,"marca":"X"}"#);

        match load_brands(&path) {
            Err(err @ ReportError::InputUnparsable { .. }) => {
                let message = err.to_string();
                assert!(message.starts_with("brand table"), "{message}");
                assert!(!message.contains(" row "), "{message}");
            }
            other => panic!("expected unparsable table, got {other:?}"),
        }
    }
}
