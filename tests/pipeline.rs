use std::fs;
use std::path::Path;

use sales_report::config::{JoinMode, ReportConfig};
use sales_report::{fonts, pipeline, ReportError};
use sha2::{Digest, Sha256};

const VEHICLES_CSV: &str = "\
nome,id_marca_,vendas,valor_do_veiculo
Gol,1,120,45000
Polo,1,80,72000
Onix,2,150,68000
Kwid,3,95,39000
Argo,4,60,52000
Mobi,4,70,41000
Phantom,9,10,99000
";

const BRANDS_CSV: &str = "\
id_marca,marca
1,VW
2,Chevrolet
3,Renault
4,Fiat
";

const VEHICLES_JSON: &str = r#"[
  {"id": 1, "nome": "Gøl", "vendas": "120", "valor_do_veiculo": 45000, "id_marca_": 1},
  {"id": 2, "nome": "Pølo", "vendas": 80, "valor_do_veiculo": 72000, "id_marca_": 1},
  {"id": 3, "nome": "Onix", "vendas": "150", "valor_do_veiculo": 68000, "id_marca_": 2},
  {"id": 4, "nome": "Kwid", "vendas": 95, "valor_do_veiculo": 39000, "id_marca_": 3}
]"#;

const BRANDS_JSON: &str = r#"[
  {"id_marca": 1, "marca": "Vølkswægen"},
  {"id_marca": 2, "marca": "Chevrolet"},
  {"id_marca": 3, "marca": "Renæult"}
]"#;

const SKIP_NOTE: &str =
    "bundled fonts missing. Set SALES_REPORT_FONTS_DIR or copy assets/fonts next to the binary.";

fn write_inputs(dir: &Path) -> ReportConfig {
    let config = ReportConfig::in_dir(dir);
    fs::write(&config.inputs.vehicles, VEHICLES_CSV).unwrap();
    fs::write(&config.inputs.brands, BRANDS_CSV).unwrap();
    config
}

/// Number of `/Type /Page` objects, excluding the `/Pages` tree nodes.
fn page_count(pdf: &[u8]) -> usize {
    count_entries(pdf, b"/Type", b"/Page")
}

/// Number of image XObjects embedded in the PDF.
fn image_count(pdf: &[u8]) -> usize {
    count_entries(pdf, b"/Subtype", b"/Image")
}

fn count_entries(pdf: &[u8], key: &[u8], value: &[u8]) -> usize {
    let mut count = 0;
    let mut index = 0;
    while let Some(offset) = find(&pdf[index..], key) {
        let mut cursor = index + offset + key.len();
        while cursor < pdf.len() && pdf[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        let rest = &pdf[cursor..];
        if rest.starts_with(value)
            && !rest
                .get(value.len())
                .is_some_and(|next| next.is_ascii_alphanumeric())
        {
            count += 1;
        }
        index = cursor;
    }
    count
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn file_hash(path: &Path) -> [u8; 32] {
    Sha256::digest(fs::read(path).unwrap()).into()
}

#[test]
fn writes_charts_and_report() {
    if !fonts::default_fonts_available() {
        eprintln!("Skipping writes_charts_and_report: {}", SKIP_NOTE);
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(dir.path());

    let analysis = pipeline::run(&config).expect("pipeline run");

    assert_eq!(analysis.dropped_rows, 1);
    assert_eq!(analysis.volume_leader.brand, "VW");
    assert_eq!(analysis.volume_leader.units, 200);
    assert_eq!(analysis.top_sellers[0].vehicle_name, "Onix");

    for chart in config.charts.all() {
        let bytes = fs::read(chart).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"), "{} is not a PNG", chart.display());
    }
    let pdf = fs::read(&config.report).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    assert_eq!(page_count(&pdf), 2, "summary page plus best-sellers table");
    assert_eq!(image_count(&pdf), 3, "one embedded image per chart");
}

#[test]
fn repeated_runs_produce_identical_output() {
    if !fonts::default_fonts_available() {
        eprintln!("Skipping repeated_runs_produce_identical_output: {}", SKIP_NOTE);
        return;
    }
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let config_a = write_inputs(first.path());
    let config_b = write_inputs(second.path());

    pipeline::run(&config_a).expect("first run");
    pipeline::run(&config_b).expect("second run");

    let analysis_a = pipeline::run(&config_a).expect("first run");
    let analysis_b = pipeline::run(&config_b).expect("second run");
    assert_eq!(analysis_a, analysis_b);

    for (a, b) in config_a.charts.all().iter().zip(config_b.charts.all().iter()) {
        assert_eq!(file_hash(a), file_hash(b), "chart {} differs", a.display());
    }
}

#[test]
fn raw_exports_are_repaired_before_the_report() {
    if !fonts::default_fonts_available() {
        eprintln!("Skipping raw_exports_are_repaired_before_the_report: {}", SKIP_NOTE);
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let config = ReportConfig::in_dir(dir.path());
    let repair = config.repair.clone().unwrap();
    fs::write(&repair.vehicles.source, VEHICLES_JSON).unwrap();
    fs::write(&repair.brands.source, BRANDS_JSON).unwrap();

    let analysis = pipeline::run(&config).expect("pipeline run");

    assert_eq!(analysis.volume_leader.brand, "Volkswagen");
    assert_eq!(analysis.volume_leader.units, 200);
    assert_eq!(analysis.top_sellers[0].vehicle_name, "Onix");

    let vehicles_csv = fs::read_to_string(&config.inputs.vehicles).unwrap();
    assert!(vehicles_csv.starts_with("id,nome,vendas,valor_do_veiculo,id_marca_\n"));
    assert!(vehicles_csv.contains("Gol,120,"), "{vehicles_csv}");
    assert!(repair.vehicles.json.is_file());
    assert!(repair.brands.json.is_file());

    for records in [&repair.vehicles.records, &repair.brands.records] {
        let pdf = fs::read(records).unwrap();
        assert!(pdf.starts_with(b"%PDF"), "{} is not a PDF", records.display());
        assert_eq!(image_count(&pdf), 0);
    }
    assert!(config.report.is_file());
}

#[test]
fn missing_brand_table_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = ReportConfig::in_dir(dir.path());
    fs::write(&config.inputs.vehicles, VEHICLES_CSV).unwrap();

    match pipeline::run(&config) {
        Err(ReportError::InputNotFound { path }) => assert_eq!(path, config.inputs.brands),
        other => panic!("expected InputNotFound, got {:?}", other.map(|_| ())),
    }
    for chart in config.charts.all() {
        assert!(!chart.exists());
    }
}

#[test]
fn strict_join_rejects_unknown_brand() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(dir.path()).with_join_mode(JoinMode::Strict);

    match pipeline::run(&config) {
        Err(ReportError::UnmatchedBrand { ids, .. }) => assert_eq!(ids, vec![9]),
        other => panic!("expected UnmatchedBrand, got {:?}", other.map(|_| ())),
    }
    assert!(!config.report.exists());
}
