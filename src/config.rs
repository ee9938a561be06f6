//! File locations and join policy for a report run.
//!
//! The report has no runtime options; [`ReportConfig::default`] carries the fixed file names and
//! every stage receives the part of the configuration it needs instead of hard-coding paths.

use std::path::{Path, PathBuf};

use crate::repair::{RepairConfig, RepairTarget};

const VEHICLES_STEM: &str = "broken_database_1";
const BRANDS_STEM: &str = "broken_database_2";
const REPAIRED_PREFIX: &str = "corrigido_";
const RECORDS_PREFIX: &str = "relatorio_";
const VEHICLES_FILE: &str = "corrigido_broken_database_1.csv";
const BRANDS_FILE: &str = "corrigido_broken_database_2.csv";
const PRICE_BANDS_CHART_FILE: &str = "chart_price_bands.png";
const LOWEST_TICKET_CHART_FILE: &str = "chart_lowest_ticket.png";
const REVENUE_PER_BRAND_CHART_FILE: &str = "chart_revenue_per_brand.png";
const REPORT_FILE: &str = "sales_report.pdf";

/// How vehicles without a matching brand are treated by the join.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JoinMode {
    /// Unmatched vehicles are dropped and counted.
    #[default]
    Inner,
    /// Any unmatched vehicle aborts the run.
    Strict,
}

/// Locations of the two input tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputPaths {
    pub vehicles: PathBuf,
    pub brands: PathBuf,
}

/// Locations of the three chart images.
///
/// The chart renderer writes these files and the report assembler reads them back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartPaths {
    pub price_bands: PathBuf,
    pub lowest_ticket: PathBuf,
    pub revenue_per_brand: PathBuf,
}

impl ChartPaths {
    /// Returns the paths in the order the charts appear in the report.
    pub fn all(&self) -> [&Path; 3] {
        [
            self.price_bands.as_path(),
            self.lowest_ticket.as_path(),
            self.revenue_per_brand.as_path(),
        ]
    }
}

/// Complete configuration of one report run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportConfig {
    /// Raw exports to repair before loading; `None` reads the input tables as they are.
    pub repair: Option<RepairConfig>,
    pub inputs: InputPaths,
    pub join_mode: JoinMode,
    pub charts: ChartPaths,
    pub report: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self::in_dir("")
    }
}

impl ReportConfig {
    /// Builds the default configuration with every file placed under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let vehicles = dir.join(VEHICLES_FILE);
        let brands = dir.join(BRANDS_FILE);
        Self {
            repair: Some(RepairConfig {
                vehicles: repair_target(dir, VEHICLES_STEM, &vehicles),
                brands: repair_target(dir, BRANDS_STEM, &brands),
            }),
            inputs: InputPaths { vehicles, brands },
            join_mode: JoinMode::default(),
            charts: ChartPaths {
                price_bands: dir.join(PRICE_BANDS_CHART_FILE),
                lowest_ticket: dir.join(LOWEST_TICKET_CHART_FILE),
                revenue_per_brand: dir.join(REVENUE_PER_BRAND_CHART_FILE),
            },
            report: dir.join(REPORT_FILE),
        }
    }

    /// Skips the repair stage and returns the updated configuration.
    pub fn without_repair(mut self) -> Self {
        self.repair = None;
        self
    }

    /// Sets the join mode and returns the updated configuration.
    pub fn with_join_mode(mut self, join_mode: JoinMode) -> Self {
        self.join_mode = join_mode;
        self
    }
}

/// Raw export `<stem>.json`, repaired `corrigido_<stem>.json`, the CSV the loader reads and the
/// record listing `relatorio_<stem>.pdf`.
fn repair_target(dir: &Path, stem: &str, csv: &Path) -> RepairTarget {
    RepairTarget {
        source: dir.join(format!("{}.json", stem)),
        json: dir.join(format!("{}{}.json", REPAIRED_PREFIX, stem)),
        csv: csv.to_path_buf(),
        records: dir.join(format!("{}{}.pdf", RECORDS_PREFIX, stem)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_are_relative_file_names() {
        let config = ReportConfig::default();
        assert_eq!(config.inputs.vehicles, PathBuf::from(VEHICLES_FILE));
        assert_eq!(config.report, PathBuf::from(REPORT_FILE));
        assert_eq!(config.join_mode, JoinMode::Inner);
    }

    #[test]
    fn in_dir_roots_every_path() {
        let config = ReportConfig::in_dir("/tmp/run");
        let root = Path::new("/tmp/run");
        assert!(config.inputs.brands.starts_with(root));
        assert!(config.charts.all().iter().all(|path| path.starts_with(root)));
        assert!(config.report.starts_with(root));
    }

    #[test]
    fn repaired_csv_is_the_loader_input() {
        let config = ReportConfig::in_dir("/tmp/run");
        let repair = config.repair.as_ref().unwrap();
        assert_eq!(repair.vehicles.csv, config.inputs.vehicles);
        assert_eq!(repair.brands.csv, config.inputs.brands);
        assert_eq!(
            repair.vehicles.source,
            Path::new("/tmp/run/broken_database_1.json")
        );
        assert_eq!(
            repair.brands.json,
            Path::new("/tmp/run/corrigido_broken_database_2.json")
        );
        assert_eq!(
            repair.brands.records,
            Path::new("/tmp/run/relatorio_broken_database_2.pdf")
        );
        assert!(config.without_repair().repair.is_none());
    }
}
