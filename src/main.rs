use std::error::Error;
use std::io::Write;

use clap::Parser;
use env_logger::{Builder, Env};

use sales_report::ReportConfig;

/// Builds the consolidated sales report from the corrected vehicle and brand tables.
///
/// Repairs `broken_database_1.json` and `broken_database_2.json` when they exist in the working
/// directory, then reads `corrigido_broken_database_1.csv` and `corrigido_broken_database_2.csv`
/// and writes three chart images plus `sales_report.pdf` next to them.
/// Fonts are looked up under `assets/fonts` or `SALES_REPORT_FONTS_DIR`; set `RUST_LOG` to
/// change log verbosity.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {}

fn main() {
    Cli::parse();
    init_logging();

    let config = ReportConfig::default();
    match sales_report::pipeline::run(&config) {
        Ok(_) => println!("Report generated: {}", config.report.display()),
        Err(err) => {
            eprintln!("Error: {}", err);
            print_error_sources(&err);
            std::process::exit(1);
        }
    }
}

fn init_logging() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
