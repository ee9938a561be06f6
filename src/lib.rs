//! Batch sales report generator.
//!
//! One run repairs the raw JSON exports when present ([`repair`]), loads the vehicle and brand
//! tables ([`loader`]), joins and aggregates them ([`analysis`]), draws three bar charts
//! ([`chart`]) and writes a two-page PDF ([`report`]).
//! [`pipeline::run`] chains the stages using the paths in [`config::ReportConfig`].

pub mod analysis;
pub mod builder;
pub mod chart;
pub mod config;
pub mod elements;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod records;
pub mod repair;
pub mod report;

pub use config::{JoinMode, ReportConfig};
pub use error::ReportError;
