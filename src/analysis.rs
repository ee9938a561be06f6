//! Joins the input tables and computes the aggregate views shown in the report.
//!
//! Every view is a plain ordered `Vec`; the report and charts consume them in the order produced
//! here. Grouping goes through `BTreeMap` keyed by brand name or band so group order, and therefore
//! tie-breaking, is deterministic.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};

use crate::config::JoinMode;
use crate::error::ReportError;
use crate::loader::Tables;
use crate::records::{BrandRecord, ConsolidatedRecord, VehicleRecord};

/// Number of brands listed in the lowest average ticket view.
pub const LOWEST_TICKET_COUNT: usize = 3;

/// Number of vehicles listed in the best sellers view.
pub const TOP_SELLER_COUNT: usize = 5;

/// Result of joining vehicles with brands.
#[derive(Clone, Debug, PartialEq)]
pub struct Join {
    pub records: Vec<ConsolidatedRecord>,
    /// Vehicles dropped because their brand id had no match.
    pub dropped: usize,
}

/// Units sold by one brand.
#[derive(Clone, Debug, PartialEq)]
pub struct BrandUnits {
    pub brand: String,
    pub units: u64,
}

/// Units sold within one price band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceBandUnits {
    /// Lower bound of the band.
    pub band: i64,
    pub units: u64,
}

/// Mean unit price of one brand.
#[derive(Clone, Debug, PartialEq)]
pub struct BrandTicket {
    pub brand: String,
    pub mean_price: f64,
}

/// Total revenue of one brand.
#[derive(Clone, Debug, PartialEq)]
pub struct BrandRevenue {
    pub brand: String,
    pub revenue: f64,
}

/// All aggregate views computed from one pair of input tables.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub records: Vec<ConsolidatedRecord>,
    pub dropped_rows: usize,
    pub volume_leader: BrandUnits,
    pub max_revenue: ConsolidatedRecord,
    pub min_revenue: ConsolidatedRecord,
    pub price_bands: Vec<PriceBandUnits>,
    pub lowest_ticket: Vec<BrandTicket>,
    pub top_sellers: Vec<ConsolidatedRecord>,
    pub revenue_per_brand: Vec<BrandRevenue>,
}

/// Joins the tables and computes every view.
pub fn analyze(tables: &Tables, mode: JoinMode) -> Result<Analysis, ReportError> {
    let Join { records, dropped } = join(&tables.vehicles, &tables.brands, mode)?;
    if records.is_empty() {
        return Err(ReportError::AggregationEmpty { view: "join" });
    }

    let volume_leader = volume_leader(&records)?;
    let (max_revenue, min_revenue) = revenue_extremes(&records)?;
    let analysis = Analysis {
        dropped_rows: dropped,
        volume_leader,
        max_revenue: max_revenue.clone(),
        min_revenue: min_revenue.clone(),
        price_bands: price_bands(&records)?,
        lowest_ticket: lowest_ticket(&records),
        top_sellers: top_sellers(&records),
        revenue_per_brand: revenue_per_brand(&records),
        records,
    };

    info!(
        "Analyzed {} joined rows: volume leader {} ({} units), {} price bands, {} brands",
        analysis.records.len(),
        analysis.volume_leader.brand,
        analysis.volume_leader.units,
        analysis.price_bands.len(),
        analysis.revenue_per_brand.len()
    );
    Ok(analysis)
}

/// Inner join of vehicles and brands on brand id.
///
/// Output follows vehicle order; a vehicle whose id appears on several brand rows yields one
/// record per brand row, in brand table order.
pub fn join(
    vehicles: &[VehicleRecord],
    brands: &[BrandRecord],
    mode: JoinMode,
) -> Result<Join, ReportError> {
    let mut by_id: HashMap<u64, Vec<&BrandRecord>> = HashMap::new();
    for brand in brands {
        by_id.entry(brand.brand_id).or_default().push(brand);
    }

    let mut records = Vec::with_capacity(vehicles.len());
    let mut unmatched = Vec::new();
    for vehicle in vehicles {
        match by_id.get(&vehicle.brand_id) {
            Some(matches) => records.extend(
                matches
                    .iter()
                    .map(|brand| ConsolidatedRecord::join(vehicle, brand)),
            ),
            None => unmatched.push(vehicle.brand_id),
        }
    }

    if !unmatched.is_empty() {
        match mode {
            JoinMode::Inner => warn!(
                "Dropped {} vehicle row(s) with no matching brand (brand ids: {:?})",
                unmatched.len(),
                unmatched
            ),
            JoinMode::Strict => {
                let count = unmatched.len();
                unmatched.sort_unstable();
                unmatched.dedup();
                return Err(ReportError::UnmatchedBrand {
                    count,
                    ids: unmatched,
                });
            }
        }
    }

    debug!("Joined {} rows", records.len());
    Ok(Join {
        records,
        dropped: unmatched.len(),
    })
}

/// Sums units sold per key, failing instead of wrapping when a total leaves the `u64` range.
fn units_by<'a, K, F>(
    records: &'a [ConsolidatedRecord],
    view: &'static str,
    key: F,
) -> Result<BTreeMap<K, u64>, ReportError>
where
    K: Ord,
    F: Fn(&'a ConsolidatedRecord) -> K,
{
    let mut totals: BTreeMap<K, u64> = BTreeMap::new();
    for record in records {
        let total = totals.entry(key(record)).or_default();
        *total = total
            .checked_add(record.units_sold)
            .ok_or(ReportError::UnitsOverflow { view })?;
    }
    Ok(totals)
}

/// Brand with the most units sold; ties go to the alphabetically first brand.
pub fn volume_leader(records: &[ConsolidatedRecord]) -> Result<BrandUnits, ReportError> {
    let totals = units_by(records, "volume leader", |record| record.brand_name.as_str())?;

    let mut leader: Option<(&str, u64)> = None;
    for (brand, units) in totals {
        if leader.map_or(true, |(_, best)| units > best) {
            leader = Some((brand, units));
        }
    }

    leader
        .map(|(brand, units)| BrandUnits {
            brand: brand.to_string(),
            units,
        })
        .ok_or(ReportError::AggregationEmpty {
            view: "volume leader",
        })
}

/// Rows with the highest and lowest revenue; ties go to the earliest row.
pub fn revenue_extremes(
    records: &[ConsolidatedRecord],
) -> Result<(&ConsolidatedRecord, &ConsolidatedRecord), ReportError> {
    let mut iter = records.iter();
    let first = iter.next().ok_or(ReportError::AggregationEmpty {
        view: "revenue extremes",
    })?;

    let (mut max, mut min) = (first, first);
    for record in iter {
        if record.revenue > max.revenue {
            max = record;
        }
        if record.revenue < min.revenue {
            min = record;
        }
    }
    Ok((max, min))
}

/// Units sold per observed price band, ascending by band.
pub fn price_bands(records: &[ConsolidatedRecord]) -> Result<Vec<PriceBandUnits>, ReportError> {
    let bands = units_by(records, "price bands", |record| record.price_band)?;
    Ok(bands
        .into_iter()
        .map(|(band, units)| PriceBandUnits { band, units })
        .collect())
}

/// Mean unit price per brand, in brand name order.
pub fn mean_ticket_per_brand(records: &[ConsolidatedRecord]) -> Vec<BrandTicket> {
    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(record.brand_name.as_str()).or_default();
        entry.0 += record.unit_price;
        entry.1 += 1;
    }
    groups
        .into_iter()
        .map(|(brand, (sum, count))| BrandTicket {
            brand: brand.to_string(),
            mean_price: sum / count as f64,
        })
        .collect()
}

/// The brands with the lowest mean unit price, ascending; ties keep brand name order.
pub fn lowest_ticket(records: &[ConsolidatedRecord]) -> Vec<BrandTicket> {
    let mut tickets = mean_ticket_per_brand(records);
    tickets.sort_by(|a, b| {
        a.mean_price
            .partial_cmp(&b.mean_price)
            .unwrap_or(Ordering::Equal)
    });
    tickets.truncate(LOWEST_TICKET_COUNT);
    tickets
}

/// The best-selling rows, descending by units; ties keep join order.
pub fn top_sellers(records: &[ConsolidatedRecord]) -> Vec<ConsolidatedRecord> {
    let mut sorted: Vec<&ConsolidatedRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.units_sold.cmp(&a.units_sold));
    sorted
        .into_iter()
        .take(TOP_SELLER_COUNT)
        .cloned()
        .collect()
}

/// Total revenue per brand, in brand name order.
pub fn revenue_per_brand(records: &[ConsolidatedRecord]) -> Vec<BrandRevenue> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for record in records {
        *totals.entry(record.brand_name.as_str()).or_default() += record.revenue;
    }
    totals
        .into_iter()
        .map(|(brand, revenue)| BrandRevenue {
            brand: brand.to_string(),
            revenue,
        })
        .collect()
}
