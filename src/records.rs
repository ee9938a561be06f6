//! Row types for the two input tables and the joined table.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

/// Column names used by the input tables.
pub mod columns {
    /// Vehicle name.
    pub const VEHICLE_NAME: &str = "nome";
    /// Brand identifier shared by both tables.
    pub const BRAND_ID: &str = "id_marca";
    /// Misspelled brand identifier header found in vehicle exports.
    pub const LEGACY_BRAND_ID: &str = "id_marca_";
    /// Units sold.
    pub const UNITS_SOLD: &str = "vendas";
    /// Unit price.
    pub const UNIT_PRICE: &str = "valor_do_veiculo";
    /// Brand name.
    pub const BRAND_NAME: &str = "marca";
}

/// Width of a price band.
pub const PRICE_BAND_WIDTH: f64 = 10_000.0;

/// One row of the vehicle table.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct VehicleRecord {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "id_marca", deserialize_with = "lenient_count")]
    pub brand_id: u64,
    #[serde(rename = "vendas", deserialize_with = "lenient_count")]
    pub units_sold: u64,
    #[serde(rename = "valor_do_veiculo", deserialize_with = "lenient_amount")]
    pub unit_price: f64,
}

impl VehicleRecord {
    pub fn new(name: impl Into<String>, brand_id: u64, units_sold: u64, unit_price: f64) -> Self {
        Self {
            name: name.into(),
            brand_id,
            units_sold,
            unit_price,
        }
    }

    /// Returns the record with its text fields repaired.
    pub fn repaired(mut self) -> Self {
        self.name = repair_text(&self.name);
        self
    }
}

/// One row of the brand table.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BrandRecord {
    #[serde(rename = "id_marca", deserialize_with = "lenient_count")]
    pub brand_id: u64,
    #[serde(rename = "marca")]
    pub name: String,
}

impl BrandRecord {
    pub fn new(brand_id: u64, name: impl Into<String>) -> Self {
        Self {
            brand_id,
            name: name.into(),
        }
    }

    /// Returns the record with its text fields repaired.
    pub fn repaired(mut self) -> Self {
        self.name = repair_text(&self.name);
        self
    }
}

/// A vehicle joined with its brand, plus the derived revenue and price band.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsolidatedRecord {
    pub vehicle_name: String,
    pub brand_id: u64,
    pub brand_name: String,
    pub units_sold: u64,
    pub unit_price: f64,
    pub revenue: f64,
    pub price_band: i64,
}

impl ConsolidatedRecord {
    pub fn join(vehicle: &VehicleRecord, brand: &BrandRecord) -> Self {
        Self {
            vehicle_name: vehicle.name.clone(),
            brand_id: vehicle.brand_id,
            brand_name: brand.name.clone(),
            units_sold: vehicle.units_sold,
            unit_price: vehicle.unit_price,
            revenue: vehicle.units_sold as f64 * vehicle.unit_price,
            price_band: price_band(vehicle.unit_price),
        }
    }
}

/// Lower bound of the price band containing `unit_price`.
pub fn price_band(unit_price: f64) -> i64 {
    ((unit_price / PRICE_BAND_WIDTH).floor() * PRICE_BAND_WIDTH) as i64
}

/// Replaces the corrupted `æ`/`ø` characters found in exported names and trims the result.
pub fn repair_text(text: &str) -> String {
    text.trim()
        .chars()
        .map(|c| match c {
            'æ' => 'a',
            'Æ' => 'A',
            'ø' => 'o',
            'Ø' => 'O',
            other => other,
        })
        .collect()
}

struct CountVisitor;

impl<'de> Visitor<'de> for CountVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative whole number")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
        Ok(value)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
        u64::try_from(value).map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<u64, E> {
        if value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
            Ok(value as u64)
        } else {
            Err(E::invalid_value(de::Unexpected::Float(value), &self))
        }
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
        let trimmed = value.trim();
        if let Ok(parsed) = trimmed.parse::<u64>() {
            return Ok(parsed);
        }
        match trimmed.parse::<f64>() {
            Ok(parsed) => self.visit_f64(parsed),
            Err(_) => Err(E::invalid_value(de::Unexpected::Str(value), &self)),
        }
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = f64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<f64, E> {
        Ok(value as f64)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<f64, E> {
        Ok(value as f64)
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<f64, E> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(E::invalid_value(de::Unexpected::Float(value), &self))
        }
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<f64, E> {
        match value.trim().parse::<f64>() {
            Ok(parsed) => self.visit_f64(parsed),
            Err(_) => Err(E::invalid_value(de::Unexpected::Str(value), &self)),
        }
    }
}

// Exports carry numbers either as numbers or as numeric strings.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    deserializer.deserialize_any(CountVisitor)
}

fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    deserializer.deserialize_any(AmountVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_band_floors_to_lower_bound() {
        assert_eq!(price_band(15_000.0), 10_000);
        assert_eq!(price_band(25_000.0), 20_000);
        assert_eq!(price_band(9_999.99), 0);
        assert_eq!(price_band(30_000.0), 30_000);
    }

    #[test]
    fn repair_replaces_corrupted_letters() {
        assert_eq!(repair_text(" Vølkswægen "), "Volkswagen");
        assert_eq!(repair_text("ØMNI Æ"), "OMNI A");
    }

    #[test]
    fn join_derives_revenue_and_band() {
        let vehicle = VehicleRecord::new("A", 1, 10, 15_000.0);
        let brand = BrandRecord::new(1, "X");
        let joined = ConsolidatedRecord::join(&vehicle, &brand);
        assert_eq!(joined.brand_name, "X");
        assert_eq!(joined.revenue, 150_000.0);
        assert_eq!(joined.price_band, 10_000);
    }

    #[test]
    fn numbers_accept_strings_and_whole_floats() {
        let json = r#"{"nome":"A","id_marca":"3","vendas":12.0,"valor_do_veiculo":"15000.5"}"#;
        let vehicle: VehicleRecord = serde_json::from_str(json).unwrap();
        assert_eq!(vehicle.brand_id, 3);
        assert_eq!(vehicle.units_sold, 12);
        assert_eq!(vehicle.unit_price, 15_000.5);
    }

    #[test]
    fn fractional_units_are_rejected() {
        let json = r#"{"nome":"A","id_marca":1,"vendas":1.5,"valor_do_veiculo":1}"#;
        assert!(serde_json::from_str::<VehicleRecord>(json).is_err());
    }
}
