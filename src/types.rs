use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::error::{FleetError, Result};
use crate::util::format_number;

/// Unit price assumed when the operator leaves the field blank.
pub const DEFAULT_UNIT_PRICE: f64 = 20.0;

/// One row of the historical dataset as exported, before parsing. Column
/// names match the processed CSV headers verbatim.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "mes")]
    pub month: Option<String>,
    #[serde(rename = "VIN_CODE")]
    pub vin_code: Option<String>,
    #[serde(rename = "CC_CODE")]
    pub cc_code: Option<String>,
    #[serde(rename = "VIN NUMBER")]
    pub vin_label: Option<String>,
    #[serde(rename = "Placa")]
    pub plate: Option<String>,
    #[serde(rename = "CC")]
    pub zone_label: Option<String>,
    #[serde(rename = "Estado")]
    pub state: Option<String>,
    #[serde(rename = "Cantidad Mercancía")]
    pub quantity: Option<String>,
    #[serde(rename = "KG C02")]
    pub kg_co2: Option<String>,
    #[serde(rename = "TON C02")]
    pub ton_co2: Option<String>,
    #[serde(rename = "Arboles")]
    pub trees: Option<String>,
}

/// A fully parsed historical trip row. The set of records is loaded once at
/// startup and is read-only for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct HistoricalRecord {
    /// Date truncated to the first of its month.
    pub month: NaiveDate,
    pub vin_code: u32,
    pub zone_code: u32,
    pub vin_label: String,
    pub plate: String,
    pub zone_label: String,
    pub state: String,
    pub quantity: f64,
    pub kg_co2: f64,
    pub ton_co2: f64,
    pub trees: f64,
}

/// Trip parameters entered by the operator. Validated on construction so
/// downstream code never sees out-of-range values.
#[derive(Debug, Clone)]
pub struct TripFeatures {
    pub distance: f64,
    pub unit_price: f64,
    /// 1..=12
    pub month: u32,
    /// 0 = Monday .. 6 = Sunday
    pub weekday: u32,
}

impl TripFeatures {
    pub fn new(distance: f64, unit_price: f64, month: u32, weekday: u32) -> Result<Self> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(FleetError::InvalidInput(format!(
                "distance must be a non-negative number, got {}",
                distance
            )));
        }
        if !unit_price.is_finite() || unit_price < 0.0 {
            return Err(FleetError::InvalidInput(format!(
                "unit price must be a non-negative number, got {}",
                unit_price
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(FleetError::InvalidInput(format!(
                "month must be in 1..=12, got {}",
                month
            )));
        }
        if weekday > 6 {
            return Err(FleetError::InvalidInput(format!(
                "weekday must be in 0..=6, got {}",
                weekday
            )));
        }
        Ok(TripFeatures {
            distance,
            unit_price,
            month,
            weekday,
        })
    }
}

/// Input to the primary quantity model: trip features plus encoded
/// identifiers. Built fresh per request, never persisted.
#[derive(Debug, Clone)]
pub struct PredictionInput {
    pub trip: TripFeatures,
    pub vin_code: u32,
    pub zone_code: u32,
}

impl PredictionInput {
    pub fn new(trip: TripFeatures, vin_code: u32, zone_code: u32) -> Self {
        PredictionInput {
            trip,
            vin_code,
            zone_code,
        }
    }

    /// Feature vector keyed exactly as the primary model was trained.
    pub fn features(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("distance".to_string(), self.trip.distance),
            ("unit_price".to_string(), self.trip.unit_price),
            ("month".to_string(), self.trip.month as f64),
            ("weekday".to_string(), self.trip.weekday as f64),
            ("vin_code".to_string(), self.vin_code as f64),
            ("cc_code".to_string(), self.zone_code as f64),
        ])
    }
}

/// Input to the five secondary models: the predicted quantity plus the trip
/// distance and encoded identifiers.
#[derive(Debug, Clone)]
pub struct ImpactInput {
    pub quantity: f64,
    pub distance: f64,
    pub vin_code: u32,
    pub zone_code: u32,
}

impl ImpactInput {
    pub fn features(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("quantity".to_string(), self.quantity),
            ("distance".to_string(), self.distance),
            ("vin_code".to_string(), self.vin_code as f64),
            ("cc_code".to_string(), self.zone_code as f64),
        ])
    }
}

/// The five derived environmental/cost metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MetricKind {
    KgCo2,
    TonCo2,
    TreeEquivalent,
    TransactionAmount,
    Efficiency,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        MetricKind::KgCo2,
        MetricKind::TonCo2,
        MetricKind::TreeEquivalent,
        MetricKind::TransactionAmount,
        MetricKind::Efficiency,
    ];

    /// Stable key used for artifact file names and exported JSON.
    pub fn key(self) -> &'static str {
        match self {
            MetricKind::KgCo2 => "mass_kg_co2",
            MetricKind::TonCo2 => "mass_ton_co2",
            MetricKind::TreeEquivalent => "tree_equivalent",
            MetricKind::TransactionAmount => "transaction_amount",
            MetricKind::Efficiency => "efficiency",
        }
    }

    /// Human label shown in the console.
    pub fn label(self) -> &'static str {
        match self {
            MetricKind::KgCo2 => "KG CO2",
            MetricKind::TonCo2 => "TON CO2",
            MetricKind::TreeEquivalent => "Tree equivalents",
            MetricKind::TransactionAmount => "Transaction amount",
            MetricKind::Efficiency => "Efficiency",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Mean delivered quantity for one zone.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ZoneAverage {
    pub zone: String,
    pub mean_quantity: f64,
    pub records: usize,
}

/// Mean delivered quantity for one (vehicle, plate) pair.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VehicleAverage {
    pub vin_label: String,
    pub plate: String,
    pub mean_quantity: f64,
    pub trips: usize,
}

/// One frequency-map marker: a (state, vehicle, plate, zone) group placed
/// at the state centroid, sized by its row count.
#[derive(Debug, Clone, Serialize)]
pub struct MapMarker {
    pub state: String,
    pub vin_label: String,
    pub plate: String,
    pub zone_label: String,
    pub count: usize,
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
    pub color: String,
}

/// Fleet-wide summary: overall counts plus the three aggregates, exported
/// as JSON for downstream charting.
#[derive(Debug, Serialize)]
pub struct FleetSummary {
    pub total_records: usize,
    pub total_vehicles: usize,
    pub total_zones: usize,
    pub mean_quantity: f64,
    pub zone_averages: Vec<ZoneAverage>,
    pub top_vehicles: Vec<VehicleAverage>,
    pub markers: Vec<MapMarker>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ZoneAverageRow {
    #[serde(rename = "Zone")]
    #[tabled(rename = "Zone")]
    pub zone: String,
    #[serde(rename = "MeanQuantity")]
    #[tabled(rename = "MeanQuantity")]
    pub mean_quantity: String,
    #[serde(rename = "Records")]
    #[tabled(rename = "Records")]
    pub records: usize,
}

impl ZoneAverageRow {
    pub fn from_stat(stat: &ZoneAverage) -> Self {
        ZoneAverageRow {
            zone: stat.zone.clone(),
            mean_quantity: format_number(stat.mean_quantity, 2),
            records: stat.records,
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TopVehicleRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "VinNumber")]
    #[tabled(rename = "VinNumber")]
    pub vin_label: String,
    #[serde(rename = "Plate")]
    #[tabled(rename = "Plate")]
    pub plate: String,
    #[serde(rename = "MeanQuantity")]
    #[tabled(rename = "MeanQuantity")]
    pub mean_quantity: String,
    #[serde(rename = "Trips")]
    #[tabled(rename = "Trips")]
    pub trips: usize,
}

impl TopVehicleRow {
    pub fn from_stat(rank: usize, stat: &VehicleAverage) -> Self {
        TopVehicleRow {
            rank,
            vin_label: stat.vin_label.clone(),
            plate: stat.plate.clone(),
            mean_quantity: format_number(stat.mean_quantity, 2),
            trips: stat.trips,
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct FrequencyRow {
    #[serde(rename = "State")]
    #[tabled(rename = "State")]
    pub state: String,
    #[serde(rename = "VinNumber")]
    #[tabled(rename = "VinNumber")]
    pub vin_label: String,
    #[serde(rename = "Plate")]
    #[tabled(rename = "Plate")]
    pub plate: String,
    #[serde(rename = "Zone")]
    #[tabled(rename = "Zone")]
    pub zone: String,
    #[serde(rename = "Frequency")]
    #[tabled(rename = "Frequency")]
    pub count: usize,
    #[serde(rename = "Lat")]
    #[tabled(rename = "Lat")]
    pub lat: String,
    #[serde(rename = "Lon")]
    #[tabled(rename = "Lon")]
    pub lon: String,
}

impl FrequencyRow {
    pub fn from_marker(marker: &MapMarker) -> Self {
        FrequencyRow {
            state: marker.state.clone(),
            vin_label: marker.vin_label.clone(),
            plate: marker.plate.clone(),
            zone: marker.zone_label.clone(),
            count: marker.count,
            lat: format!("{:.4}", marker.lat),
            lon: format!("{:.4}", marker.lon),
        }
    }
}

#[derive(Debug, Tabled, Clone)]
pub struct MetricRow {
    #[tabled(rename = "Metric")]
    pub metric: &'static str,
    #[tabled(rename = "Estimate")]
    pub value: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct HistoryRow {
    #[tabled(rename = "Month")]
    pub month: String,
    #[tabled(rename = "Quantity")]
    pub quantity: String,
    #[tabled(rename = "KG CO2")]
    pub kg_co2: String,
    #[tabled(rename = "TON CO2")]
    pub ton_co2: String,
    #[tabled(rename = "Trees")]
    pub trees: String,
}

impl HistoryRow {
    pub fn from_record(r: &HistoricalRecord) -> Self {
        HistoryRow {
            month: r.month.format("%Y-%m").to_string(),
            quantity: format_number(r.quantity, 2),
            kg_co2: format_number(r.kg_co2, 2),
            ton_co2: format_number(r.ton_co2, 2),
            trees: format_number(r.trees, 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_features_accept_valid_ranges() {
        let trip = TripFeatures::new(120.0, DEFAULT_UNIT_PRICE, 6, 2).unwrap();
        assert_eq!(trip.month, 6);
        assert_eq!(trip.weekday, 2);
    }

    #[test]
    fn trip_features_reject_out_of_range() {
        assert!(TripFeatures::new(-1.0, 20.0, 6, 2).is_err());
        assert!(TripFeatures::new(10.0, -0.5, 6, 2).is_err());
        assert!(TripFeatures::new(10.0, 20.0, 0, 2).is_err());
        assert!(TripFeatures::new(10.0, 20.0, 13, 2).is_err());
        assert!(TripFeatures::new(10.0, 20.0, 6, 7).is_err());
        assert!(TripFeatures::new(f64::NAN, 20.0, 6, 2).is_err());
    }

    #[test]
    fn prediction_input_features_carry_exact_keys() {
        let trip = TripFeatures::new(50.0, 20.0, 3, 1).unwrap();
        let input = PredictionInput::new(trip, 7, 2);
        let feats = input.features();
        let keys: Vec<&str> = feats.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "cc_code",
                "distance",
                "month",
                "unit_price",
                "vin_code",
                "weekday"
            ]
        );
        assert_eq!(feats["vin_code"], 7.0);
        assert_eq!(feats["cc_code"], 2.0);
    }
}
