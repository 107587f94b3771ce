//! Fleet-wide aggregation over the historical dataset.
//!
//! All three queries are read-only and recomputed on every Fleet Analysis
//! view; the dataset is static for the process lifetime so there is nothing
//! to cache or invalidate. An empty dataset yields empty reports.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::warn;

use crate::types::{FleetSummary, HistoricalRecord, MapMarker, VehicleAverage, ZoneAverage};
use crate::util::mean;

pub const TOP_VEHICLES: usize = 5;

/// Map centroids per state (state capital, lat/lon). States absent from
/// this table get no marker on the frequency map.
static STATE_CENTROIDS: Lazy<HashMap<&'static str, (f64, f64)>> = Lazy::new(|| {
    HashMap::from([
        ("Tabasco", (17.9894, -92.9470)),
        ("Tamaulipas", (23.7369, -99.1411)),
        ("Veracruz", (19.1738, -96.1342)),
        ("Cd Mexico", (19.4326, -99.1332)),
    ])
});

/// Marker colors cycled per vehicle, assigned in first-seen dataset order.
const MARKER_PALETTE: [&str; 19] = [
    "red",
    "blue",
    "green",
    "purple",
    "orange",
    "darkred",
    "lightred",
    "beige",
    "darkblue",
    "darkgreen",
    "cadetblue",
    "darkpurple",
    "white",
    "pink",
    "lightblue",
    "lightgreen",
    "gray",
    "black",
    "lightgray",
];

/// Mean delivered quantity per zone, sorted descending by mean.
/// Equal means are ordered ascending by zone label for determinism.
pub fn zone_averages(data: &[HistoricalRecord]) -> Vec<ZoneAverage> {
    let mut groups: HashMap<&str, Vec<f64>> = HashMap::new();
    for r in data {
        groups.entry(r.zone_label.as_str()).or_default().push(r.quantity);
    }
    let mut stats: Vec<ZoneAverage> = groups
        .into_iter()
        .map(|(zone, quantities)| ZoneAverage {
            zone: zone.to_string(),
            mean_quantity: mean(&quantities),
            records: quantities.len(),
        })
        .collect();
    stats.sort_by(|a, b| {
        b.mean_quantity
            .partial_cmp(&a.mean_quantity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.zone.cmp(&b.zone))
    });
    stats
}

/// Top-N (vehicle, plate) pairs by mean delivered quantity, descending.
/// Ties break lexicographically ascending by plate.
pub fn top_vehicles(data: &[HistoricalRecord], n: usize) -> Vec<VehicleAverage> {
    let mut groups: HashMap<(&str, &str), Vec<f64>> = HashMap::new();
    for r in data {
        groups
            .entry((r.vin_label.as_str(), r.plate.as_str()))
            .or_default()
            .push(r.quantity);
    }
    let mut stats: Vec<VehicleAverage> = groups
        .into_iter()
        .map(|((vin_label, plate), quantities)| VehicleAverage {
            vin_label: vin_label.to_string(),
            plate: plate.to_string(),
            mean_quantity: mean(&quantities),
            trips: quantities.len(),
        })
        .collect();
    stats.sort_by(|a, b| {
        b.mean_quantity
            .partial_cmp(&a.mean_quantity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.plate.cmp(&b.plate))
    });
    stats.truncate(n);
    stats
}

/// Delivery frequency markers grouped by (state, vehicle, plate, zone).
///
/// Each group is placed at its state's centroid with radius scaled by the
/// row count. A state with no known centroid is skipped (logged, never an
/// error) and the remaining markers are still placed. Marker order is
/// deterministic: sorted by state, vehicle, plate, zone.
pub fn frequency_map(data: &[HistoricalRecord]) -> Vec<MapMarker> {
    // Color per vehicle in first-seen order.
    let mut colors: HashMap<&str, &'static str> = HashMap::new();
    for r in data {
        let next = MARKER_PALETTE[colors.len() % MARKER_PALETTE.len()];
        colors.entry(r.vin_label.as_str()).or_insert(next);
    }

    let mut groups: HashMap<(&str, &str, &str, &str), usize> = HashMap::new();
    for r in data {
        *groups
            .entry((
                r.state.as_str(),
                r.vin_label.as_str(),
                r.plate.as_str(),
                r.zone_label.as_str(),
            ))
            .or_insert(0) += 1;
    }

    let mut keyed: Vec<((&str, &str, &str, &str), usize)> = groups.into_iter().collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let mut markers = Vec::new();
    for ((state, vin_label, plate, zone_label), count) in keyed {
        let Some(&(lat, lon)) = STATE_CENTROIDS.get(state) else {
            warn!(state, "no centroid for state, marker skipped");
            continue;
        };
        markers.push(MapMarker {
            state: state.to_string(),
            vin_label: vin_label.to_string(),
            plate: plate.to_string(),
            zone_label: zone_label.to_string(),
            count,
            lat,
            lon,
            radius: 5.0 + count as f64 * 0.5,
            color: colors[vin_label].to_string(),
        });
    }
    markers
}

/// Overall counts plus the three aggregates, bundled for JSON export.
pub fn fleet_summary(data: &[HistoricalRecord]) -> FleetSummary {
    let vehicles: std::collections::HashSet<&str> =
        data.iter().map(|r| r.vin_label.as_str()).collect();
    let zones: std::collections::HashSet<&str> =
        data.iter().map(|r| r.zone_label.as_str()).collect();
    let quantities: Vec<f64> = data.iter().map(|r| r.quantity).collect();
    FleetSummary {
        total_records: data.len(),
        total_vehicles: vehicles.len(),
        total_zones: zones.len(),
        mean_quantity: mean(&quantities),
        zone_averages: zone_averages(data),
        top_vehicles: top_vehicles(data, TOP_VEHICLES),
        markers: frequency_map(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(zone: &str, vin: &str, plate: &str, state: &str, quantity: f64) -> HistoricalRecord {
        HistoricalRecord {
            month: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            vin_code: 0,
            zone_code: 0,
            vin_label: vin.to_string(),
            plate: plate.to_string(),
            zone_label: zone.to_string(),
            state: state.to_string(),
            quantity,
            kg_co2: 0.0,
            ton_co2: 0.0,
            trees: 0.0,
        }
    }

    #[test]
    fn zone_averages_mean_and_order() {
        let data = vec![
            record("A", "V1", "P1", "Tabasco", 10.0),
            record("A", "V1", "P1", "Tabasco", 20.0),
            record("B", "V2", "P2", "Tabasco", 5.0),
        ];
        let stats = zone_averages(&data);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].zone, "A");
        assert_eq!(stats[0].mean_quantity, 15.0);
        assert_eq!(stats[1].zone, "B");
        assert_eq!(stats[1].mean_quantity, 5.0);
    }

    #[test]
    fn top_vehicles_truncates_and_keeps_descending_order() {
        let means = [50.0, 40.0, 30.0, 20.0, 10.0, 5.0];
        let mut data = Vec::new();
        for (i, m) in means.iter().enumerate() {
            data.push(record("Z", &format!("V{}", i), &format!("P{}", i), "Tabasco", *m));
        }
        let stats = top_vehicles(&data, TOP_VEHICLES);
        assert_eq!(stats.len(), 5);
        let got: Vec<f64> = stats.iter().map(|s| s.mean_quantity).collect();
        assert_eq!(got, vec![50.0, 40.0, 30.0, 20.0, 10.0]);
        assert!(!stats.iter().any(|s| s.mean_quantity == 5.0));
    }

    #[test]
    fn top_vehicles_ties_break_by_plate() {
        let data = vec![
            record("Z", "V1", "PLATE-B", "Tabasco", 10.0),
            record("Z", "V2", "PLATE-A", "Tabasco", 10.0),
        ];
        let stats = top_vehicles(&data, TOP_VEHICLES);
        assert_eq!(stats[0].plate, "PLATE-A");
        assert_eq!(stats[1].plate, "PLATE-B");
    }

    #[test]
    fn frequency_map_skips_unknown_states_without_aborting() {
        let data = vec![
            record("Z1", "V1", "P1", "Tabasco", 1.0),
            record("Z1", "V1", "P1", "Tabasco", 1.0),
            record("Z2", "V2", "P2", "Atlantis", 1.0),
            record("Z3", "V3", "P3", "Veracruz", 1.0),
        ];
        let markers = frequency_map(&data);
        assert_eq!(markers.len(), 2);
        assert!(markers.iter().all(|m| m.state != "Atlantis"));
        let tabasco = markers.iter().find(|m| m.state == "Tabasco").unwrap();
        assert_eq!(tabasco.count, 2);
        assert_eq!(tabasco.radius, 6.0);
        assert_eq!(tabasco.lat, 17.9894);
    }

    #[test]
    fn marker_colors_follow_first_seen_vehicle_order() {
        let data = vec![
            record("Z1", "V1", "P1", "Tabasco", 1.0),
            record("Z2", "V2", "P2", "Veracruz", 1.0),
            record("Z3", "V1", "P1", "Tamaulipas", 1.0),
        ];
        let markers = frequency_map(&data);
        let v1_colors: std::collections::HashSet<&str> = markers
            .iter()
            .filter(|m| m.vin_label == "V1")
            .map(|m| m.color.as_str())
            .collect();
        assert_eq!(v1_colors, std::collections::HashSet::from(["red"]));
        let v2 = markers.iter().find(|m| m.vin_label == "V2").unwrap();
        assert_eq!(v2.color, "blue");
    }

    #[test]
    fn empty_dataset_yields_empty_reports() {
        let summary = fleet_summary(&[]);
        assert_eq!(summary.total_records, 0);
        assert!(summary.zone_averages.is_empty());
        assert!(summary.top_vehicles.is_empty());
        assert!(summary.markers.is_empty());
        assert_eq!(summary.mean_quantity, 0.0);
    }
}
