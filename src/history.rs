//! Historical lookup for the prediction panel's environmental time series.

use crate::types::HistoricalRecord;

/// All history for one (vehicle, zone) pair, ordered by month ascending.
///
/// The filter is an equality match on both codes. An empty result is not an
/// error: it means "no history" and the caller renders a distinct
/// empty-state message instead of an empty chart.
pub fn lookup(records: &[HistoricalRecord], vin_code: u32, zone_code: u32) -> Vec<&HistoricalRecord> {
    let mut hits: Vec<&HistoricalRecord> = records
        .iter()
        .filter(|r| r.vin_code == vin_code && r.zone_code == zone_code)
        .collect();
    hits.sort_by_key(|r| r.month);
    hits
}
