//! The per-request prediction pipeline: encode → predict → derive → look up.
//!
//! Stage order is strict: nothing downstream of a failed encode or a failed
//! primary prediction runs, and the caller receives a single typed error to
//! convert into one user-facing message. Secondary metric failures are the
//! only partial state, isolated inside the `ImpactReport`.

use crate::error::Result;
use crate::history;
use crate::loader::FleetContext;
use crate::model::ImpactReport;
use crate::types::{HistoricalRecord, ImpactInput, PredictionInput, TripFeatures};

/// One operator request: trip parameters plus the raw identifiers.
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    pub trip: TripFeatures,
    pub vin: String,
    pub cc: String,
}

/// Everything the prediction panel renders on success.
#[derive(Debug)]
pub struct PredictionReport {
    /// Estimated delivered quantity. Not clamped; out-of-distribution
    /// inputs can produce negative estimates.
    pub quantity: f64,
    pub impact: ImpactReport,
    /// Month-ascending environmental history for this vehicle and zone.
    /// Empty means "no history", a valid state with its own rendering.
    pub history: Vec<HistoricalRecord>,
}

pub fn run(ctx: &FleetContext, request: &PredictionRequest) -> Result<PredictionReport> {
    let vin_code = ctx.vin_encoder.encode(request.vin.trim())?;
    let zone_code = ctx.cc_encoder.encode(request.cc.trim())?;

    let input = PredictionInput::new(request.trip.clone(), vin_code, zone_code);
    let quantity = ctx.primary.predict(&input.features())?;

    let impact_input = ImpactInput {
        quantity,
        distance: request.trip.distance,
        vin_code,
        zone_code,
    };
    let impact = ctx.secondary.predict_all(&impact_input);

    let history = history::lookup(&ctx.history, vin_code, zone_code)
        .into_iter()
        .cloned()
        .collect();

    Ok(PredictionReport {
        quantity,
        impact,
        history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use crate::encoder::{IdentifierKind, LabelEncoder};
    use crate::error::FleetError;
    use crate::model::{LinearModel, SecondaryModels};
    use crate::types::MetricKind;

    const PRIMARY_FEATURES: [&str; 6] = [
        "distance",
        "unit_price",
        "month",
        "weekday",
        "vin_code",
        "cc_code",
    ];
    const IMPACT_FEATURES: [&str; 4] = ["quantity", "distance", "vin_code", "cc_code"];

    fn context() -> FleetContext {
        let vin_encoder = LabelEncoder::new(
            IdentifierKind::Vehicle,
            vec!["VIN-A".to_string(), "VIN-B".to_string()],
        )
        .unwrap();
        let cc_encoder =
            LabelEncoder::new(IdentifierKind::Zone, vec!["MX10001".to_string()]).unwrap();
        // quantity = 0.5 * distance
        let primary = LinearModel::from_parts(
            "primary",
            &PRIMARY_FEATURES,
            &[0.5, 0.0, 0.0, 0.0, 0.0, 0.0],
            0.0,
        );
        let mut models = BTreeMap::new();
        for kind in MetricKind::ALL {
            models.insert(
                kind,
                LinearModel::from_parts(kind.key(), &IMPACT_FEATURES, &[2.0, 0.0, 0.0, 0.0], 0.0),
            );
        }
        let secondary = SecondaryModels::new(models).unwrap();

        let record = |month: u32, vin_code: u32| crate::types::HistoricalRecord {
            month: NaiveDate::from_ymd_opt(2024, month, 1).unwrap(),
            vin_code,
            zone_code: 0,
            vin_label: "VIN-B".to_string(),
            plate: "XYZ-001".to_string(),
            zone_label: "MX10001".to_string(),
            state: "Tabasco".to_string(),
            quantity: 12.0,
            kg_co2: 4.0,
            ton_co2: 0.004,
            trees: 0.2,
        };
        let history = vec![record(6, 1), record(2, 1), record(3, 0)];

        FleetContext {
            vin_encoder,
            cc_encoder,
            primary,
            secondary,
            history,
        }
    }

    fn request(vin: &str, cc: &str) -> PredictionRequest {
        PredictionRequest {
            trip: TripFeatures::new(100.0, 20.0, 6, 2).unwrap(),
            vin: vin.to_string(),
            cc: cc.to_string(),
        }
    }

    #[test]
    fn full_pipeline_produces_quantity_metrics_and_history() {
        let ctx = context();
        let report = run(&ctx, &request("VIN-B", "MX10001")).unwrap();
        assert_eq!(report.quantity, 50.0);
        assert_eq!(report.impact.values.len(), 5);
        assert_eq!(report.impact.values[&MetricKind::KgCo2], 100.0);
        assert!(report.impact.failures.is_empty());
        // VIN-B encodes to 1; two history rows match, month ascending.
        assert_eq!(report.history.len(), 2);
        assert!(report.history[0].month < report.history[1].month);
    }

    #[test]
    fn unknown_vin_aborts_before_any_prediction() {
        let ctx = context();
        let err = run(&ctx, &request("NOT-A-VIN", "MX10001")).unwrap_err();
        assert!(matches!(
            err,
            FleetError::UnknownIdentifier {
                kind: IdentifierKind::Vehicle,
                ..
            }
        ));
    }

    #[test]
    fn unknown_zone_aborts_before_any_prediction() {
        let ctx = context();
        let err = run(&ctx, &request("VIN-A", "ZZ99999")).unwrap_err();
        assert!(matches!(
            err,
            FleetError::UnknownIdentifier {
                kind: IdentifierKind::Zone,
                ..
            }
        ));
    }

    #[test]
    fn identifiers_are_trimmed_before_encoding() {
        let ctx = context();
        let report = run(&ctx, &request("  VIN-B  ", " MX10001 ")).unwrap();
        assert_eq!(report.quantity, 50.0);
    }

    #[test]
    fn primary_schema_mismatch_is_fatal_to_the_request() {
        let mut ctx = context();
        ctx.primary =
            LinearModel::from_parts("primary", &["recorrido", "precio"], &[1.0, 1.0], 0.0);
        let err = run(&ctx, &request("VIN-A", "MX10001")).unwrap_err();
        assert!(matches!(err, FleetError::SchemaMismatch { .. }));
    }

    #[test]
    fn no_history_is_a_valid_empty_report() {
        let mut ctx = context();
        ctx.history.clear();
        let report = run(&ctx, &request("VIN-A", "MX10001")).unwrap();
        assert!(report.history.is_empty());
        assert_eq!(report.impact.values.len(), 5);
    }
}
