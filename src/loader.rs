//! Startup loading: the two encoder vocabularies, the primary model, the
//! five secondary models, and the historical dataset.
//!
//! Everything is loaded exactly once into an immutable `FleetContext` that
//! is passed by reference to the rest of the program. There is no reload
//! path; a process restart picks up updated artifacts.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use crate::encoder::{EncoderArtifact, IdentifierKind, LabelEncoder};
use crate::error::{FleetError, Result};
use crate::model::{LinearModel, SecondaryModels};
use crate::types::{HistoricalRecord, MetricKind, RawRow};
use crate::util::{parse_f64_safe, parse_month_safe, parse_u32_safe};

/// Diagnostics from one dataset load, printed like the startup banner.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
}

/// Shared read-only state for the lifetime of the process.
#[derive(Debug)]
pub struct FleetContext {
    pub vin_encoder: LabelEncoder,
    pub cc_encoder: LabelEncoder,
    pub primary: LinearModel,
    pub secondary: SecondaryModels,
    pub history: Vec<HistoricalRecord>,
}

pub fn load_context(artifact_dir: &Path, csv_path: &Path) -> Result<(FleetContext, LoadReport)> {
    let vin_encoder = load_encoder(&artifact_dir.join("vin_encoder.json"), IdentifierKind::Vehicle)?;
    let cc_encoder = load_encoder(&artifact_dir.join("cc_encoder.json"), IdentifierKind::Zone)?;
    let primary = load_model(&artifact_dir.join("primary_model.json"))?;

    let mut models = BTreeMap::new();
    for kind in MetricKind::ALL {
        let path = artifact_dir.join(format!("model_{}.json", kind.key()));
        models.insert(kind, load_model(&path)?);
    }
    let secondary = SecondaryModels::new(models)?;

    let (history, report) = load_history(File::open(csv_path)?)?;

    Ok((
        FleetContext {
            vin_encoder,
            cc_encoder,
            primary,
            secondary,
            history,
        },
        report,
    ))
}

fn load_encoder(path: &Path, kind: IdentifierKind) -> Result<LabelEncoder> {
    let raw = std::fs::read_to_string(path)?;
    let artifact: EncoderArtifact =
        serde_json::from_str(&raw).map_err(|e| FleetError::Artifact {
            what: path.display().to_string(),
            reason: e.to_string(),
        })?;
    LabelEncoder::new(kind, artifact.classes)
}

fn load_model(path: &Path) -> Result<LinearModel> {
    let raw = std::fs::read_to_string(path)?;
    let model: LinearModel = serde_json::from_str(&raw).map_err(|e| FleetError::Artifact {
        what: path.display().to_string(),
        reason: e.to_string(),
    })?;
    model.validate()?;
    Ok(model)
}

/// Parse the historical dataset from any reader.
///
/// Rows that fail to deserialize or that carry unparseable required fields
/// are counted as parse errors and skipped; the dataset does not have to be
/// perfect to be usable.
pub fn load_history<R: Read>(reader: R) -> Result<(Vec<HistoricalRecord>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut records: Vec<HistoricalRecord> = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                debug!(row = total_rows, error = %e, "row failed to deserialize");
                parse_errors += 1;
                continue;
            }
        };

        let parsed = parse_row(&row);
        match parsed {
            Some(record) => records.push(record),
            None => {
                debug!(row = total_rows, "row skipped: unparseable required field");
                parse_errors += 1;
            }
        }
    }

    let report = LoadReport {
        total_rows,
        loaded_rows: records.len(),
        parse_errors,
    };
    Ok((records, report))
}

fn parse_row(row: &RawRow) -> Option<HistoricalRecord> {
    let month = parse_month_safe(row.month.as_deref())?;
    let vin_code = parse_u32_safe(row.vin_code.as_deref())?;
    let zone_code = parse_u32_safe(row.cc_code.as_deref())?;
    let quantity = parse_f64_safe(row.quantity.as_deref())?;
    let kg_co2 = parse_f64_safe(row.kg_co2.as_deref())?;
    let ton_co2 = parse_f64_safe(row.ton_co2.as_deref())?;
    let trees = parse_f64_safe(row.trees.as_deref())?;

    let vin_label = row.vin_label.as_deref().unwrap_or("Unknown").trim().to_string();
    let plate = row.plate.as_deref().unwrap_or("Unknown").trim().to_string();
    let zone_label = row.zone_label.as_deref().unwrap_or("Unknown").trim().to_string();
    let state = row.state.as_deref().unwrap_or("Unknown").trim().to_string();

    Some(HistoricalRecord {
        month,
        vin_code,
        zone_code,
        vin_label,
        plate,
        zone_label,
        state,
        quantity,
        kg_co2,
        ton_co2,
        trees,
    })
}
