//! Error types for the fleet prediction core.
//!
//! `UnknownIdentifier` is recoverable (the operator re-enters the VIN/CC);
//! `SchemaMismatch` is fatal to the request and indicates version skew
//! between a model artifact and the feature vector built for it. An empty
//! history lookup and a missing state centroid are deliberately not errors:
//! the former is a valid empty result, the latter a logged skip.

use thiserror::Error;

use crate::encoder::IdentifierKind;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("unknown {kind} identifier {raw:?}")]
    UnknownIdentifier { kind: IdentifierKind, raw: String },

    #[error("feature schema mismatch in model {model:?}: expected [{expected}], got [{got}]")]
    SchemaMismatch {
        model: String,
        expected: String,
        got: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("bad artifact ({what}): {reason}")]
    Artifact { what: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FleetError>;
