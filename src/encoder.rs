//! Identifier encoding: raw VIN / cost-center strings to the integer codes
//! the regression models were trained against.
//!
//! A `LabelEncoder` is built from a fitted vocabulary dumped at training
//! time; the code for a label is its index in the `classes` array. Codes
//! are only meaningful relative to the encoder instance that produced them.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{FleetError, Result};

/// Which identifier an encoder (or an encode failure) refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Vehicle,
    Zone,
}

impl std::fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentifierKind::Vehicle => f.write_str("vehicle"),
            IdentifierKind::Zone => f.write_str("zone"),
        }
    }
}

/// On-disk encoder dump: the ordered class vocabulary.
#[derive(Debug, Deserialize)]
pub struct EncoderArtifact {
    pub classes: Vec<String>,
}

#[derive(Debug)]
pub struct LabelEncoder {
    kind: IdentifierKind,
    codes: HashMap<String, u32>,
}

impl LabelEncoder {
    /// Build an encoder from a fitted vocabulary. Duplicate classes would
    /// make codes ambiguous and are rejected.
    pub fn new(kind: IdentifierKind, classes: Vec<String>) -> Result<Self> {
        let mut codes = HashMap::with_capacity(classes.len());
        for (idx, class) in classes.into_iter().enumerate() {
            if codes.insert(class.clone(), idx as u32).is_some() {
                return Err(FleetError::Artifact {
                    what: format!("{} encoder", kind),
                    reason: format!("duplicate class {:?}", class),
                });
            }
        }
        Ok(LabelEncoder { kind, codes })
    }

    /// Map a raw identifier to its trained integer code.
    ///
    /// Deterministic for the lifetime of the vocabulary; a string never seen
    /// at training time is `UnknownIdentifier`.
    pub fn encode(&self, raw: &str) -> Result<u32> {
        self.codes
            .get(raw)
            .copied()
            .ok_or_else(|| FleetError::UnknownIdentifier {
                kind: self.kind,
                raw: raw.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vin_encoder() -> LabelEncoder {
        LabelEncoder::new(
            IdentifierKind::Vehicle,
            vec![
                "3VWRA81H8WM274632".to_string(),
                "1HGCM82633A004352".to_string(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn encode_is_deterministic() {
        let enc = vin_encoder();
        let a = enc.encode("1HGCM82633A004352").unwrap();
        let b = enc.encode("1HGCM82633A004352").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, 1);
        assert_eq!(enc.encode("3VWRA81H8WM274632").unwrap(), 0);
    }

    #[test]
    fn unknown_identifier_is_reported_with_kind_and_raw() {
        let enc = vin_encoder();
        match enc.encode("NOT-A-VIN") {
            Err(FleetError::UnknownIdentifier { kind, raw }) => {
                assert_eq!(kind, IdentifierKind::Vehicle);
                assert_eq!(raw, "NOT-A-VIN");
            }
            other => panic!("expected UnknownIdentifier, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_classes_are_rejected() {
        let result = LabelEncoder::new(
            IdentifierKind::Zone,
            vec!["MX10001".to_string(), "MX10001".to_string()],
        );
        assert!(matches!(result, Err(FleetError::Artifact { .. })));
    }
}
