//! Kepler Objects of Interest table layout and disposition labels

use crate::error::{ExoSeekerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Disposition label column
pub const LABEL_COLUMN: &str = "koi_disposition";

/// Row ids, catalog ids, names, the secondary disposition and the score
pub const IDENTIFIER_COLUMNS: [&str; 6] = [
    "loc_rowid",
    "kepid",
    "kepoi_name",
    "kepler_name",
    "koi_pdisposition",
    "koi_score",
];

/// Categorical pipeline delivery name, mode-filled and then dropped
pub const DELIVERY_NAME_COLUMN: &str = "koi_tce_delivname";

/// Equilibrium temperature error margins
pub const AUXILIARY_COLUMNS: [&str; 2] = ["koi_teq_err1", "koi_teq_err2"];

/// Columns that must be present in any raw table (label excluded)
pub fn required_columns() -> Vec<&'static str> {
    IDENTIFIER_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(DELIVERY_NAME_COLUMN))
        .chain(AUXILIARY_COLUMNS.iter().copied())
        .collect()
}

/// Whether a column is never used as a model feature
pub fn is_non_feature_column(name: &str) -> bool {
    name == LABEL_COLUMN || name == DELIVERY_NAME_COLUMN
        || IDENTIFIER_COLUMNS.contains(&name)
        || AUXILIARY_COLUMNS.contains(&name)
}

/// Classification label of a Kepler object of interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Disposition {
    #[serde(rename = "CANDIDATE")]
    Candidate,
    #[serde(rename = "CONFIRMED")]
    Confirmed,
    #[serde(rename = "FALSE POSITIVE")]
    FalsePositive,
}

impl Disposition {
    /// Positive class for metrics
    pub const POSITIVE: Disposition = Disposition::Confirmed;

    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Candidate => "CANDIDATE",
            Disposition::Confirmed => "CONFIRMED",
            Disposition::FalsePositive => "FALSE POSITIVE",
        }
    }

    /// Numeric training target: CONFIRMED is 1.0, everything else 0.0
    pub fn to_target(&self) -> f64 {
        if *self == Disposition::Confirmed { 1.0 } else { 0.0 }
    }

    /// Decode a binary prediction
    pub fn from_target(value: f64) -> Self {
        if value >= 0.5 {
            Disposition::Confirmed
        } else {
            Disposition::Candidate
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Disposition {
    type Err = ExoSeekerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "CANDIDATE" => Ok(Disposition::Candidate),
            "CONFIRMED" => Ok(Disposition::Confirmed),
            "FALSE POSITIVE" => Ok(Disposition::FalsePositive),
            other => Err(ExoSeekerError::Schema(format!(
                "unknown {} value '{}'",
                LABEL_COLUMN, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog_strings() {
        assert_eq!("CONFIRMED".parse::<Disposition>().unwrap(), Disposition::Confirmed);
        assert_eq!("CANDIDATE".parse::<Disposition>().unwrap(), Disposition::Candidate);
        assert_eq!(
            "FALSE POSITIVE".parse::<Disposition>().unwrap(),
            Disposition::FalsePositive
        );
        assert!(matches!(
            "confirmed".parse::<Disposition>(),
            Err(ExoSeekerError::Schema(_))
        ));
    }

    #[test]
    fn test_target_encoding() {
        assert_eq!(Disposition::Confirmed.to_target(), 1.0);
        assert_eq!(Disposition::Candidate.to_target(), 0.0);
        assert_eq!(Disposition::from_target(0.7), Disposition::Confirmed);
        assert_eq!(Disposition::from_target(0.2), Disposition::Candidate);
    }

    #[test]
    fn test_serde_uses_catalog_strings() {
        let json = serde_json::to_string(&Disposition::FalsePositive).unwrap();
        assert_eq!(json, "\"FALSE POSITIVE\"");
    }

    #[test]
    fn test_required_columns() {
        let cols = required_columns();
        assert_eq!(cols.len(), 9);
        assert!(cols.contains(&"koi_tce_delivname"));
        assert!(!cols.contains(&LABEL_COLUMN));
        assert!(is_non_feature_column("kepid"));
        assert!(!is_non_feature_column("koi_period"));
    }
}
