use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Disclosure tiers in regulatory order. Each tier's content is a superset of
/// the tier below it, and each has a fixed deadline offset from detection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportTier {
    Preliminary,
    Complete,
    Final,
}

impl ReportTier {
    pub const ALL: [ReportTier; 3] = [
        ReportTier::Preliminary,
        ReportTier::Complete,
        ReportTier::Final,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReportTier::Preliminary => "preliminary",
            ReportTier::Complete => "complete",
            ReportTier::Final => "final",
        }
    }

    pub fn from_label(s: &str) -> CoreResult<Self> {
        match s {
            "preliminary" => Ok(ReportTier::Preliminary),
            "complete" => Ok(ReportTier::Complete),
            "final" => Ok(ReportTier::Final),
            other => Err(CoreError::InvalidInput(format!(
                "unknown report tier {other}"
            ))),
        }
    }
}

impl fmt::Display for ReportTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::ReportTier;

    #[test]
    fn tiers_are_ordered() {
        assert!(ReportTier::Preliminary < ReportTier::Complete);
        assert!(ReportTier::Complete < ReportTier::Final);
    }

    #[test]
    fn labels_round_trip() {
        for tier in ReportTier::ALL {
            assert_eq!(ReportTier::from_label(tier.label()).unwrap(), tier);
        }
        assert!(ReportTier::from_label("interim").is_err());
    }
}
