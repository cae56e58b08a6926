use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Reference taxonomy entry: a classification code with the area/category/effect
/// triple the classification table of a complete report is built from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxonomyDefinition {
    pub code: String,
    pub area: String,
    pub category: String,
    pub effect: String,
    pub description: String,
}

/// Collaborator seam to the taxonomy catalog. Read-only reference data.
pub trait TaxonomyCatalog: Send + Sync {
    fn lookup(&self, code: &str) -> CoreResult<TaxonomyDefinition>;
    fn all(&self) -> Vec<TaxonomyDefinition>;
}

pub fn default_taxonomy() -> Vec<TaxonomyDefinition> {
    let mut codes = vec![
        TaxonomyDefinition {
            code: "TAX-AVL-DOS".to_string(),
            area: "Availability".to_string(),
            category: "Denial of service".to_string(),
            effect: "Service outage".to_string(),
            description: "Resource exhaustion or flooding degrading service availability."
                .to_string(),
        },
        TaxonomyDefinition {
            code: "TAX-AVL-FAIL".to_string(),
            area: "Availability".to_string(),
            category: "Systems failure".to_string(),
            effect: "Service degradation".to_string(),
            description: "Hardware or software failure without malicious cause.".to_string(),
        },
        TaxonomyDefinition {
            code: "TAX-CNF-LEAK".to_string(),
            area: "Confidentiality".to_string(),
            category: "Data breach".to_string(),
            effect: "Unauthorised disclosure".to_string(),
            description: "Exfiltration or exposure of protected data.".to_string(),
        },
        TaxonomyDefinition {
            code: "TAX-CNF-ACC".to_string(),
            area: "Confidentiality".to_string(),
            category: "Unauthorised access".to_string(),
            effect: "Account or system compromise".to_string(),
            description: "Access to systems or data without authorisation.".to_string(),
        },
        TaxonomyDefinition {
            code: "TAX-INT-MOD".to_string(),
            area: "Integrity".to_string(),
            category: "Unauthorised modification".to_string(),
            effect: "Data tampering".to_string(),
            description: "Alteration of data or configuration by an unauthorised party."
                .to_string(),
        },
        TaxonomyDefinition {
            code: "TAX-INT-MAL".to_string(),
            area: "Integrity".to_string(),
            category: "Malware".to_string(),
            effect: "System compromise".to_string(),
            description: "Malicious code execution, including ransomware.".to_string(),
        },
        TaxonomyDefinition {
            code: "TAX-FRD-PHI".to_string(),
            area: "Fraud".to_string(),
            category: "Phishing".to_string(),
            effect: "Credential theft".to_string(),
            description: "Deceptive messages harvesting credentials or payments.".to_string(),
        },
        TaxonomyDefinition {
            code: "TAX-FRD-IMP".to_string(),
            area: "Fraud".to_string(),
            category: "Impersonation".to_string(),
            effect: "Brand or identity abuse".to_string(),
            description: "Spoofed identities of the organization or its staff.".to_string(),
        },
    ];
    codes.sort_by(|a, b| a.code.cmp(&b.code));
    codes
}

/// Catalog shipped with the crate. Host processes with an external catalog
/// service implement [`TaxonomyCatalog`] over it instead.
pub struct EmbeddedTaxonomyCatalog {
    codes: Vec<TaxonomyDefinition>,
}

impl EmbeddedTaxonomyCatalog {
    pub fn new() -> Self {
        Self {
            codes: default_taxonomy(),
        }
    }
}

impl Default for EmbeddedTaxonomyCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl TaxonomyCatalog for EmbeddedTaxonomyCatalog {
    fn lookup(&self, code: &str) -> CoreResult<TaxonomyDefinition> {
        self.codes
            .iter()
            .find(|d| d.code == code)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("taxonomy code {code}")))
    }

    fn all(&self) -> Vec<TaxonomyDefinition> {
        self.codes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_taxonomy_is_sorted_and_unique() {
        let codes = default_taxonomy();
        let mut sorted = codes.clone();
        sorted.sort_by(|a, b| a.code.cmp(&b.code));
        sorted.dedup_by(|a, b| a.code == b.code);
        assert_eq!(codes, sorted);
    }

    #[test]
    fn lookup_unknown_code_is_not_found() {
        let catalog = EmbeddedTaxonomyCatalog::new();
        assert!(catalog.lookup("TAX-NOPE").is_err());
        assert!(catalog.lookup("TAX-AVL-DOS").is_ok());
    }
}
