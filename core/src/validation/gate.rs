use crate::incident::model::{EvidenceRef, IncidentSnapshot};
use crate::taxonomy::assignments::TaxonomyAssignment;
use serde::{Deserialize, Serialize};

/// Outcome of the field-completeness check. Field names are the
/// human-readable strings surfaced verbatim to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub ok: bool,
    pub missing_required: Vec<String>,
    pub missing_recommended: Vec<String>,
}

/// Checks an incident against the generation requirements. Missing required
/// fields block generation; missing recommended fields are warnings only.
/// Re-evaluated on every attempt because incident fields may have changed.
pub fn validate(
    snapshot: &IncidentSnapshot,
    assignments: &[TaxonomyAssignment],
    evidence: &[EvidenceRef],
) -> ValidationResult {
    let mut missing_required = Vec::new();
    let mut missing_recommended = Vec::new();

    if snapshot.title.trim().is_empty() {
        missing_required.push("title".to_string());
    }
    if snapshot.detected_at.is_none() {
        missing_required.push("detection time".to_string());
    }
    if is_blank(&snapshot.initial_description) {
        missing_required.push("initial description".to_string());
    }
    if snapshot.organization_name.trim().is_empty() {
        missing_required.push("organization name".to_string());
    }
    if snapshot.organization_id.trim().is_empty() {
        missing_required.push("organization identifier".to_string());
    }

    if is_blank(&snapshot.preliminary_impact) {
        missing_recommended.push("preliminary impact assessment".to_string());
    }
    if is_blank(&snapshot.immediate_actions) {
        missing_recommended.push("immediate actions".to_string());
    }
    if is_blank(&snapshot.origin) {
        missing_recommended.push("origin".to_string());
    }
    if snapshot.criticality.is_none() {
        missing_recommended.push("criticality".to_string());
    }
    if assignments.is_empty() {
        missing_recommended.push("taxonomy classification".to_string());
    }
    if evidence.is_empty() {
        missing_recommended.push("evidence attachment".to_string());
    }

    ValidationResult {
        ok: missing_required.is_empty(),
        missing_required,
        missing_recommended,
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::model::{ClosingMetrics, Criticality, LifecycleState, OrganizationClass};
    use time::format_description::well_known::Rfc3339;
    use time::OffsetDateTime;

    fn filled_snapshot() -> IncidentSnapshot {
        IncidentSnapshot {
            incident_id: "inc_1".to_string(),
            display_code: "INC-2024-001".to_string(),
            title: "Ransomware on file server".to_string(),
            organization_name: "Acme Logistics".to_string(),
            organization_id: "A12345678".to_string(),
            organization_class: OrganizationClass::EssentialEntity,
            detected_at: Some(
                OffsetDateTime::parse("2024-01-10T09:00:00Z", &Rfc3339).unwrap(),
            ),
            occurred_at: None,
            criticality: Some(Criticality::High),
            origin: Some("EDR alert".to_string()),
            initial_description: Some("Encryption of shared drives observed.".to_string()),
            preliminary_impact: Some("File shares unavailable.".to_string()),
            immediate_actions: Some("Isolated affected hosts.".to_string()),
            affected_systems: None,
            recovery_plan: None,
            root_cause: None,
            lessons_learned: None,
            implemented_improvements: None,
            recommendations: Vec::new(),
            metrics: ClosingMetrics::default(),
            lifecycle: LifecycleState::Analyzing,
            report_filed: false,
        }
    }

    #[test]
    fn complete_snapshot_passes_with_warnings_only() {
        let result = validate(&filled_snapshot(), &[], &[]);
        assert!(result.ok);
        assert!(result.missing_required.is_empty());
        assert_eq!(
            result.missing_recommended,
            vec!["taxonomy classification", "evidence attachment"]
        );
    }

    #[test]
    fn missing_description_blocks() {
        let mut snapshot = filled_snapshot();
        snapshot.initial_description = None;
        let result = validate(&snapshot, &[], &[]);
        assert!(!result.ok);
        assert_eq!(result.missing_required, vec!["initial description"]);
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let mut snapshot = filled_snapshot();
        snapshot.initial_description = Some("   ".to_string());
        snapshot.title = "\t".to_string();
        let result = validate(&snapshot, &[], &[]);
        assert_eq!(result.missing_required, vec!["title", "initial description"]);
    }

    #[test]
    fn missing_fields_listed_in_declaration_order() {
        let mut snapshot = filled_snapshot();
        snapshot.title = String::new();
        snapshot.detected_at = None;
        snapshot.initial_description = None;
        snapshot.organization_name = String::new();
        snapshot.organization_id = String::new();
        let result = validate(&snapshot, &[], &[]);
        assert_eq!(
            result.missing_required,
            vec![
                "title",
                "detection time",
                "initial description",
                "organization name",
                "organization identifier"
            ]
        );
    }
}
