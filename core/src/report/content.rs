use crate::deadline::engine::DeadlineProfile;
use crate::error::{CoreError, CoreResult};
use crate::incident::model::{
    ClosingMetrics, Criticality, EvidenceRef, IncidentSnapshot, OrganizationClass,
};
use crate::report::tier::ReportTier;
use crate::taxonomy::assignments::TaxonomyAssignment;
use crate::taxonomy::catalog::TaxonomyDefinition;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Placeholder for sub-sections whose data is not yet supplied. Sections are
/// always present in the content model; only their text may be pending.
pub const PENDING_TEXT: &str = "Pending further analysis.";

pub const NEXT_STEPS_BOILERPLATE: [&str; 4] = [
    "Continue containment and forensic analysis of affected systems.",
    "Submit the complete report within the regulatory window.",
    "Preserve evidence and system images for the closing analysis.",
    "Notify affected parties where the analysis confirms exposure.",
];

pub const DEFAULT_RECOMMENDATIONS: [&str; 4] = [
    "Review access control and network segmentation around the affected systems.",
    "Exercise the incident response plan against the reconstructed attack path.",
    "Verify backup integrity and restore procedures.",
    "Schedule follow-up awareness training for the affected teams.",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganizationBlock {
    pub name: String,
    pub identifier: String,
    pub class: OrganizationClass,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncidentBlock {
    pub display_code: String,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub detected_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub occurred_at: Option<OffsetDateTime>,
    pub criticality: Option<Criticality>,
    pub origin: Option<String>,
}

/// One row of the regulatory-deadline reminder block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeadlineReminderRow {
    pub tier: ReportTier,
    #[serde(with = "time::serde::rfc3339")]
    pub due_at: OffsetDateTime,
    pub hours_allowed: u64,
}

/// Fixed preliminary field set; the base every higher tier embeds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreliminarySection {
    pub organization: OrganizationBlock,
    pub incident: IncidentBlock,
    pub initial_description: String,
    pub preliminary_impact: String,
    pub immediate_actions: String,
    pub next_steps: Vec<String>,
    pub deadline_reminder: Vec<DeadlineReminderRow>,
}

/// One row of the taxonomy classification table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaxonomyRow {
    pub area: String,
    pub category: String,
    pub effect: String,
    pub justification: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceRow {
    pub section: String,
    pub filename: String,
    pub size_bytes: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

/// Detailed-analysis sections added at the complete tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisSection {
    pub affected_systems: String,
    pub taxonomy_rows: Vec<TaxonomyRow>,
    pub evidence: Vec<EvidenceRow>,
    pub recovery_plan: String,
}

/// Closing sections added at the final tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClosureSection {
    pub root_cause: String,
    pub lessons_learned: String,
    pub implemented_improvements: String,
    pub metrics: ClosingMetrics,
    pub recommendations: Vec<String>,
}

/// Cumulative content model. Higher tiers embed the lower-tier output as
/// built, so the superset relationship holds by construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportContent {
    pub tier: ReportTier,
    pub preliminary: PreliminarySection,
    pub analysis: Option<AnalysisSection>,
    pub closure: Option<ClosureSection>,
}

/// Builds the content model for any tier. `classified` pairs each assignment
/// with its catalog definition; the workflow resolves them before calling.
pub fn build_content(
    tier: ReportTier,
    snapshot: &IncidentSnapshot,
    profile: &DeadlineProfile,
    classified: &[(TaxonomyAssignment, TaxonomyDefinition)],
    evidence: &[EvidenceRef],
) -> CoreResult<ReportContent> {
    let preliminary = build_preliminary(snapshot, profile)?;
    let analysis = if tier >= ReportTier::Complete {
        Some(build_analysis(snapshot, classified, evidence))
    } else {
        None
    };
    let closure = if tier >= ReportTier::Final {
        Some(build_closure(snapshot))
    } else {
        None
    };
    Ok(ReportContent {
        tier,
        preliminary,
        analysis,
        closure,
    })
}

pub fn build_preliminary(
    snapshot: &IncidentSnapshot,
    profile: &DeadlineProfile,
) -> CoreResult<PreliminarySection> {
    let detected_at = snapshot.detected_at.ok_or_else(|| {
        CoreError::InvalidInput(format!(
            "incident {} has no detection time",
            snapshot.incident_id
        ))
    })?;

    let deadline_reminder = ReportTier::ALL
        .iter()
        .map(|&tier| {
            let offset = profile.offset(tier);
            DeadlineReminderRow {
                tier,
                due_at: detected_at + offset,
                hours_allowed: offset.whole_hours() as u64,
            }
        })
        .collect();

    Ok(PreliminarySection {
        organization: OrganizationBlock {
            name: snapshot.organization_name.clone(),
            identifier: snapshot.organization_id.clone(),
            class: snapshot.organization_class,
        },
        incident: IncidentBlock {
            display_code: snapshot.display_code.clone(),
            title: snapshot.title.clone(),
            detected_at,
            occurred_at: snapshot.occurred_at,
            criticality: snapshot.criticality,
            origin: snapshot.origin.clone(),
        },
        initial_description: or_pending(&snapshot.initial_description),
        preliminary_impact: or_pending(&snapshot.preliminary_impact),
        immediate_actions: or_pending(&snapshot.immediate_actions),
        next_steps: NEXT_STEPS_BOILERPLATE
            .iter()
            .map(|s| s.to_string())
            .collect(),
        deadline_reminder,
    })
}

fn build_analysis(
    snapshot: &IncidentSnapshot,
    classified: &[(TaxonomyAssignment, TaxonomyDefinition)],
    evidence: &[EvidenceRef],
) -> AnalysisSection {
    let mut taxonomy_rows: Vec<TaxonomyRow> = classified
        .iter()
        .map(|(assignment, definition)| TaxonomyRow {
            area: definition.area.clone(),
            category: definition.category.clone(),
            effect: definition.effect.clone(),
            justification: assignment.justification.clone(),
        })
        .collect();
    taxonomy_rows.sort_by(|a, b| (&a.area, &a.category).cmp(&(&b.area, &b.category)));

    let mut evidence_rows: Vec<EvidenceRow> = evidence
        .iter()
        .map(|e| EvidenceRow {
            section: e.section.clone(),
            filename: e.filename.clone(),
            size_bytes: e.size_bytes,
            uploaded_at: e.uploaded_at,
        })
        .collect();
    evidence_rows.sort_by(|a, b| (&a.section, a.uploaded_at).cmp(&(&b.section, b.uploaded_at)));

    AnalysisSection {
        affected_systems: or_pending(&snapshot.affected_systems),
        taxonomy_rows,
        evidence: evidence_rows,
        recovery_plan: or_pending(&snapshot.recovery_plan),
    }
}

fn build_closure(snapshot: &IncidentSnapshot) -> ClosureSection {
    let recommendations = if snapshot.recommendations.is_empty() {
        DEFAULT_RECOMMENDATIONS
            .iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        snapshot.recommendations.clone()
    };
    ClosureSection {
        root_cause: or_pending(&snapshot.root_cause),
        lessons_learned: or_pending(&snapshot.lessons_learned),
        implemented_improvements: or_pending(&snapshot.implemented_improvements),
        metrics: snapshot.metrics.clone(),
        recommendations,
    }
}

fn or_pending(value: &Option<String>) -> String {
    match value.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => PENDING_TEXT.to_string(),
    }
}
