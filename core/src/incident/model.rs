use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Regulatory classification of the reporting organization. The deadline
/// profile is keyed by this class even while both classes share one profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrganizationClass {
    EssentialEntity,
    ImportantEntity,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Criticality {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LifecycleState {
    Detected,
    Analyzing,
    Contained,
    Closed,
    /// Soft-deactivation; incidents referenced by reports are never hard-deleted.
    Deactivated,
}

/// Closing metrics for the final disclosure tier. Cost is kept in integer
/// cents so canonical JSON hashing never sees a float.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClosingMetrics {
    pub resolution_hours: Option<u64>,
    pub estimated_cost_cents: Option<u64>,
    pub users_affected: Option<u64>,
    pub services_impacted: Option<u64>,
}

/// Read-only view of an incident as the management subsystem holds it.
/// Narrative fields are optional because the record is filled in over the
/// lifecycle; the validation gate decides what a given tier requires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncidentSnapshot {
    pub incident_id: String,
    pub display_code: String,
    pub title: String,
    pub organization_name: String,
    pub organization_id: String,
    pub organization_class: OrganizationClass,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub detected_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub occurred_at: Option<OffsetDateTime>,
    pub criticality: Option<Criticality>,
    pub origin: Option<String>,
    pub initial_description: Option<String>,
    pub preliminary_impact: Option<String>,
    pub immediate_actions: Option<String>,
    pub affected_systems: Option<String>,
    pub recovery_plan: Option<String>,
    pub root_cause: Option<String>,
    pub lessons_learned: Option<String>,
    pub implemented_improvements: Option<String>,
    pub recommendations: Vec<String>,
    pub metrics: ClosingMetrics,
    pub lifecycle: LifecycleState,
    pub report_filed: bool,
}

/// Metadata for one uploaded evidence attachment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvidenceRef {
    pub section: String,
    pub filename: String,
    pub size_bytes: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}
