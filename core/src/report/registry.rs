use crate::deadline::engine::TierFilings;
use crate::determinism::ids;
use crate::error::{CoreError, CoreResult};
use crate::report::render::{ArtifactRef, ReportRenderer};
use crate::report::tier::ReportTier;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One registered generation of a disclosure report. Immutable once created;
/// superseding or retracting flips `active`, never deletes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisclosureReport {
    pub report_id: String,
    pub incident_id: String,
    pub tier: ReportTier,
    pub version: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub generated_by: String,
    pub artifact: ArtifactRef,
    pub size_bytes: u64,
    pub active: bool,
}

/// History row: the report plus a storage availability flag. A failed
/// storage check marks the entry unavailable instead of failing the listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub report: DisclosureReport,
    pub artifact_available: bool,
}

/// Append-only, versioned report store. Version assignment and insert happen
/// under one write lock, so concurrent generations for the same
/// (incident, tier) can never share a version.
#[derive(Default)]
pub struct ReportRegistry {
    rows: RwLock<Vec<DisclosureReport>>,
}

impl ReportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version the next registration would receive. Informational; `register`
    /// recomputes under its own lock.
    pub fn next_version(&self, incident_id: &str, tier: ReportTier) -> u32 {
        let rows = self.rows.read();
        max_version(&rows, incident_id, tier) + 1
    }

    /// Atomic read-max-then-insert. Appends only; never overwrites.
    pub fn register(
        &self,
        incident_id: &str,
        tier: ReportTier,
        artifact: ArtifactRef,
        actor: &str,
        now: OffsetDateTime,
    ) -> CoreResult<DisclosureReport> {
        let mut rows = self.rows.write();
        let version = max_version(&rows, incident_id, tier) + 1;
        // Unique-constraint check on (incident, tier, version); unreachable
        // under the lock but mirrors what a database-backed registry surfaces.
        if rows
            .iter()
            .any(|r| r.incident_id == incident_id && r.tier == tier && r.version == version)
        {
            return Err(CoreError::ConcurrencyConflict(format!(
                "duplicate version {version} for ({incident_id}, {tier})"
            )));
        }
        let report = DisclosureReport {
            report_id: ids::report_id(),
            incident_id: incident_id.to_string(),
            tier,
            version,
            generated_at: now,
            generated_by: actor.to_string(),
            size_bytes: artifact.size_bytes,
            artifact,
            active: true,
        };
        rows.push(report.clone());
        Ok(report)
    }

    /// Whether an active report of the tier exists.
    pub fn exists(&self, incident_id: &str, tier: ReportTier) -> bool {
        self.rows
            .read()
            .iter()
            .any(|r| r.incident_id == incident_id && r.tier == tier && r.active)
    }

    /// All generations for an incident, newest first, each with an artifact
    /// availability flag from the renderer's storage check.
    pub fn history(
        &self,
        incident_id: &str,
        renderer: &dyn ReportRenderer,
    ) -> Vec<HistoryEntry> {
        self.rows
            .read()
            .iter()
            .filter(|r| r.incident_id == incident_id)
            .rev()
            .map(|r| HistoryEntry {
                artifact_available: renderer.artifact_exists(&r.artifact).unwrap_or(false),
                report: r.clone(),
            })
            .collect()
    }

    pub fn find(&self, report_id: &str) -> Option<DisclosureReport> {
        self.rows
            .read()
            .iter()
            .find(|r| r.report_id == report_id)
            .cloned()
    }

    /// Explicit supersede/retract. Registration never deactivates anything.
    pub fn deactivate(&self, report_id: &str) -> CoreResult<()> {
        let mut rows = self.rows.write();
        let report = rows
            .iter_mut()
            .find(|r| r.report_id == report_id)
            .ok_or_else(|| CoreError::NotFound(format!("report {report_id}")))?;
        report.active = false;
        Ok(())
    }

    /// Per-tier filing facts (active reports only) for the deadline engine.
    pub fn filings_for(&self, incident_id: &str) -> TierFilings {
        let mut filings = TierFilings::default();
        for r in self.rows.read().iter() {
            if r.incident_id == incident_id && r.active {
                filings.record(r.tier, r.generated_at);
            }
        }
        filings
    }
}

fn max_version(rows: &[DisclosureReport], incident_id: &str, tier: ReportTier) -> u32 {
    rows.iter()
        .filter(|r| r.incident_id == incident_id && r.tier == tier)
        .map(|r| r.version)
        .max()
        .unwrap_or(0)
}
