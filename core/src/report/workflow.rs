use crate::audit::event::AuditEvent;
use crate::audit::log::AuditLog;
use crate::deadline::engine::{compute_deadlines, DeadlineProfile, DeadlineStatus};
use crate::error::{CoreError, CoreResult};
use crate::incident::model::IncidentSnapshot;
use crate::incident::store::{EvidenceStore, IncidentStore};
use crate::report::content::{build_content, ReportContent};
use crate::report::registry::{DisclosureReport, HistoryEntry, ReportRegistry};
use crate::report::render::{ArtifactRef, ReportRenderer};
use crate::report::tier::ReportTier;
use crate::taxonomy::assignments::{TaxonomyAssignment, TaxonomyAssignmentStore};
use crate::taxonomy::catalog::{TaxonomyCatalog, TaxonomyDefinition};
use crate::validation::gate::{validate, ValidationResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// External render/storage failures are retried this many times in total
/// before surfacing. Validation failures are never retried.
const RENDER_ATTEMPTS: u32 = 3;
const REGISTER_ATTEMPTS: u32 = 3;

/// Logical reporting progress for an incident, derived from which tiers have
/// at least one active report. Tiers may be skipped in data; the content
/// model stays cumulative regardless.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReportingStage {
    NotRequested,
    Preliminary,
    Complete,
    Final,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationOutcome {
    pub report_id: String,
    pub tier: ReportTier,
    pub version: u32,
    pub artifact: ArtifactRef,
}

/// The disclosure compliance engine. Collaborators are injected and owned by
/// the host process; the engine itself only mutates the report registry, the
/// assignment store, and the audit trail.
pub struct ComplianceEngine {
    incidents: Arc<dyn IncidentStore>,
    evidence: Arc<dyn EvidenceStore>,
    catalog: Arc<dyn TaxonomyCatalog>,
    renderer: Arc<dyn ReportRenderer>,
    assignments: TaxonomyAssignmentStore,
    registry: ReportRegistry,
    audit: Mutex<AuditLog>,
}

impl ComplianceEngine {
    pub fn new(
        incidents: Arc<dyn IncidentStore>,
        evidence: Arc<dyn EvidenceStore>,
        catalog: Arc<dyn TaxonomyCatalog>,
        renderer: Arc<dyn ReportRenderer>,
        audit: AuditLog,
    ) -> Self {
        let assignments = TaxonomyAssignmentStore::new(Arc::clone(&catalog));
        Self {
            incidents,
            evidence,
            catalog,
            renderer,
            assignments,
            registry: ReportRegistry::new(),
            audit: Mutex::new(audit),
        }
    }

    /// Classifies an incident against the taxonomy. Upsert on
    /// (incident, code); audited.
    pub fn assign_taxonomy(
        &self,
        incident_id: &str,
        taxonomy_code: &str,
        justification: &str,
        problem_description: &str,
        actor: &str,
    ) -> CoreResult<String> {
        self.incidents.snapshot(incident_id)?;
        let now = OffsetDateTime::now_utc();
        let assignment_id = self.assignments.assign(
            incident_id,
            taxonomy_code,
            justification,
            problem_description,
            actor,
            now,
        )?;
        self.append_audit(
            "TAXONOMY_ASSIGNED",
            incident_id,
            actor,
            json!({
                "taxonomy_code": taxonomy_code,
                "assignment_id": assignment_id,
            }),
        )?;
        Ok(assignment_id)
    }

    pub fn unassign_taxonomy(
        &self,
        incident_id: &str,
        taxonomy_code: &str,
        actor: &str,
    ) -> CoreResult<()> {
        self.assignments.unassign(incident_id, taxonomy_code)?;
        self.append_audit(
            "TAXONOMY_UNASSIGNED",
            incident_id,
            actor,
            json!({ "taxonomy_code": taxonomy_code }),
        )?;
        Ok(())
    }

    pub fn taxonomy_assignments(&self, incident_id: &str) -> Vec<TaxonomyAssignment> {
        self.assignments.list_for(incident_id)
    }

    /// Per-tier deadline view at `now`. Read-only; recomputed on every call.
    pub fn compliance_status(
        &self,
        incident_id: &str,
        now: OffsetDateTime,
    ) -> CoreResult<BTreeMap<ReportTier, DeadlineStatus>> {
        let snapshot = self.incidents.snapshot(incident_id)?;
        let detected_at = snapshot.detected_at.ok_or_else(|| {
            CoreError::InvalidInput(format!("incident {incident_id} has no detection time"))
        })?;
        let filings = self.registry.filings_for(incident_id);
        let mut statuses = compute_deadlines(
            detected_at,
            snapshot.organization_class,
            &filings,
            now,
        );
        // The management subsystem may record a preliminary filing made
        // outside this engine. Honor it: the window is satisfied even though
        // the registry holds no report, and with no filing timestamp the
        // lateness flag stays unset.
        if snapshot.report_filed && !filings.exists(ReportTier::Preliminary) {
            if let Some(preliminary) = statuses.get_mut(&ReportTier::Preliminary) {
                preliminary.report_exists = true;
                preliminary.overdue = false;
            }
        }
        Ok(statuses)
    }

    /// Field-completeness check. Never cached; the snapshot is re-read on
    /// every call.
    pub fn validation(&self, incident_id: &str) -> CoreResult<ValidationResult> {
        let snapshot = self.incidents.snapshot(incident_id)?;
        let assignments = self.assignments.list_for(incident_id);
        let evidence = self.evidence.list_evidence(incident_id)?;
        Ok(validate(&snapshot, &assignments, &evidence))
    }

    pub fn generate(
        &self,
        incident_id: &str,
        tier: ReportTier,
        actor: &str,
    ) -> CoreResult<GenerationOutcome> {
        self.generate_at(incident_id, tier, actor, OffsetDateTime::now_utc())
    }

    /// Generation with an explicit clock, so callers and tests control the
    /// registered timestamp.
    pub fn generate_at(
        &self,
        incident_id: &str,
        tier: ReportTier,
        actor: &str,
        now: OffsetDateTime,
    ) -> CoreResult<GenerationOutcome> {
        let snapshot = self.incidents.snapshot(incident_id)?;
        let assignments = self.assignments.list_for(incident_id);
        let evidence = self.evidence.list_evidence(incident_id)?;

        self.append_audit(
            "REPORT_GENERATION_REQUESTED",
            incident_id,
            actor,
            json!({ "tier": tier.label() }),
        )?;

        let gate = validate(&snapshot, &assignments, &evidence);
        self.append_audit(
            "REPORT_VALIDATION_RESULT",
            incident_id,
            actor,
            json!({
                "result": if gate.ok { "PASS" } else { "FAIL" },
                "missing_required": gate.missing_required,
                "missing_recommended": gate.missing_recommended,
            }),
        )?;
        if !gate.ok {
            self.append_audit(
                "REPORT_GENERATION_FAILED",
                incident_id,
                actor,
                json!({ "tier": tier.label(), "reason": "validation failed" }),
            )?;
            return Err(CoreError::ValidationFailed {
                missing_required: gate.missing_required,
            });
        }

        let content = self.build_tier_content(tier, &snapshot, &assignments, &evidence)?;
        let artifact = self.render_with_retry(&content).map_err(|err| {
            // Best effort; the render error is what the caller must see.
            let _ = self.append_audit(
                "REPORT_GENERATION_FAILED",
                incident_id,
                actor,
                json!({ "tier": tier.label(), "reason": err.to_string() }),
            );
            err
        })?;
        self.append_audit(
            "REPORT_RENDERED",
            incident_id,
            actor,
            json!({
                "tier": tier.label(),
                "artifact_id": artifact.artifact_id,
                "artifact_sha256": artifact.sha256,
                "size_bytes": artifact.size_bytes,
            }),
        )?;

        let report = self.register_with_retry(incident_id, tier, artifact, actor, now)?;
        self.append_audit(
            "REPORT_REGISTERED",
            incident_id,
            actor,
            json!({
                "report_id": report.report_id,
                "tier": tier.label(),
                "version": report.version,
            }),
        )?;

        Ok(GenerationOutcome {
            report_id: report.report_id,
            tier,
            version: report.version,
            artifact: report.artifact,
        })
    }

    /// All generations for an incident, newest first.
    pub fn history(&self, incident_id: &str) -> CoreResult<Vec<HistoryEntry>> {
        self.incidents.snapshot(incident_id)?;
        Ok(self.registry.history(incident_id, self.renderer.as_ref()))
    }

    pub fn reporting_stage(&self, incident_id: &str) -> CoreResult<ReportingStage> {
        self.incidents.snapshot(incident_id)?;
        let stage = if self.registry.exists(incident_id, ReportTier::Final) {
            ReportingStage::Final
        } else if self.registry.exists(incident_id, ReportTier::Complete) {
            ReportingStage::Complete
        } else if self.registry.exists(incident_id, ReportTier::Preliminary) {
            ReportingStage::Preliminary
        } else {
            ReportingStage::NotRequested
        };
        Ok(stage)
    }

    pub fn deactivate_report(&self, report_id: &str, actor: &str) -> CoreResult<()> {
        let incident_id = self.find_report(report_id)?.incident_id;
        self.registry.deactivate(report_id)?;
        self.append_audit(
            "REPORT_DEACTIVATED",
            &incident_id,
            actor,
            json!({ "report_id": report_id }),
        )?;
        Ok(())
    }

    fn find_report(&self, report_id: &str) -> CoreResult<DisclosureReport> {
        self.registry
            .find(report_id)
            .ok_or_else(|| CoreError::NotFound(format!("report {report_id}")))
    }

    fn build_tier_content(
        &self,
        tier: ReportTier,
        snapshot: &IncidentSnapshot,
        assignments: &[TaxonomyAssignment],
        evidence: &[crate::incident::model::EvidenceRef],
    ) -> CoreResult<ReportContent> {
        let mut classified: Vec<(TaxonomyAssignment, TaxonomyDefinition)> =
            Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let definition = self.catalog.lookup(&assignment.taxonomy_code)?;
            classified.push((assignment.clone(), definition));
        }
        let profile = DeadlineProfile::for_class(snapshot.organization_class);
        build_content(tier, snapshot, &profile, &classified, evidence)
    }

    fn render_with_retry(&self, content: &ReportContent) -> CoreResult<ArtifactRef> {
        let mut last_err = None;
        for _ in 0..RENDER_ATTEMPTS {
            match self.renderer.render(content) {
                Ok(artifact) => return Ok(artifact),
                Err(err) => last_err = Some(err),
            }
        }
        match last_err {
            Some(CoreError::RenderFailed(msg)) => Err(CoreError::RenderFailed(msg)),
            Some(other) => Err(CoreError::RenderFailed(other.to_string())),
            None => Err(CoreError::RenderFailed("renderer unavailable".to_string())),
        }
    }

    fn register_with_retry(
        &self,
        incident_id: &str,
        tier: ReportTier,
        artifact: ArtifactRef,
        actor: &str,
        now: OffsetDateTime,
    ) -> CoreResult<DisclosureReport> {
        let mut last_err = None;
        for _ in 0..REGISTER_ATTEMPTS {
            match self
                .registry
                .register(incident_id, tier, artifact.clone(), actor, now)
            {
                Ok(report) => return Ok(report),
                Err(CoreError::ConcurrencyConflict(msg)) => {
                    last_err = Some(CoreError::ConcurrencyConflict(msg));
                }
                Err(other) => return Err(other),
            }
        }
        Err(last_err
            .unwrap_or_else(|| CoreError::ConcurrencyConflict("registration failed".to_string())))
    }

    fn append_audit(
        &self,
        event_type: &str,
        incident_id: &str,
        actor: &str,
        details: serde_json::Value,
    ) -> CoreResult<()> {
        let ts_utc = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| CoreError::InvalidInput(format!("timestamp format: {e}")))?;
        self.audit.lock().append(AuditEvent {
            ts_utc,
            event_type: event_type.to_string(),
            incident_id: incident_id.to_string(),
            actor: actor.to_string(),
            details,
            prev_event_hash: String::new(),
            event_hash: String::new(),
        })?;
        Ok(())
    }
}
