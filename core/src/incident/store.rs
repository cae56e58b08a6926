use crate::error::{CoreError, CoreResult};
use crate::incident::model::{EvidenceRef, IncidentSnapshot, LifecycleState};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Collaborator seam to the incident-management subsystem. The engine only
/// ever reads snapshots; mutation stays with the owning subsystem.
pub trait IncidentStore: Send + Sync {
    fn snapshot(&self, incident_id: &str) -> CoreResult<IncidentSnapshot>;
}

/// Collaborator seam to the attachment subsystem.
pub trait EvidenceStore: Send + Sync {
    fn list_evidence(&self, incident_id: &str) -> CoreResult<Vec<EvidenceRef>>;
}

/// In-memory incident store backing tests and the self-audit runner.
#[derive(Default)]
pub struct InMemoryIncidentStore {
    incidents: RwLock<BTreeMap<String, IncidentSnapshot>>,
}

impl InMemoryIncidentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, snapshot: IncidentSnapshot) {
        self.incidents
            .write()
            .insert(snapshot.incident_id.clone(), snapshot);
    }

    /// Soft-deactivation; the row is retained because reports may reference it.
    pub fn deactivate(&self, incident_id: &str) -> CoreResult<()> {
        let mut incidents = self.incidents.write();
        let snapshot = incidents
            .get_mut(incident_id)
            .ok_or_else(|| CoreError::NotFound(format!("incident {incident_id}")))?;
        snapshot.lifecycle = LifecycleState::Deactivated;
        Ok(())
    }
}

impl IncidentStore for InMemoryIncidentStore {
    fn snapshot(&self, incident_id: &str) -> CoreResult<IncidentSnapshot> {
        self.incidents
            .read()
            .get(incident_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("incident {incident_id}")))
    }
}

/// In-memory evidence store backing tests and the self-audit runner.
#[derive(Default)]
pub struct InMemoryEvidenceStore {
    rows: RwLock<BTreeMap<String, Vec<EvidenceRef>>>,
}

impl InMemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, incident_id: &str, evidence: EvidenceRef) {
        self.rows
            .write()
            .entry(incident_id.to_string())
            .or_default()
            .push(evidence);
    }
}

impl EvidenceStore for InMemoryEvidenceStore {
    fn list_evidence(&self, incident_id: &str) -> CoreResult<Vec<EvidenceRef>> {
        Ok(self
            .rows
            .read()
            .get(incident_id)
            .cloned()
            .unwrap_or_default())
    }
}
