use crate::determinism::ids;
use crate::error::{CoreError, CoreResult};
use crate::taxonomy::catalog::TaxonomyCatalog;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::OffsetDateTime;

/// One taxonomy code applied to one incident. Justification and problem
/// description are two proper fields; they are never packed into one blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaxonomyAssignment {
    pub assignment_id: String,
    pub incident_id: String,
    pub taxonomy_code: String,
    pub justification: String,
    pub problem_description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub assigned_at: OffsetDateTime,
    pub assigned_by: String,
}

/// Holds which taxonomy codes apply to an incident. Keyed on
/// (incident, code): re-assigning rewrites the text fields in place instead
/// of duplicating the row.
pub struct TaxonomyAssignmentStore {
    catalog: Arc<dyn TaxonomyCatalog>,
    rows: RwLock<Vec<TaxonomyAssignment>>,
}

impl TaxonomyAssignmentStore {
    pub fn new(catalog: Arc<dyn TaxonomyCatalog>) -> Self {
        Self {
            catalog,
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Upsert on (incident, code). Fails with `NotFound` when the code is not
    /// in the reference catalog. Returns the assignment id; a rewrite keeps
    /// the original id and timestamp.
    pub fn assign(
        &self,
        incident_id: &str,
        taxonomy_code: &str,
        justification: &str,
        problem_description: &str,
        actor: &str,
        now: OffsetDateTime,
    ) -> CoreResult<String> {
        self.catalog.lookup(taxonomy_code)?;
        let mut rows = self.rows.write();
        if let Some(existing) = rows
            .iter_mut()
            .find(|r| r.incident_id == incident_id && r.taxonomy_code == taxonomy_code)
        {
            existing.justification = justification.to_string();
            existing.problem_description = problem_description.to_string();
            return Ok(existing.assignment_id.clone());
        }
        let assignment = TaxonomyAssignment {
            assignment_id: ids::assignment_id(),
            incident_id: incident_id.to_string(),
            taxonomy_code: taxonomy_code.to_string(),
            justification: justification.to_string(),
            problem_description: problem_description.to_string(),
            assigned_at: now,
            assigned_by: actor.to_string(),
        };
        let id = assignment.assignment_id.clone();
        rows.push(assignment);
        Ok(id)
    }

    /// Assignments for one incident in assignment order.
    pub fn list_for(&self, incident_id: &str) -> Vec<TaxonomyAssignment> {
        self.rows
            .read()
            .iter()
            .filter(|r| r.incident_id == incident_id)
            .cloned()
            .collect()
    }

    pub fn unassign(&self, incident_id: &str, taxonomy_code: &str) -> CoreResult<()> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|r| !(r.incident_id == incident_id && r.taxonomy_code == taxonomy_code));
        if rows.len() == before {
            return Err(CoreError::NotFound(format!(
                "assignment ({incident_id}, {taxonomy_code})"
            )));
        }
        Ok(())
    }

    /// Cascade for incident deletion.
    pub fn unassign_all(&self, incident_id: &str) {
        self.rows.write().retain(|r| r.incident_id != incident_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::catalog::EmbeddedTaxonomyCatalog;
    use time::format_description::well_known::Rfc3339;

    fn store() -> TaxonomyAssignmentStore {
        TaxonomyAssignmentStore::new(Arc::new(EmbeddedTaxonomyCatalog::new()))
    }

    fn ts() -> OffsetDateTime {
        OffsetDateTime::parse("2024-01-10T09:00:00Z", &Rfc3339).unwrap()
    }

    #[test]
    fn assign_rejects_unknown_code() {
        let s = store();
        let err = s.assign("inc_1", "TAX-NOPE", "j", "p", "handler_7", ts());
        assert!(matches!(err, Err(CoreError::NotFound(_))));
        assert!(s.list_for("inc_1").is_empty());
    }

    #[test]
    fn reassign_rewrites_instead_of_duplicating() {
        let s = store();
        let first = s
            .assign("inc_1", "TAX-INT-MAL", "initial", "ransom note", "handler_7", ts())
            .unwrap();
        let second = s
            .assign("inc_1", "TAX-INT-MAL", "revised", "ransom note v2", "handler_8", ts())
            .unwrap();
        assert_eq!(first, second);

        let rows = s.list_for("inc_1");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].justification, "revised");
        assert_eq!(rows[0].problem_description, "ransom note v2");
        // Original attribution is kept; corrections are field rewrites.
        assert_eq!(rows[0].assigned_by, "handler_7");
    }

    #[test]
    fn unassign_removes_only_the_pair() {
        let s = store();
        s.assign("inc_1", "TAX-INT-MAL", "j", "p", "h", ts()).unwrap();
        s.assign("inc_1", "TAX-AVL-DOS", "j", "p", "h", ts()).unwrap();
        s.assign("inc_2", "TAX-INT-MAL", "j", "p", "h", ts()).unwrap();

        s.unassign("inc_1", "TAX-INT-MAL").unwrap();
        assert_eq!(s.list_for("inc_1").len(), 1);
        assert_eq!(s.list_for("inc_2").len(), 1);

        assert!(s.unassign("inc_1", "TAX-INT-MAL").is_err());
    }

    #[test]
    fn unassign_all_cascades() {
        let s = store();
        s.assign("inc_1", "TAX-INT-MAL", "j", "p", "h", ts()).unwrap();
        s.assign("inc_1", "TAX-AVL-DOS", "j", "p", "h", ts()).unwrap();
        s.unassign_all("inc_1");
        assert!(s.list_for("inc_1").is_empty());
    }
}
