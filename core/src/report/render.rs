use crate::determinism::ids;
use crate::error::CoreResult;
use crate::report::content::{EvidenceRow, ReportContent, TaxonomyRow};
use crate::report::tier::ReportTier;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const REPORT_FILE: &str = "report.md";
pub const TAXONOMY_CSV_FILE: &str = "taxonomy.csv";
pub const EVIDENCE_CSV_FILE: &str = "evidence.csv";

/// Opaque reference to a rendered report artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRef {
    pub artifact_id: String,
    pub sha256: String,
    pub media_type: String,
    pub size_bytes: u64,
}

/// Collaborator seam to the external renderer/artifact storage. The engine
/// treats render failures as retryable and environmental.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, content: &ReportContent) -> CoreResult<ArtifactRef>;
    /// Storage check used by history listings.
    fn artifact_exists(&self, artifact: &ArtifactRef) -> CoreResult<bool>;
}

fn fmt_ts(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())
}

/// Renders the content model as a deterministic markdown document: identical
/// content always yields identical bytes.
pub fn render_markdown(content: &ReportContent) -> String {
    let mut out: Vec<String> = Vec::new();
    let p = &content.preliminary;

    let tier_title = match content.tier {
        ReportTier::Preliminary => "Preliminary Notification",
        ReportTier::Complete => "Complete Report",
        ReportTier::Final => "Final Report",
    };
    out.push(format!("# Incident Disclosure: {tier_title}"));
    out.push(String::new());

    out.push("## Reporting Organization".to_string());
    out.push(String::new());
    out.push(format!("- Name: {}", p.organization.name));
    out.push(format!("- Identifier: {}", p.organization.identifier));
    out.push(format!("- Classification: {:?}", p.organization.class));
    out.push(String::new());

    out.push("## Incident Identification".to_string());
    out.push(String::new());
    out.push(format!("- Code: {}", p.incident.display_code));
    out.push(format!("- Title: {}", p.incident.title));
    out.push(format!("- Detected: {}", fmt_ts(p.incident.detected_at)));
    out.push(format!(
        "- Occurred: {}",
        p.incident
            .occurred_at
            .map(fmt_ts)
            .unwrap_or_else(|| "unknown".to_string())
    ));
    out.push(format!(
        "- Criticality: {}",
        p.incident
            .criticality
            .map(|c| format!("{c:?}"))
            .unwrap_or_else(|| "unassessed".to_string())
    ));
    out.push(format!(
        "- Origin: {}",
        p.incident.origin.as_deref().unwrap_or("unknown")
    ));
    out.push(String::new());

    push_text_section(&mut out, "Initial Description", &p.initial_description);
    push_text_section(&mut out, "Preliminary Impact Assessment", &p.preliminary_impact);
    push_text_section(&mut out, "Immediate Actions", &p.immediate_actions);

    out.push("## Next Steps".to_string());
    out.push(String::new());
    for step in &p.next_steps {
        out.push(format!("- {step}"));
    }
    out.push(String::new());

    out.push("## Regulatory Deadlines".to_string());
    out.push(String::new());
    out.push("| Tier | Due | Window (hours) |".to_string());
    out.push("|---|---|---|".to_string());
    for row in &p.deadline_reminder {
        out.push(format!(
            "| {} | {} | {} |",
            row.tier,
            fmt_ts(row.due_at),
            row.hours_allowed
        ));
    }
    out.push(String::new());

    if let Some(analysis) = &content.analysis {
        push_text_section(&mut out, "Affected Systems", &analysis.affected_systems);

        out.push("## Taxonomy Classification".to_string());
        out.push(String::new());
        if analysis.taxonomy_rows.is_empty() {
            out.push(crate::report::content::PENDING_TEXT.to_string());
        } else {
            out.push("| Area | Category | Effect | Justification |".to_string());
            out.push("|---|---|---|---|".to_string());
            for row in &analysis.taxonomy_rows {
                out.push(format!(
                    "| {} | {} | {} | {} |",
                    row.area, row.category, row.effect, row.justification
                ));
            }
        }
        out.push(String::new());

        out.push("## Evidence".to_string());
        out.push(String::new());
        if analysis.evidence.is_empty() {
            out.push(crate::report::content::PENDING_TEXT.to_string());
        } else {
            out.push("| Section | Filename | Size (bytes) | Uploaded |".to_string());
            out.push("|---|---|---|---|".to_string());
            for row in &analysis.evidence {
                out.push(format!(
                    "| {} | {} | {} | {} |",
                    row.section,
                    row.filename,
                    row.size_bytes,
                    fmt_ts(row.uploaded_at)
                ));
            }
        }
        out.push(String::new());

        push_text_section(&mut out, "Recovery Plan", &analysis.recovery_plan);
    }

    if let Some(closure) = &content.closure {
        push_text_section(&mut out, "Root Cause Analysis", &closure.root_cause);
        push_text_section(&mut out, "Lessons Learned", &closure.lessons_learned);
        push_text_section(
            &mut out,
            "Implemented Improvements",
            &closure.implemented_improvements,
        );

        out.push("## Closing Metrics".to_string());
        out.push(String::new());
        out.push(format!(
            "- Resolution time (hours): {}",
            metric(closure.metrics.resolution_hours)
        ));
        out.push(format!(
            "- Estimated cost (cents): {}",
            metric(closure.metrics.estimated_cost_cents)
        ));
        out.push(format!(
            "- Users affected: {}",
            metric(closure.metrics.users_affected)
        ));
        out.push(format!(
            "- Services impacted: {}",
            metric(closure.metrics.services_impacted)
        ));
        out.push(String::new());

        out.push("## Recommendations".to_string());
        out.push(String::new());
        for rec in &closure.recommendations {
            out.push(format!("- {rec}"));
        }
        out.push(String::new());
    }

    out.join("\n")
}

fn push_text_section(out: &mut Vec<String>, title: &str, body: &str) {
    out.push(format!("## {title}"));
    out.push(String::new());
    out.push(body.to_string());
    out.push(String::new());
}

fn metric(value: Option<u64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "pending".to_string())
}

/// The full deliverable set for one generation: the markdown document always,
/// plus the CSV companion tables once analysis sections exist. Order is fixed
/// so the bundle digest is stable.
pub fn render_files(content: &ReportContent) -> CoreResult<Vec<(String, Vec<u8>)>> {
    let mut files = vec![(
        REPORT_FILE.to_string(),
        render_markdown(content).into_bytes(),
    )];
    if let Some(analysis) = &content.analysis {
        files.push((
            TAXONOMY_CSV_FILE.to_string(),
            render_taxonomy_csv(&analysis.taxonomy_rows)?.into_bytes(),
        ));
        files.push((
            EVIDENCE_CSV_FILE.to_string(),
            render_evidence_csv(&analysis.evidence)?.into_bytes(),
        ));
    }
    Ok(files)
}

/// Digest over the whole bundle: each file's name and length feed the hash
/// ahead of its bytes, so renaming or reordering files changes the digest.
/// Returns (sha256 hex, total content bytes).
pub fn bundle_digest(files: &[(String, Vec<u8>)]) -> (String, u64) {
    let mut h = Sha256::new();
    let mut total: u64 = 0;
    for (name, bytes) in files {
        h.update(name.as_bytes());
        h.update([0u8]);
        h.update((bytes.len() as u64).to_be_bytes());
        h.update(bytes);
        total += bytes.len() as u64;
    }
    (hex::encode(h.finalize()), total)
}

/// CSV companion deliverable for the taxonomy classification table.
pub fn render_taxonomy_csv(rows: &[TaxonomyRow]) -> CoreResult<String> {
    let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
    wtr.write_record(["area", "category", "effect", "justification"])?;
    for row in rows {
        wtr.write_record([
            row.area.as_str(),
            row.category.as_str(),
            row.effect.as_str(),
            row.justification.as_str(),
        ])?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).replace("\r\n", "\n"))
}

/// CSV companion deliverable for the evidence listing.
pub fn render_evidence_csv(rows: &[EvidenceRow]) -> CoreResult<String> {
    let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
    wtr.write_record(["section", "filename", "size_bytes", "uploaded_at"])?;
    for row in rows {
        wtr.write_record([
            row.section.as_str(),
            row.filename.as_str(),
            &row.size_bytes.to_string(),
            &fmt_ts(row.uploaded_at),
        ])?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).replace("\r\n", "\n"))
}

/// Renderer that keeps artifact bundles in memory; backs tests and the
/// self-audit runner the way the external storage-backed renderer would.
#[derive(Default)]
pub struct InMemoryRenderer {
    artifacts: RwLock<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// One file out of a stored bundle.
    pub fn file_bytes(&self, artifact_id: &str, filename: &str) -> Option<Vec<u8>> {
        self.artifacts
            .read()
            .get(artifact_id)
            .and_then(|files| files.get(filename))
            .cloned()
    }

    /// Filenames of a stored bundle, sorted.
    pub fn file_names(&self, artifact_id: &str) -> Option<Vec<String>> {
        self.artifacts
            .read()
            .get(artifact_id)
            .map(|files| files.keys().cloned().collect())
    }

    /// Simulates external storage loss for availability-handling tests.
    pub fn drop_artifact(&self, artifact_id: &str) {
        self.artifacts.write().remove(artifact_id);
    }
}

impl ReportRenderer for InMemoryRenderer {
    fn render(&self, content: &ReportContent) -> CoreResult<ArtifactRef> {
        let files = render_files(content)?;
        let (sha256, size_bytes) = bundle_digest(&files);
        let artifact = ArtifactRef {
            artifact_id: ids::artifact_id(),
            sha256,
            media_type: "application/x-report-bundle".to_string(),
            size_bytes,
        };
        self.artifacts
            .write()
            .insert(artifact.artifact_id.clone(), files.into_iter().collect());
        Ok(artifact)
    }

    fn artifact_exists(&self, artifact: &ArtifactRef) -> CoreResult<bool> {
        Ok(self.artifacts.read().contains_key(&artifact.artifact_id))
    }
}
