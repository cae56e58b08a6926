use crate::determinism::json_canonical;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One entry in the disclosure audit trail. Events form a hash chain:
/// `event_hash = SHA-256(canonical bytes of the event with event_hash zeroed)`,
/// and each event carries the hash of its predecessor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEvent {
    pub ts_utc: String, // RFC3339 UTC string
    pub event_type: String,
    pub incident_id: String,
    /// Opaque case-handler identifier; attribution only, never authenticated here.
    pub actor: String,
    pub details: serde_json::Value,
    pub prev_event_hash: String, // hex 64
    pub event_hash: String,      // hex 64
}

pub const ZERO_HASH_64: &str = "0000000000000000000000000000000000000000000000000000000000000000";

pub fn compute_event_hash(event: &AuditEvent) -> CoreResult<String> {
    // The hash covers the full envelope with event_hash forced to zero, so the
    // stored hash never feeds into itself.
    let mut e = event.clone();
    e.event_hash = ZERO_HASH_64.to_string();
    let bytes = json_canonical::to_canonical_bytes(&e)?;
    let mut h = Sha256::new();
    h.update(bytes);
    Ok(hex::encode(h.finalize()))
}

pub fn finalize_event(mut event: AuditEvent) -> CoreResult<AuditEvent> {
    if event.prev_event_hash.len() != 64
        || !event.prev_event_hash.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(CoreError::InvalidInput(
            "prev_event_hash must be 64 hex chars".to_string(),
        ));
    }
    validate_event_taxonomy(&event)?;
    let eh = compute_event_hash(&event)?;
    event.event_hash = eh;
    Ok(event)
}

fn validate_event_taxonomy(event: &AuditEvent) -> CoreResult<()> {
    let allowed = [
        "TAXONOMY_ASSIGNED",
        "TAXONOMY_UNASSIGNED",
        "REPORT_GENERATION_REQUESTED",
        "REPORT_VALIDATION_RESULT",
        "REPORT_RENDERED",
        "REPORT_REGISTERED",
        "REPORT_GENERATION_FAILED",
        "REPORT_DEACTIVATED",
    ];
    if !allowed.contains(&event.event_type.as_str()) {
        return Err(CoreError::InvalidInput(format!(
            "unknown event_type {}",
            event.event_type
        )));
    }
    let required = required_detail_keys(&event.event_type);
    for k in required {
        if event.details.get(k).is_none() {
            return Err(CoreError::InvalidInput(format!(
                "event {} missing details.{}",
                event.event_type, k
            )));
        }
    }
    Ok(())
}

fn required_detail_keys(event_type: &str) -> &'static [&'static str] {
    match event_type {
        "TAXONOMY_ASSIGNED" => &["taxonomy_code", "assignment_id"],
        "TAXONOMY_UNASSIGNED" => &["taxonomy_code"],
        "REPORT_GENERATION_REQUESTED" => &["tier"],
        "REPORT_VALIDATION_RESULT" => &["result", "missing_required", "missing_recommended"],
        "REPORT_RENDERED" => &["tier", "artifact_id", "artifact_sha256", "size_bytes"],
        "REPORT_REGISTERED" => &["report_id", "tier", "version"],
        "REPORT_GENERATION_FAILED" => &["tier", "reason"],
        "REPORT_DEACTIVATED" => &["report_id"],
        _ => &[],
    }
}
