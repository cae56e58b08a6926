use crate::audit::event::{compute_event_hash, finalize_event, AuditEvent, ZERO_HASH_64};
use crate::error::{CoreError, CoreResult};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Append-only JSONL audit trail. Each line is one [`AuditEvent`]; the chain
/// head is recovered by scanning to the last line on open.
pub struct AuditLog {
    path: std::path::PathBuf,
    last_hash: String,
}

impl AuditLog {
    pub fn open_or_create(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            File::create(&path)?;
            return Ok(Self {
                path,
                last_hash: ZERO_HASH_64.to_string(),
            });
        }

        let mut last_hash = ZERO_HASH_64.to_string();
        for event in read_events(&path)? {
            last_hash = event.event_hash;
        }
        Ok(Self { path, last_hash })
    }

    pub fn append(&mut self, mut event: AuditEvent) -> CoreResult<AuditEvent> {
        event.prev_event_hash = self.last_hash.clone();
        let event = finalize_event(event)?;
        // Hashing uses canonical bytes; the log line itself may be compact JSON.
        let line = serde_json::to_string(&event)?;
        let mut f = OpenOptions::new().append(true).open(&self.path)?;
        f.write_all(line.as_bytes())?;
        f.write_all(b"\n")?;
        self.last_hash = event.event_hash.clone();
        Ok(event)
    }
}

fn read_events(path: &Path) -> CoreResult<Vec<AuditEvent>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str::<AuditEvent>(&line)?);
    }
    Ok(events)
}

/// Re-reads a log file and checks every link of the hash chain. Returns the
/// number of verified events.
pub fn verify_chain(path: impl AsRef<Path>) -> CoreResult<usize> {
    let events = read_events(path.as_ref())?;
    let mut prev = ZERO_HASH_64.to_string();
    for (idx, event) in events.iter().enumerate() {
        if event.prev_event_hash != prev {
            return Err(CoreError::InvalidInput(format!(
                "audit chain broken at line {}: prev_event_hash mismatch",
                idx + 1
            )));
        }
        let expected = compute_event_hash(event)?;
        if event.event_hash != expected {
            return Err(CoreError::InvalidInput(format!(
                "audit chain broken at line {}: event_hash mismatch",
                idx + 1
            )));
        }
        prev = event.event_hash.clone();
    }
    Ok(events.len())
}
