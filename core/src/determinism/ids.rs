use sha2::{Digest, Sha256};
use ulid::Ulid;

// Identifier prefixes distinguish entity kinds in audit details and history
// listings without a schema lookup.

pub fn report_id() -> String {
    format!("rep_{}", Ulid::new())
}

pub fn assignment_id() -> String {
    format!("asg_{}", Ulid::new())
}

pub fn artifact_id() -> String {
    format!("art_{}", Ulid::new())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_entity_prefix() {
        assert!(report_id().starts_with("rep_"));
        assert!(assignment_id().starts_with("asg_"));
        assert!(artifact_id().starts_with("art_"));
    }

    #[test]
    fn sha256_hex_is_stable() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
