use std::collections::HashSet;
use std::str::FromStr;
use vitalsync_types::{Domain, EntryId, ExternalRecordId};

// ── EntryId ──────────────────────────────────────────────────────

#[test]
fn entry_id_new_is_unique() {
    let a = EntryId::new();
    let b = EntryId::new();
    assert_ne!(a, b);
}

#[test]
fn entry_id_display_and_parse() {
    let id = EntryId::new();
    let parsed = EntryId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn entry_id_parse_trims() {
    let id = EntryId::from_str("  abc-123 ").unwrap();
    assert_eq!(id.as_str(), "abc-123");
}

#[test]
fn entry_id_parse_empty_fails() {
    assert!(EntryId::parse("").is_err());
    assert!(EntryId::parse("   ").is_err());
}

#[test]
fn entry_id_hash_set() {
    let mut set = HashSet::new();
    let id = EntryId::new();
    set.insert(id.clone());
    set.insert(id);
    set.insert(EntryId::new());
    assert_eq!(set.len(), 2);
}

#[test]
fn entry_id_serde_is_transparent() {
    let id = EntryId::parse("local-1").unwrap();
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"local-1\"");
}

// ── ExternalRecordId ─────────────────────────────────────────────

#[test]
fn external_id_becomes_entry_identity() {
    let ext = ExternalRecordId::new("HK-42");
    let entry_id = EntryId::from(&ext);
    assert_eq!(entry_id.as_str(), "HK-42");
    assert!(ext.is_identity_of(&entry_id));
    assert!(!ext.is_identity_of(&EntryId::new()));
}

#[test]
fn entry_id_back_to_external_id() {
    let entry_id = EntryId::parse("HK-7").unwrap();
    assert_eq!(ExternalRecordId::from(&entry_id), ExternalRecordId::new("HK-7"));
}

// ── Domain ───────────────────────────────────────────────────────

#[test]
fn domain_names_roundtrip() {
    for domain in Domain::ALL {
        assert_eq!(Domain::from_str(domain.as_str()).unwrap(), domain);
        assert_eq!(domain.to_string(), domain.as_str());
    }
}

#[test]
fn domain_parse_is_case_insensitive() {
    assert_eq!(Domain::from_str("Weight").unwrap(), Domain::Weight);
    assert_eq!(Domain::from_str(" HYDRATION ").unwrap(), Domain::Hydration);
}

#[test]
fn domain_parse_unknown() {
    assert!(Domain::from_str("steps").is_err());
}

#[test]
fn domain_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&Domain::Sleep).unwrap(), "\"sleep\"");
}
