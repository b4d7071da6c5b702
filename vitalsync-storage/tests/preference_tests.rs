use vitalsync_storage::{AnchorStore, KvStore, PreferenceGate, SyncPreference};
use vitalsync_types::{Anchor, Domain};

#[test]
fn defaults_are_disabled_and_not_imported() {
    let gate = PreferenceGate::load(KvStore::open_in_memory().unwrap()).unwrap();
    for domain in Domain::ALL {
        assert_eq!(gate.preference(domain), SyncPreference::default());
        assert!(!gate.is_enabled(domain));
        assert!(!gate.has_completed_initial_import(domain));
    }
}

#[test]
fn set_enabled_is_per_domain() {
    let mut gate = PreferenceGate::load(KvStore::open_in_memory().unwrap()).unwrap();
    gate.set_enabled(Domain::Weight, true).unwrap();
    assert!(gate.is_enabled(Domain::Weight));
    assert!(!gate.is_enabled(Domain::Sleep));
    assert!(!gate.is_enabled(Domain::Hydration));
}

#[test]
fn preferences_persist() {
    let kv = KvStore::open_in_memory().unwrap();
    {
        let mut gate = PreferenceGate::load(kv.clone()).unwrap();
        gate.set_enabled(Domain::Sleep, true).unwrap();
        gate.mark_import_complete(Domain::Sleep).unwrap();
        gate.mark_import_complete(Domain::Hydration).unwrap();
    }
    let gate = PreferenceGate::load(kv).unwrap();
    assert_eq!(
        gate.preference(Domain::Sleep),
        SyncPreference {
            enabled: true,
            has_completed_initial_historical_import: true,
        }
    );
    assert!(!gate.is_enabled(Domain::Hydration));
    assert!(gate.has_completed_initial_import(Domain::Hydration));
}

#[test]
fn disabling_keeps_import_flag() {
    let mut gate = PreferenceGate::load(KvStore::open_in_memory().unwrap()).unwrap();
    gate.set_enabled(Domain::Weight, true).unwrap();
    gate.mark_import_complete(Domain::Weight).unwrap();
    gate.set_enabled(Domain::Weight, false).unwrap();
    assert!(gate.has_completed_initial_import(Domain::Weight));
}

#[test]
fn preference_without_import_field_loads() {
    let kv = KvStore::open_in_memory().unwrap();
    kv.put_raw("weight.preference", r#"{"enabled":true}"#).unwrap();
    let gate = PreferenceGate::load(kv).unwrap();
    assert!(gate.is_enabled(Domain::Weight));
    assert!(!gate.has_completed_initial_import(Domain::Weight));
}

// ── Anchors ──────────────────────────────────────────────────────

#[test]
fn anchors_start_empty() {
    let anchors = AnchorStore::load(KvStore::open_in_memory().unwrap()).unwrap();
    assert!(anchors.get(Domain::Weight).is_none());
}

#[test]
fn anchors_persist_per_domain() {
    let kv = KvStore::open_in_memory().unwrap();
    {
        let mut anchors = AnchorStore::load(kv.clone()).unwrap();
        anchors.save(Domain::Weight, Anchor::new("12")).unwrap();
        anchors.save(Domain::Sleep, Anchor::new("3")).unwrap();
    }
    let anchors = AnchorStore::load(kv).unwrap();
    assert_eq!(anchors.get(Domain::Weight), Some(&Anchor::new("12")));
    assert_eq!(anchors.get(Domain::Sleep), Some(&Anchor::new("3")));
    assert!(anchors.get(Domain::Hydration).is_none());
}

#[test]
fn reset_removes_only_that_domain() {
    let kv = KvStore::open_in_memory().unwrap();
    let mut anchors = AnchorStore::load(kv.clone()).unwrap();
    anchors.save(Domain::Weight, Anchor::new("12")).unwrap();
    anchors.save(Domain::Sleep, Anchor::new("3")).unwrap();
    anchors.reset(Domain::Weight).unwrap();

    assert!(anchors.get(Domain::Weight).is_none());
    let reloaded = AnchorStore::load(kv).unwrap();
    assert!(reloaded.get(Domain::Weight).is_none());
    assert_eq!(reloaded.get(Domain::Sleep), Some(&Anchor::new("3")));
}
