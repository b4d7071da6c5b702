//! The Authorization/Preference Gate: per-domain sync preferences.

use crate::domain_key;
use crate::error::StorageResult;
use crate::kv::KvStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use vitalsync_types::Domain;

const PREFERENCE_KEY: &str = "preference";

/// Sync preference of one domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPreference {
    /// Whether the user turned sync on for this domain.
    pub enabled: bool,
    /// Whether the historical import has been completed once.
    #[serde(default)]
    pub has_completed_initial_historical_import: bool,
}

/// Persisted preferences for every domain.
///
/// Each method touches only the key of the domain it is given.
#[derive(Debug, Clone)]
pub struct PreferenceGate {
    kv: KvStore,
    preferences: HashMap<Domain, SyncPreference>,
}

impl PreferenceGate {
    /// Loads the preferences of every domain; missing ones get defaults.
    pub fn load(kv: KvStore) -> StorageResult<Self> {
        let mut preferences = HashMap::new();
        for domain in Domain::ALL {
            let pref = kv
                .get_json::<SyncPreference>(&domain_key(domain, PREFERENCE_KEY))?
                .unwrap_or_default();
            preferences.insert(domain, pref);
        }
        Ok(Self { kv, preferences })
    }

    pub fn preference(&self, domain: Domain) -> SyncPreference {
        self.preferences.get(&domain).copied().unwrap_or_default()
    }

    pub fn is_enabled(&self, domain: Domain) -> bool {
        self.preference(domain).enabled
    }

    pub fn set_enabled(&mut self, domain: Domain, enabled: bool) -> StorageResult<()> {
        let mut pref = self.preference(domain);
        pref.enabled = enabled;
        self.store(domain, pref)?;
        info!("Sync {} for {}", if enabled { "enabled" } else { "disabled" }, domain);
        Ok(())
    }

    pub fn has_completed_initial_import(&self, domain: Domain) -> bool {
        self.preference(domain).has_completed_initial_historical_import
    }

    pub fn mark_import_complete(&mut self, domain: Domain) -> StorageResult<()> {
        let mut pref = self.preference(domain);
        pref.has_completed_initial_historical_import = true;
        self.store(domain, pref)
    }

    fn store(&mut self, domain: Domain, pref: SyncPreference) -> StorageResult<()> {
        self.kv.put_json(&domain_key(domain, PREFERENCE_KEY), &pref)?;
        self.preferences.insert(domain, pref);
        Ok(())
    }
}
